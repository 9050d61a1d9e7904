use std::fmt::Display;
use std::io;
use std::str::FromStr;

use digest::Digest;
use md5::Md5;
use num_enum::{FromPrimitive, IntoPrimitive};
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::errors::{Error, Result};

/// Available hash algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.4>
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum HashAlgorithm {
    None = 0,
    MD5 = 1,
    SHA1 = 2,
    RIPEMD160 = 3,

    SHA2_256 = 8,
    SHA2_384 = 9,
    SHA2_512 = 10,
    SHA2_224 = 11,
    SHA3_256 = 12,
    SHA3_512 = 14,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        Self::SHA2_256
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "MD5" => Ok(Self::MD5),
            "SHA1" => Ok(Self::SHA1),
            "RIPEMD160" => Ok(Self::RIPEMD160),
            "SHA256" => Ok(Self::SHA2_256),
            "SHA384" => Ok(Self::SHA2_384),
            "SHA512" => Ok(Self::SHA2_512),
            "SHA224" => Ok(Self::SHA2_224),
            _ => bail!("unknown hash {}", s),
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "None",
            Self::MD5 => "MD5",
            Self::SHA1 => "SHA1",
            Self::RIPEMD160 => "RIPEMD160",
            Self::SHA2_256 => "SHA256",
            Self::SHA2_384 => "SHA384",
            Self::SHA2_512 => "SHA512",
            Self::SHA2_224 => "SHA224",
            Self::SHA3_256 => "SHA3-256",
            Self::SHA3_512 => "SHA3-512",
            Self::Other(v) => return write!(f, "Other({v})"),
        };
        write!(f, "{s}")
    }
}

/// Trait to work around the fact that the `Digest` trait from rustcrypto can
/// not be used as `Box<dyn Digest>`.
pub trait Hasher: io::Write {
    /// Update the hash with the given value.
    fn update(&mut self, _: &[u8]);
    /// Finalize the hash and return the result.
    fn finish(self: Box<Self>) -> Vec<u8>;
}

macro_rules! derive_hasher {
    ($name:ident, $struct:ty) => {
        #[derive(Default)]
        pub struct $name {
            inner: $struct,
        }

        impl Hasher for $name {
            fn update(&mut self, data: &[u8]) {
                self.inner.update(data);
            }

            fn finish(self: Box<Self>) -> Vec<u8> {
                self.inner.finalize().to_vec()
            }
        }

        impl io::Write for $name {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.inner.update(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
    };
}

derive_hasher!(Md5Hasher, Md5);
derive_hasher!(Sha1Hasher, Sha1);
derive_hasher!(Ripemd160Hasher, Ripemd160);
derive_hasher!(Sha256Hasher, Sha256);
derive_hasher!(Sha384Hasher, Sha384);
derive_hasher!(Sha512Hasher, Sha512);
derive_hasher!(Sha224Hasher, Sha224);

impl HashAlgorithm {
    /// Create a new hasher.
    pub fn new_hasher(self) -> Result<Box<dyn Hasher>> {
        match self {
            HashAlgorithm::MD5 => Ok(Box::<Md5Hasher>::default()),
            HashAlgorithm::SHA1 => Ok(Box::<Sha1Hasher>::default()),
            HashAlgorithm::RIPEMD160 => Ok(Box::<Ripemd160Hasher>::default()),
            HashAlgorithm::SHA2_256 => Ok(Box::<Sha256Hasher>::default()),
            HashAlgorithm::SHA2_384 => Ok(Box::<Sha384Hasher>::default()),
            HashAlgorithm::SHA2_512 => Ok(Box::<Sha512Hasher>::default()),
            HashAlgorithm::SHA2_224 => Ok(Box::<Sha224Hasher>::default()),
            _ => unsupported_err!("hash algorithm {:?}", self),
        }
    }

    /// Calculate the digest of the given input data.
    pub fn digest(self, data: &[u8]) -> Result<Vec<u8>> {
        let mut hasher = self.new_hasher()?;
        hasher.update(data);
        Ok(hasher.finish())
    }

    /// Returns the size of the digest in bytes, 0 for unsupported algorithms.
    pub fn digest_size(self) -> usize {
        match self {
            HashAlgorithm::MD5 => 16,
            HashAlgorithm::SHA1 => 20,
            HashAlgorithm::RIPEMD160 => 20,
            HashAlgorithm::SHA2_256 => 32,
            HashAlgorithm::SHA2_384 => 48,
            HashAlgorithm::SHA2_512 => 64,
            HashAlgorithm::SHA2_224 => 28,
            HashAlgorithm::SHA3_256 => 32,
            HashAlgorithm::SHA3_512 => 64,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_sizes() {
        for alg in [
            HashAlgorithm::MD5,
            HashAlgorithm::SHA1,
            HashAlgorithm::RIPEMD160,
            HashAlgorithm::SHA2_256,
            HashAlgorithm::SHA2_384,
            HashAlgorithm::SHA2_512,
            HashAlgorithm::SHA2_224,
        ] {
            assert_eq!(alg.digest(b"hello").unwrap().len(), alg.digest_size());
        }
    }

    #[test]
    fn test_sha1_vector() {
        assert_eq!(
            hex::encode(HashAlgorithm::SHA1.digest(b"abc").unwrap()),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_unsupported() {
        assert!(HashAlgorithm::SHA3_256.new_hasher().is_err());
        assert!(HashAlgorithm::from(99u8).new_hasher().is_err());
    }

    #[test]
    fn test_name_roundtrip() {
        for alg in [HashAlgorithm::SHA1, HashAlgorithm::SHA2_256] {
            assert_eq!(alg.to_string().parse::<HashAlgorithm>().unwrap(), alg);
        }
    }
}
