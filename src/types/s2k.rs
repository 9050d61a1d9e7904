use std::io;

use nom::bytes::streaming::take;
use nom::number::streaming::be_u8;
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};

use crate::crypto::hash::HashAlgorithm;
use crate::errors::{Error, IResult, Result};
use crate::ser::Serialize;

const EXPBIAS: u32 = 6;

/// String-To-Key specifier types.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-3.7.1>
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StringToKeyType {
    Simple = 0,
    Salted = 1,
    Reserved = 2,
    IteratedAndSalted = 3,

    #[num_enum(catch_all)]
    Other(u8),
}

/// String-To-Key specifier, used to convert a passphrase into raw key bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringToKey {
    typ: StringToKeyType,
    hash: HashAlgorithm,
    salt: Option<Vec<u8>>,
    count: Option<u8>,
}

impl StringToKey {
    pub fn new_default<R: CryptoRng + Rng>(rng: &mut R) -> Self {
        StringToKey::new_iterated(rng, HashAlgorithm::default(), 224)
    }

    pub fn simple(hash: HashAlgorithm) -> Self {
        StringToKey {
            typ: StringToKeyType::Simple,
            hash,
            salt: None,
            count: None,
        }
    }

    /// The implicit S2K used by legacy (usage octet = cipher id) secret keys:
    /// a single unsalted MD5 pass over the passphrase.
    pub fn legacy_md5() -> Self {
        StringToKey::simple(HashAlgorithm::MD5)
    }

    pub fn new_iterated<R: CryptoRng + Rng>(rng: &mut R, hash: HashAlgorithm, count: u8) -> Self {
        let mut salt = vec![0u8; 8];
        rng.fill(&mut salt[..]);

        StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash,
            salt: Some(salt),
            count: Some(count),
        }
    }

    /// Converts a coded count into the number of octets hashed per round.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7.1.3>
    pub fn count(&self) -> Option<usize> {
        self.count
            .map(|c| (((16u32 + u32::from(c & 15)) << (u32::from(c >> 4) + EXPBIAS)) as usize))
    }

    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_deref()
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn typ(&self) -> StringToKeyType {
        self.typ
    }

    /// String-To-Key methods are used to convert a given passphrase into a key of
    /// `key_size` bytes.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7>
    pub fn derive_key(&self, passphrase: &str, key_size: usize) -> Result<Vec<u8>> {
        let digest_size = self.hash.digest_size();
        ensure!(digest_size > 0, "unsupported hash algorithm {:?}", self.hash);
        let rounds = key_size.div_ceil(digest_size);

        let mut key = Vec::with_capacity(rounds * digest_size);

        for round in 0..rounds {
            let mut hasher = self.hash.new_hasher()?;

            // parallel chains are distinguished by a growing zero prefix
            if round > 0 {
                hasher.update(&vec![0u8; round][..]);
            }

            match self.typ {
                StringToKeyType::Simple => {
                    hasher.update(passphrase.as_bytes());
                }
                StringToKeyType::Salted => {
                    let salt = self.salt.as_ref().expect("missing salt");
                    hasher.update(salt);
                    hasher.update(passphrase.as_bytes());
                }
                StringToKeyType::IteratedAndSalted => {
                    let salt = self.salt.as_ref().expect("missing salt");
                    let pw = passphrase.as_bytes();
                    let data_size = salt.len() + pw.len();
                    let mut count = self.count().expect("missing count");

                    // at least one full set is hashed
                    if count < data_size {
                        count = data_size;
                    }

                    while count > data_size {
                        hasher.update(salt);
                        hasher.update(pw);
                        count -= data_size;
                    }

                    if count < salt.len() {
                        hasher.update(&salt[..count]);
                    } else {
                        hasher.update(salt);
                        hasher.update(&pw[..count - salt.len()]);
                    }
                }
                _ => unsupported_err!("S2K {:?}", self.typ),
            }

            key.extend(hasher.finish());
        }

        key.truncate(key_size);

        Ok(key)
    }
}

/// Parse a String-To-Key specifier.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-3.7>
pub fn s2k_parser(i: &[u8]) -> IResult<&[u8], StringToKey> {
    let (i, typ) = nom::combinator::map(be_u8, StringToKeyType::from)(i)?;
    let (i, hash) = nom::combinator::map(be_u8, HashAlgorithm::from)(i)?;

    match typ {
        StringToKeyType::Simple => Ok((
            i,
            StringToKey {
                typ,
                hash,
                salt: None,
                count: None,
            },
        )),
        StringToKeyType::Salted => {
            let (i, salt) = take(8usize)(i)?;
            Ok((
                i,
                StringToKey {
                    typ,
                    hash,
                    salt: Some(salt.to_vec()),
                    count: None,
                },
            ))
        }
        StringToKeyType::IteratedAndSalted => {
            let (i, salt) = take(8usize)(i)?;
            let (i, count) = be_u8(i)?;
            Ok((
                i,
                StringToKey {
                    typ,
                    hash,
                    salt: Some(salt.to_vec()),
                    count: Some(count),
                },
            ))
        }
        _ => Err(nom::Err::Error(Error::Unsupported {
            message: format!("S2K specifier {typ:?}"),
            backtrace: None,
        })),
    }
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&[self.typ.into(), self.hash.into()])?;

        if let Some(ref salt) = self.salt {
            w.write_all(salt)?;
        }

        if let Some(count) = self.count {
            w.write_all(&[count])?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coded_count() {
        let s2k = StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash: HashAlgorithm::SHA1,
            salt: Some(vec![0; 8]),
            count: Some(0x60),
        };
        // (16 + 0) << (6 + 6)
        assert_eq!(s2k.count(), Some(65536));

        let s2k = StringToKey {
            count: Some(0xff),
            ..s2k
        };
        assert_eq!(s2k.count(), Some(65_011_712));
    }

    #[test]
    fn test_s2k_roundtrip() {
        let s2k = StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash: HashAlgorithm::SHA2_256,
            salt: Some(vec![1, 2, 3, 4, 5, 6, 7, 8]),
            count: Some(224),
        };

        let bytes = s2k.to_bytes().unwrap();
        assert_eq!(bytes.len(), 2 + 8 + 1);
        let (rest, back) = s2k_parser(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(back, s2k);
    }

    #[test]
    fn test_derive_key_lengths() {
        let s2k = StringToKey {
            typ: StringToKeyType::Salted,
            hash: HashAlgorithm::SHA1,
            salt: Some(vec![9; 8]),
            count: None,
        };

        // SHA1 produces 20 bytes, longer keys require a second chain
        let k16 = s2k.derive_key("test", 16).unwrap();
        let k32 = s2k.derive_key("test", 32).unwrap();
        assert_eq!(k16.len(), 16);
        assert_eq!(k32.len(), 32);
        assert_eq!(&k16[..], &k32[..16]);
        // the second chain is prefixed with a zero octet, so it differs
        assert_ne!(&k32[..16], &k32[16..]);
    }
}
