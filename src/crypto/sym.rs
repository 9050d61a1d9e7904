use aes::{Aes128, Aes192, Aes256};
use blowfish::Blowfish;
use camellia::{Camellia128, Camellia192, Camellia256};
use cast5::Cast5;
use cfb_mode::{BufDecryptor, BufEncryptor};
use cipher::{InnerIvInit, KeyInit};
use des::TdesEde3;
use idea::Idea;
use log::debug;
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};
use twofish::Twofish;

use crate::crypto::checksum;
use crate::errors::{Error, Result};

/// Available symmetric key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.2>
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SymmetricKeyAlgorithm {
    /// Plaintext or unencrypted data
    Plaintext = 0,
    IDEA = 1,
    /// TripleDES (DES-EDE, 168 bit key derived from 192)
    TripleDES = 2,
    /// CAST5 (128 bit key, as per [RFC2144])
    CAST5 = 3,
    /// Blowfish (128 bit key, 16 rounds)
    Blowfish = 4,
    AES128 = 7,
    AES192 = 8,
    AES256 = 9,
    /// Twofish with 256-bit key [TWOFISH]
    Twofish = 10,
    /// [Camellia](https://tools.ietf.org/html/rfc5581#section-3) with 128-bit key
    Camellia128 = 11,
    /// [Camellia](https://tools.ietf.org/html/rfc5581#section-3) with 192-bit key
    Camellia192 = 12,
    /// [Camellia](https://tools.ietf.org/html/rfc5581#section-3) with 256-bit key
    Camellia256 = 13,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for SymmetricKeyAlgorithm {
    fn default() -> Self {
        Self::AES256
    }
}

/// The randomized prefix has the last two octets repeated, which serves as a
/// cheap sanity check on the session key.
fn quick_check(prefix: &[u8], bs: usize) -> Result<()> {
    if prefix[bs - 2] != prefix[bs] || prefix[bs - 1] != prefix[bs + 1] {
        bail!("invalid key: quick check on the prefix failed");
    }

    Ok(())
}

macro_rules! decrypt_regular {
    ($mode:ident, $key:expr, $iv:expr, $ciphertext:expr) => {{
        let cipher = <$mode as KeyInit>::new_from_slice($key)?;
        BufDecryptor::inner_iv_slice_init(cipher, $iv)?.decrypt($ciphertext);
    }};
}

macro_rules! encrypt_regular {
    ($mode:ident, $key:expr, $iv:expr, $plaintext:expr) => {{
        let cipher = <$mode as KeyInit>::new_from_slice($key)?;
        BufEncryptor::inner_iv_slice_init(cipher, $iv)?.encrypt($plaintext);
    }};
}

macro_rules! decrypt_resync {
    ($mode:ident, $key:expr, $ciphertext:expr, $bs:expr) => {{
        // the resynchronisation IV is the still encrypted second window
        let resync_iv = $ciphertext[2..$bs + 2].to_vec();
        let (prefix, data) = $ciphertext.split_at_mut($bs + 2);

        let iv = vec![0u8; $bs];
        let cipher = <$mode as KeyInit>::new_from_slice($key)?;
        BufDecryptor::inner_iv_slice_init(cipher, &iv)?.decrypt(prefix);
        quick_check(prefix, $bs)?;

        let cipher = <$mode as KeyInit>::new_from_slice($key)?;
        BufDecryptor::inner_iv_slice_init(cipher, &resync_iv)?.decrypt(data);
    }};
}

macro_rules! encrypt_resync {
    ($mode:ident, $key:expr, $prefix:expr, $data:expr, $bs:expr) => {{
        let iv = vec![0u8; $bs];
        let cipher = <$mode as KeyInit>::new_from_slice($key)?;
        BufEncryptor::inner_iv_slice_init(cipher, &iv)?.encrypt($prefix);

        let resync_iv = $prefix[2..$bs + 2].to_vec();
        let cipher = <$mode as KeyInit>::new_from_slice($key)?;
        BufEncryptor::inner_iv_slice_init(cipher, &resync_iv)?.encrypt($data);
    }};
}

macro_rules! with_cipher {
    ($alg:expr, $mac:ident, $($args:tt)*) => {
        match $alg {
            SymmetricKeyAlgorithm::IDEA => $mac!(Idea, $($args)*),
            SymmetricKeyAlgorithm::TripleDES => $mac!(TdesEde3, $($args)*),
            SymmetricKeyAlgorithm::CAST5 => $mac!(Cast5, $($args)*),
            SymmetricKeyAlgorithm::Blowfish => $mac!(Blowfish, $($args)*),
            SymmetricKeyAlgorithm::AES128 => $mac!(Aes128, $($args)*),
            SymmetricKeyAlgorithm::AES192 => $mac!(Aes192, $($args)*),
            SymmetricKeyAlgorithm::AES256 => $mac!(Aes256, $($args)*),
            SymmetricKeyAlgorithm::Twofish => $mac!(Twofish, $($args)*),
            SymmetricKeyAlgorithm::Camellia128 => $mac!(Camellia128, $($args)*),
            SymmetricKeyAlgorithm::Camellia192 => $mac!(Camellia192, $($args)*),
            SymmetricKeyAlgorithm::Camellia256 => $mac!(Camellia256, $($args)*),
            SymmetricKeyAlgorithm::Plaintext => {
                bail!("'Plaintext' is not a legal cipher for encrypted data")
            }
            SymmetricKeyAlgorithm::Other(id) => {
                unsupported_err!("symmetric algorithm {}", id)
            }
        }
    };
}

impl SymmetricKeyAlgorithm {
    /// The size of a single block in bytes.
    pub fn block_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 8,
            SymmetricKeyAlgorithm::TripleDES => 8,
            SymmetricKeyAlgorithm::CAST5 => 8,
            SymmetricKeyAlgorithm::Blowfish => 8,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 16,
            SymmetricKeyAlgorithm::AES256 => 16,
            SymmetricKeyAlgorithm::Twofish => 16,
            SymmetricKeyAlgorithm::Camellia128 => 16,
            SymmetricKeyAlgorithm::Camellia192 => 16,
            SymmetricKeyAlgorithm::Camellia256 => 16,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// The size of the key in bytes.
    pub fn key_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => 16,
            SymmetricKeyAlgorithm::TripleDES => 24,
            SymmetricKeyAlgorithm::CAST5 => 16,
            SymmetricKeyAlgorithm::Blowfish => 16,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 24,
            SymmetricKeyAlgorithm::AES256 => 32,
            SymmetricKeyAlgorithm::Twofish => 32,
            SymmetricKeyAlgorithm::Camellia128 => 16,
            SymmetricKeyAlgorithm::Camellia192 => 24,
            SymmetricKeyAlgorithm::Camellia256 => 32,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// Generate a new session key.
    pub fn new_session_key<R: Rng + CryptoRng>(self, rng: &mut R) -> Vec<u8> {
        let mut key = vec![0u8; self.key_size()];
        rng.fill_bytes(&mut key);
        key
    }

    /// Decrypt the data using CFB mode, without padding. Overwrites the input.
    /// Uses an IV of all zeroes, and does the legacy OpenPGP resynchronization
    /// after the prefix, as used by SED packets.
    pub fn decrypt<'a>(self, key: &[u8], ciphertext: &'a mut [u8]) -> Result<&'a [u8]> {
        debug!("unprotected decrypt");
        let bs = self.block_size();
        ensure!(ciphertext.len() >= bs + 2, "invalid ciphertext length");

        with_cipher!(self, decrypt_resync, key, ciphertext, bs);

        Ok(&ciphertext[bs + 2..])
    }

    /// Decrypt the data using CFB mode, without padding. Overwrites the input.
    /// Uses an IV of all zeroes and no resynchronization, as used by SEIPD
    /// packets; the trailing MDC packet is verified and stripped.
    pub fn decrypt_protected<'a>(self, key: &[u8], ciphertext: &'a mut [u8]) -> Result<&'a [u8]> {
        debug!("protected decrypt");
        let bs = self.block_size();
        // MDC is 1 byte packet tag, 1 byte length prefix and 20 bytes SHA1 hash.
        let mdc_len = 22;
        ensure!(
            ciphertext.len() >= bs + 2 + mdc_len,
            "invalid ciphertext length"
        );

        let iv = vec![0u8; bs];
        with_cipher!(self, decrypt_regular, key, &iv, ciphertext);
        quick_check(ciphertext, bs)?;

        let len = ciphertext.len();
        let (data, mdc) = ciphertext.split_at(len - mdc_len);

        if mdc[0] != 0xD3 || mdc[1] != 0x14 {
            return Err(Error::MdcError);
        }

        let sha1 = checksum::calculate_sha1([data, &mdc[..2]]);
        if mdc[2..] != sha1[..] {
            return Err(Error::MdcError);
        }

        Ok(&ciphertext[bs + 2..len - mdc_len])
    }

    /// Decrypt the data using CFB mode with the given IV, without the OpenPGP
    /// prefix handling. Used for secret key material.
    pub fn decrypt_with_iv_regular(self, key: &[u8], iv: &[u8], ciphertext: &mut [u8]) -> Result<()> {
        with_cipher!(self, decrypt_regular, key, iv, ciphertext);
        Ok(())
    }

    /// Encrypt the data using CFB mode with the given IV, without the OpenPGP
    /// prefix handling. Used for secret key material.
    pub fn encrypt_with_iv_regular(self, key: &[u8], iv: &[u8], plaintext: &mut [u8]) -> Result<()> {
        with_cipher!(self, encrypt_regular, key, iv, plaintext);
        Ok(())
    }

    /// Encrypt the data using CFB mode with the legacy resynchronization,
    /// producing the body of a SED packet.
    pub fn encrypt<R: Rng + CryptoRng>(
        self,
        rng: &mut R,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        debug!("unprotected encrypt");
        let bs = self.block_size();
        ensure!(bs > 0, "invalid algorithm {:?}", self);

        let mut prefix = vec![0u8; bs + 2];
        rng.fill_bytes(&mut prefix[..bs]);
        prefix[bs] = prefix[bs - 2];
        prefix[bs + 1] = prefix[bs - 1];

        let mut data = plaintext.to_vec();
        with_cipher!(self, encrypt_resync, key, &mut prefix, &mut data, bs);

        prefix.extend(data);
        Ok(prefix)
    }

    /// Encrypt the data using CFB mode without resynchronization, producing
    /// the body of a SEIPD packet (including the trailing MDC packet).
    pub fn encrypt_protected<R: Rng + CryptoRng>(
        self,
        rng: &mut R,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        debug!("protected encrypt");
        let bs = self.block_size();
        ensure!(bs > 0, "invalid algorithm {:?}", self);

        let mut buf = Vec::with_capacity(bs + 2 + plaintext.len() + 22);
        buf.resize(bs + 2, 0);
        rng.fill_bytes(&mut buf[..bs]);
        buf[bs] = buf[bs - 2];
        buf[bs + 1] = buf[bs - 1];

        buf.extend_from_slice(plaintext);
        // the MDC packet header is part of the hashed data
        buf.extend_from_slice(&[0xD3, 0x14]);
        let mdc = checksum::calculate_sha1([&buf[..]]);
        buf.extend_from_slice(&mdc);

        let iv = vec![0u8; bs];
        with_cipher!(self, encrypt_regular, key, &iv, &mut buf);

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn roundtrip_protected(alg: SymmetricKeyAlgorithm) {
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let key = alg.new_session_key(&mut rng);
        let data = b"hello world, this is a protected message".to_vec();

        let mut ciphertext = alg.encrypt_protected(&mut rng, &key, &data).unwrap();
        assert_ne!(&ciphertext[alg.block_size() + 2..], &data[..]);

        let plaintext = alg.decrypt_protected(&key, &mut ciphertext).unwrap();
        assert_eq!(plaintext, &data[..]);
    }

    fn roundtrip_unprotected(alg: SymmetricKeyAlgorithm) {
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let key = alg.new_session_key(&mut rng);
        let data = b"hello world, this one resyncs".to_vec();

        let mut ciphertext = alg.encrypt(&mut rng, &key, &data).unwrap();
        let plaintext = alg.decrypt(&key, &mut ciphertext).unwrap();
        assert_eq!(plaintext, &data[..]);
    }

    #[test]
    fn test_roundtrips() {
        for alg in [
            SymmetricKeyAlgorithm::IDEA,
            SymmetricKeyAlgorithm::TripleDES,
            SymmetricKeyAlgorithm::CAST5,
            SymmetricKeyAlgorithm::Blowfish,
            SymmetricKeyAlgorithm::AES128,
            SymmetricKeyAlgorithm::AES192,
            SymmetricKeyAlgorithm::AES256,
            SymmetricKeyAlgorithm::Twofish,
            SymmetricKeyAlgorithm::Camellia128,
            SymmetricKeyAlgorithm::Camellia192,
            SymmetricKeyAlgorithm::Camellia256,
        ] {
            roundtrip_protected(alg);
            roundtrip_unprotected(alg);
        }
    }

    #[test]
    fn test_mdc_tamper_detected() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let alg = SymmetricKeyAlgorithm::AES256;

        let key = alg.new_session_key(&mut rng);
        let mut ciphertext = alg.encrypt_protected(&mut rng, &key, b"payload").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 1;

        let err = alg.decrypt_protected(&key, &mut ciphertext).unwrap_err();
        assert!(matches!(err, Error::MdcError));
    }

    #[test]
    fn test_wrong_key_fails_quick_check() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let alg = SymmetricKeyAlgorithm::AES128;

        let key = alg.new_session_key(&mut rng);
        let mut ciphertext = alg.encrypt_protected(&mut rng, &key, b"payload").unwrap();

        let wrong = alg.new_session_key(&mut rng);
        assert!(alg.decrypt_protected(&wrong, &mut ciphertext).is_err());
    }
}
