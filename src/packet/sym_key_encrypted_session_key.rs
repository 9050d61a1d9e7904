use std::fmt;
use std::io;

use nom::combinator::rest;
use nom::number::streaming::be_u8;

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{s2k_parser, StringToKey, Tag, Version};

/// Symmetric-Key Encrypted Session Key Packet
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.3>
#[derive(Clone, PartialEq, Eq)]
pub struct SymKeyEncryptedSessionKey {
    packet_version: Version,
    version: u8,
    sym_algorithm: SymmetricKeyAlgorithm,
    s2k: StringToKey,
    encrypted_key: Option<Vec<u8>>,
}

impl SymKeyEncryptedSessionKey {
    /// Encrypt the given session key with a passphrase derived key.
    /// The encrypted session key blob carries the message algorithm.
    pub fn encrypt(
        passphrase: &str,
        session_key: &[u8],
        s2k: StringToKey,
        alg: SymmetricKeyAlgorithm,
    ) -> Result<Self> {
        let key = s2k.derive_key(passphrase, alg.key_size())?;

        let mut private_key = Vec::with_capacity(session_key.len() + 1);
        private_key.push(alg.into());
        private_key.extend_from_slice(session_key);

        let iv = vec![0u8; alg.block_size()];
        alg.encrypt_with_iv_regular(&key, &iv, &mut private_key)?;

        Ok(SymKeyEncryptedSessionKey {
            packet_version: Default::default(),
            version: 4,
            sym_algorithm: alg,
            s2k,
            encrypted_key: Some(private_key),
        })
    }

    /// A packet without an encrypted session key: the derived key is the
    /// session key itself.
    pub fn from_s2k(s2k: StringToKey, alg: SymmetricKeyAlgorithm) -> Self {
        SymKeyEncryptedSessionKey {
            packet_version: Default::default(),
            version: 4,
            sym_algorithm: alg,
            s2k,
            encrypted_key: None,
        }
    }

    /// Recover the session key with the given passphrase.
    /// Returns the message algorithm and the raw session key.
    pub fn decrypt(&self, passphrase: &str) -> Result<(SymmetricKeyAlgorithm, Vec<u8>)> {
        let key = self
            .s2k
            .derive_key(passphrase, self.sym_algorithm.key_size())?;

        match self.encrypted_key {
            Some(ref encrypted_key) => {
                let mut decrypted_key = encrypted_key.clone();
                let iv = vec![0u8; self.sym_algorithm.block_size()];
                self.sym_algorithm
                    .decrypt_with_iv_regular(&key, &iv, &mut decrypted_key)?;

                ensure!(decrypted_key.len() > 1, "invalid encrypted session key");
                let alg = SymmetricKeyAlgorithm::from(decrypted_key[0]);
                ensure!(alg.key_size() > 0, "invalid session key algorithm");
                ensure_eq!(
                    decrypted_key.len() - 1,
                    alg.key_size(),
                    "invalid session key length"
                );

                Ok((alg, decrypted_key[1..].to_vec()))
            }
            None => Ok((self.sym_algorithm, key)),
        }
    }

    pub fn sym_algorithm(&self) -> SymmetricKeyAlgorithm {
        self.sym_algorithm
    }
}

impl Deserialize for SymKeyEncryptedSessionKey {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        let (i, version) = be_u8(input)?;
        ensure_eq!(version, 4, "invalid skesk version");

        let (i, sym_alg) = be_u8(i)?;
        let (i, s2k) = s2k_parser(i)?;
        let (_, esk) = rest(i)?;

        Ok(SymKeyEncryptedSessionKey {
            packet_version,
            version,
            sym_algorithm: SymmetricKeyAlgorithm::from(sym_alg),
            s2k,
            encrypted_key: if esk.is_empty() {
                None
            } else {
                Some(esk.to_vec())
            },
        })
    }
}

impl Serialize for SymKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.version, self.sym_algorithm.into()])?;
        self.s2k.to_writer(writer)?;

        if let Some(ref esk) = self.encrypted_key {
            writer.write_all(esk)?;
        }

        Ok(())
    }
}

impl PacketTrait for SymKeyEncryptedSessionKey {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::SymKeyEncryptedSessionKey
    }
}

impl fmt::Debug for SymKeyEncryptedSessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymKeyEncryptedSessionKey")
            .field("version", &self.version)
            .field("sym_algorithm", &self.sym_algorithm)
            .field("s2k", &self.s2k)
            .field(
                "encrypted_key",
                &self.encrypted_key.as_ref().map(hex::encode),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_esk_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let alg = SymmetricKeyAlgorithm::AES256;
        let session_key = alg.new_session_key(&mut rng);

        let s2k = StringToKey::new_default(&mut rng);
        let esk = SymKeyEncryptedSessionKey::encrypt("secret", &session_key, s2k, alg).unwrap();

        let (got_alg, got_key) = esk.decrypt("secret").unwrap();
        assert_eq!(got_alg, alg);
        assert_eq!(got_key, session_key);
    }

    #[test]
    fn test_without_esk() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let alg = SymmetricKeyAlgorithm::AES128;

        let s2k = StringToKey::new_default(&mut rng);
        let packet = SymKeyEncryptedSessionKey::from_s2k(s2k.clone(), alg);

        let (got_alg, got_key) = packet.decrypt("secret").unwrap();
        assert_eq!(got_alg, alg);
        assert_eq!(got_key, s2k.derive_key("secret", alg.key_size()).unwrap());
    }
}
