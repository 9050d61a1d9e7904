use std::io;

use rand::{CryptoRng, Rng};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::crypto::{dsa, rsa};
use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::key::public::parse_key_fields;
use crate::packet::key::{PublicKey, PublicSubkey};
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{
    EncryptedSecretParams, KeyId, KeyTrait, Mpi, PublicKeyTrait, PublicParams, SecretKeyRepr,
    SecretKeyTrait, SecretParams, StringToKey, Tag, Version,
};

macro_rules! impl_secret_key {
    ($name:ident, $tag:expr, $pub_key:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            details: $pub_key,
            secret_params: SecretParams,
        }

        impl $name {
            pub fn new(details: $pub_key, secret_params: SecretParams) -> Self {
                $name {
                    details,
                    secret_params,
                }
            }

            pub fn public_key(&self) -> &$pub_key {
                &self.details
            }

            pub fn into_public(self) -> $pub_key {
                self.details
            }

            pub fn secret_params(&self) -> &SecretParams {
                &self.secret_params
            }

            /// Checks if we should expect a passphrase for unlocking.
            pub fn has_password(&self) -> bool {
                self.secret_params.is_encrypted()
            }

            /// Protect the secret key material with a passphrase, using the
            /// SHA-1 checked (usage octet 254) form.
            pub fn set_password<R: Rng + CryptoRng>(
                &mut self,
                rng: &mut R,
                passphrase: &str,
            ) -> Result<()> {
                let s2k = StringToKey::new_default(rng);
                self.set_password_with_s2k(rng, passphrase, s2k, SymmetricKeyAlgorithm::AES256)
            }

            pub fn set_password_with_s2k<R: Rng + CryptoRng>(
                &mut self,
                rng: &mut R,
                passphrase: &str,
                s2k: StringToKey,
                alg: SymmetricKeyAlgorithm,
            ) -> Result<()> {
                let plain = match &self.secret_params {
                    SecretParams::Plain(plain) => plain,
                    SecretParams::Encrypted(_) => bail!("key is already password protected"),
                };

                let mut data = plain.to_bytes()?;
                data.extend_from_slice(&plain.checksum_sha1()?);

                let key = s2k.derive_key(passphrase, alg.key_size())?;
                let mut iv = vec![0u8; alg.block_size()];
                rng.fill_bytes(&mut iv);

                alg.encrypt_with_iv_regular(&key, &iv, &mut data)?;

                self.secret_params = SecretParams::Encrypted(EncryptedSecretParams {
                    data,
                    iv,
                    encryption_algorithm: alg,
                    string_to_key: s2k,
                    string_to_key_id: 254,
                });

                Ok(())
            }

            /// Remove the password protection, storing the material in the
            /// clear (with a simple checksum).
            pub fn remove_password<F: FnOnce() -> String>(&mut self, password: F) -> Result<()> {
                if let SecretParams::Encrypted(enc) = &self.secret_params {
                    let plain = enc.unlock(&password(), self.details.algorithm())?;
                    self.secret_params = SecretParams::Plain(plain);
                }

                Ok(())
            }
        }

        impl KeyTrait for $name {
            fn fingerprint(&self) -> Vec<u8> {
                self.details.fingerprint()
            }

            fn key_id(&self) -> KeyId {
                self.details.key_id()
            }

            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.details.algorithm()
            }
        }

        impl PublicKeyTrait for $name {
            fn verify_signature(
                &self,
                hash: HashAlgorithm,
                data: &[u8],
                sig: &[Mpi],
            ) -> Result<()> {
                self.details.verify_signature(hash, data, sig)
            }

            fn encrypt<R: CryptoRng + Rng>(&self, rng: &mut R, plain: &[u8]) -> Result<Vec<Mpi>> {
                self.details.encrypt(rng, plain)
            }

            fn serialize_for_hashing(&self) -> Result<Vec<u8>> {
                self.details.serialize_for_hashing()
            }
        }

        impl SecretKeyTrait for $name {
            fn unlock<F, G, T>(&self, pw: F, work: G) -> Result<T>
            where
                F: FnOnce() -> String,
                G: FnOnce(&SecretKeyRepr) -> Result<T>,
            {
                let decrypted = match self.secret_params {
                    SecretParams::Plain(ref plain) => {
                        plain.as_repr(self.details.public_params())?
                    }
                    SecretParams::Encrypted(ref enc) => {
                        let plain = enc.unlock(&pw(), self.details.algorithm())?;
                        plain.as_repr(self.details.public_params())?
                    }
                };

                work(&decrypted)
            }

            fn create_signature(
                &self,
                key_pw: &str,
                hash: HashAlgorithm,
                data: &[u8],
            ) -> Result<Vec<Mpi>> {
                self.unlock(
                    || key_pw.to_string(),
                    |repr| match repr {
                        SecretKeyRepr::RSA(key) => rsa::sign(key, hash, data),
                        SecretKeyRepr::DSA(key) => dsa::sign(key, data),
                        SecretKeyRepr::Elgamal { .. } => {
                            unsupported_err!("signatures with Elgamal")
                        }
                    },
                )
            }
        }

        impl Deserialize for $name {
            fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
                let (i, (version, algorithm, created_at, expiration, public_params)) =
                    parse_key_fields(input)?;

                if let PublicParams::Unknown { .. } = public_params {
                    unsupported_err!("secret keys with {:?}", algorithm);
                }

                let details = $pub_key::new(
                    packet_version,
                    version,
                    algorithm,
                    created_at,
                    expiration,
                    public_params,
                )?;
                let secret_params = SecretParams::from_slice(i, algorithm)?;

                Ok($name {
                    details,
                    secret_params,
                })
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.details.to_writer(writer)?;
                self.secret_params.to_writer(writer)?;

                Ok(())
            }
        }

        impl PacketTrait for $name {
            fn packet_version(&self) -> Version {
                self.details.packet_version()
            }

            fn tag(&self) -> Tag {
                $tag
            }
        }
    };
}

impl_secret_key!(SecretKey, Tag::SecretKey, PublicKey);
impl_secret_key!(SecretSubkey, Tag::SecretSubkey, PublicSubkey);
