use chrono::{DateTime, SubsecRound, Utc};
use derive_builder::Builder;
use rand::{CryptoRng, Rng};
use smallvec::SmallVec;

use crate::composed::key::{KeyDetails, SecretKey, SecretSubkey};
use crate::crypto::dsa::{self, DsaKeySize};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::rsa;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::{self, KeyFlags, UserAttribute, UserId};
use crate::types::{CompressionAlgorithm, KeyVersion, PublicParams, SecretParams, Version};

/// Everything needed to generate a new transferable secret key.
#[derive(Debug, PartialEq, Eq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SecretKeyParams {
    key_type: KeyType,

    // -- Keyflags
    #[builder(default)]
    can_sign: bool,
    #[builder(default)]
    can_certify: bool,
    #[builder(default)]
    can_encrypt: bool,

    // -- Preferences
    /// List of symmetric algorithms that indicate which algorithms the key holder prefers to use.
    #[builder(default)]
    preferred_symmetric_algorithms: SmallVec<[SymmetricKeyAlgorithm; 8]>,
    /// List of hash algorithms that indicate which algorithms the key holder prefers to use.
    #[builder(default)]
    preferred_hash_algorithms: SmallVec<[HashAlgorithm; 8]>,
    /// List of compression algorithms that indicate which algorithms the key holder prefers to use.
    #[builder(default)]
    preferred_compression_algorithms: SmallVec<[CompressionAlgorithm; 8]>,

    primary_user_id: String,
    #[builder(default)]
    user_ids: Vec<String>,
    #[builder(default)]
    user_attributes: Vec<UserAttribute>,

    #[builder(default)]
    passphrase: Option<String>,
    #[builder(default = "Utc::now().trunc_subsecs(0)")]
    created_at: DateTime<Utc>,
    #[builder(default)]
    packet_version: Version,

    #[builder(default)]
    subkeys: Vec<SubkeyParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct SubkeyParams {
    key_type: KeyType,

    #[builder(default)]
    can_sign: bool,
    #[builder(default)]
    can_encrypt: bool,
    #[builder(default)]
    can_authenticate: bool,

    #[builder(default)]
    passphrase: Option<String>,
    #[builder(default = "Utc::now().trunc_subsecs(0)")]
    created_at: DateTime<Utc>,
    #[builder(default)]
    packet_version: Version,
}

impl SecretKeyParamsBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(key_type) = &self.key_type {
            key_type.validate(self.can_sign.unwrap_or_default(), true)?;

            if self.can_encrypt.unwrap_or_default() && !key_type.to_alg().can_encrypt() {
                return Err(format!("{key_type:?} can not be used for encryption"));
            }
        }

        if let Some(primary_user_id) = &self.primary_user_id {
            if primary_user_id.is_empty() {
                return Err("at least one user id is required".into());
            }
        }

        if let Some(preferred_symmetric_algorithms) = &self.preferred_symmetric_algorithms {
            for alg in preferred_symmetric_algorithms {
                if alg.key_size() == 0 {
                    return Err(format!("unsupported symmetric algorithm {alg:?}"));
                }
            }
        }

        if let Some(preferred_hash_algorithms) = &self.preferred_hash_algorithms {
            for alg in preferred_hash_algorithms {
                if alg.digest_size() == 0 {
                    return Err(format!("unsupported hash algorithm {alg:?}"));
                }
            }
        }

        if let Some(subkeys) = &self.subkeys {
            for subkey in subkeys {
                subkey
                    .key_type
                    .validate(subkey.can_sign, false)
                    .map_err(|err| format!("invalid subkey: {err}"))?;

                if subkey.can_encrypt && !subkey.key_type.to_alg().can_encrypt() {
                    return Err(format!(
                        "subkey {:?} can not be used for encryption",
                        subkey.key_type
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn user_id<VALUE: Into<String>>(&mut self, value: VALUE) -> &mut Self {
        match self.user_ids {
            Some(ref mut user_ids) => user_ids.push(value.into()),
            None => self.user_ids = Some(vec![value.into()]),
        }
        self
    }

    pub fn subkey<VALUE: Into<SubkeyParams>>(&mut self, value: VALUE) -> &mut Self {
        match self.subkeys {
            Some(ref mut subkeys) => subkeys.push(value.into()),
            None => self.subkeys = Some(vec![value.into()]),
        }
        self
    }
}

impl SecretKeyParams {
    pub fn generate<R: Rng + CryptoRng>(self, mut rng: R) -> Result<SecretKey> {
        let passphrase = self.passphrase;
        let (public_params, secret_params) = self.key_type.generate(&mut rng)?;

        let pub_key = packet::PublicKey::new(
            self.packet_version,
            KeyVersion::V4,
            self.key_type.to_alg(),
            self.created_at,
            None,
            public_params,
        )?;
        let mut primary_key = packet::SecretKey::new(pub_key, secret_params);
        if let Some(passphrase) = passphrase {
            primary_key.set_password(&mut rng, &passphrase)?;
        }

        let mut keyflags = KeyFlags::default();
        keyflags.set_certify(self.can_certify);
        keyflags.set_encrypt_comms(self.can_encrypt);
        keyflags.set_encrypt_storage(self.can_encrypt);
        keyflags.set_sign(self.can_sign);

        Ok(SecretKey::new(
            primary_key,
            KeyDetails::new(
                UserId::from_str(Default::default(), self.primary_user_id),
                self.user_ids
                    .into_iter()
                    .map(|m| UserId::from_str(Default::default(), m))
                    .collect(),
                self.user_attributes,
                keyflags,
                self.preferred_symmetric_algorithms,
                self.preferred_hash_algorithms,
                self.preferred_compression_algorithms,
            ),
            self.subkeys
                .into_iter()
                .map(|subkey| {
                    let passphrase = subkey.passphrase;
                    let (public_params, secret_params) = subkey.key_type.generate(&mut rng)?;

                    let mut keyflags = KeyFlags::default();
                    keyflags.set_encrypt_comms(subkey.can_encrypt);
                    keyflags.set_encrypt_storage(subkey.can_encrypt);
                    keyflags.set_sign(subkey.can_sign);
                    keyflags.set_authentication(subkey.can_authenticate);

                    let pub_key = packet::PublicSubkey::new(
                        subkey.packet_version,
                        KeyVersion::V4,
                        subkey.key_type.to_alg(),
                        subkey.created_at,
                        None,
                        public_params,
                    )?;
                    let mut sub = packet::SecretSubkey::new(pub_key, secret_params);

                    if let Some(passphrase) = passphrase {
                        sub.set_password(&mut rng, &passphrase)?;
                    }

                    Ok(SecretSubkey::new(sub, keyflags))
                })
                .collect::<Result<Vec<_>>>()?,
        ))
    }
}

/// The kind of key material to generate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyType {
    /// Encryption & Signing with RSA and the given bitsize.
    Rsa(u32),
    /// Signing with DSA.
    Dsa(DsaKeySize),
}

impl KeyType {
    pub fn to_alg(&self) -> PublicKeyAlgorithm {
        match self {
            KeyType::Rsa(_) => PublicKeyAlgorithm::RSA,
            KeyType::Dsa(_) => PublicKeyAlgorithm::DSA,
        }
    }

    fn validate(&self, can_sign: bool, primary: bool) -> std::result::Result<(), String> {
        match self {
            KeyType::Rsa(size) => {
                if *size < 1024 {
                    return Err("keys with less than 1024 bits are insecure".into());
                }
            }
            KeyType::Dsa(_) => {}
        }

        if (can_sign || primary) && !self.to_alg().can_sign() {
            return Err(format!("{self:?} can not be used for signing"));
        }

        Ok(())
    }

    pub fn generate<R: Rng + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(PublicParams, SecretParams)> {
        let (public_params, plain) = match self {
            KeyType::Rsa(bit_size) => rsa::generate_key(rng, *bit_size as usize)?,
            KeyType::Dsa(key_size) => dsa::generate_key(rng, *key_size)?,
        };

        Ok((public_params, SecretParams::Plain(plain)))
    }
}
