use chrono::{SubsecRound, Utc};

use crate::composed::key::KeyDetails;
use crate::composed::signed_key::{SignedSecretKey, SignedSecretSubKey};
use crate::crypto::hash::HashAlgorithm;
use crate::errors::Result;
use crate::packet::{self, KeyFlags, SignatureConfig, SignatureType, Subpacket, SubpacketData};
use crate::types::{KeyTrait, SecretKeyTrait};

/// A generated secret key, before self-signing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecretKey {
    primary_key: packet::SecretKey,
    details: KeyDetails,
    secret_subkeys: Vec<SecretSubkey>,
}

/// A generated secret subkey, before binding.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecretSubkey {
    key: packet::SecretSubkey,
    keyflags: KeyFlags,
}

impl SecretKey {
    pub fn new(
        primary_key: packet::SecretKey,
        details: KeyDetails,
        secret_subkeys: Vec<SecretSubkey>,
    ) -> Self {
        SecretKey {
            primary_key,
            details,
            secret_subkeys,
        }
    }

    /// Turn this into a transferable secret key by creating the
    /// self-signatures and subkey bindings.
    pub fn sign(self, key_pw: &str) -> Result<SignedSecretKey> {
        let primary_key = self.primary_key;

        let details = self.details.sign(&primary_key, key_pw)?;
        let secret_subkeys = self
            .secret_subkeys
            .into_iter()
            .map(|k| k.sign(&primary_key, key_pw))
            .collect::<Result<Vec<_>>>()?;

        Ok(SignedSecretKey::new(
            primary_key,
            details,
            Vec::new(),
            secret_subkeys,
        ))
    }
}

impl SecretSubkey {
    pub fn new(key: packet::SecretSubkey, keyflags: KeyFlags) -> Self {
        SecretSubkey { key, keyflags }
    }

    /// Create the subkey binding signature (0x18), issued by the primary.
    pub fn sign(self, sec_key: &packet::SecretKey, key_pw: &str) -> Result<SignedSecretSubKey> {
        let key = self.key;

        let mut config = SignatureConfig::v4(
            SignatureType::SubkeyBinding,
            sec_key.algorithm(),
            HashAlgorithm::default(),
        );
        config.hashed_subpackets = vec![
            Subpacket::regular(SubpacketData::SignatureCreationTime(
                Utc::now().trunc_subsecs(0),
            )),
            Subpacket::regular(SubpacketData::KeyFlags(self.keyflags)),
        ];
        config.unhashed_subpackets =
            vec![Subpacket::regular(SubpacketData::Issuer(sec_key.key_id()))];

        let signatures = vec![config.sign_key_binding(sec_key, key_pw, key.public_key())?];

        Ok(SignedSecretSubKey::new(key, signatures))
    }
}
