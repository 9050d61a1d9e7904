use chrono::{SubsecRound, Utc};
use smallvec::SmallVec;

use crate::composed::signed_key::{SignedKeyDetails, SignedUser, SignedUserAttribute};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::{
    KeyFlags, SignatureConfig, SignatureType, Subpacket, SubpacketData, UserAttribute, UserId,
};
use crate::types::{CompressionAlgorithm, KeyTrait, SecretKeyTrait, Tag};

/// The user facing identity and preferences of a fresh key, before it has
/// been bound by self-signatures.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct KeyDetails {
    primary_user_id: UserId,
    user_ids: Vec<UserId>,
    user_attributes: Vec<UserAttribute>,
    keyflags: KeyFlags,
    preferred_symmetric_algorithms: SmallVec<[SymmetricKeyAlgorithm; 8]>,
    preferred_hash_algorithms: SmallVec<[HashAlgorithm; 8]>,
    preferred_compression_algorithms: SmallVec<[CompressionAlgorithm; 8]>,
}

impl KeyDetails {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        primary_user_id: UserId,
        user_ids: Vec<UserId>,
        user_attributes: Vec<UserAttribute>,
        keyflags: KeyFlags,
        preferred_symmetric_algorithms: SmallVec<[SymmetricKeyAlgorithm; 8]>,
        preferred_hash_algorithms: SmallVec<[HashAlgorithm; 8]>,
        preferred_compression_algorithms: SmallVec<[CompressionAlgorithm; 8]>,
    ) -> Self {
        KeyDetails {
            primary_user_id,
            user_ids,
            user_attributes,
            keyflags,
            preferred_symmetric_algorithms,
            preferred_hash_algorithms,
            preferred_compression_algorithms,
        }
    }

    /// Produce positive certification self-signatures (0x13) over all user
    /// ids and attributes.
    pub fn sign<K>(self, key: &K, key_pw: &str) -> Result<SignedKeyDetails>
    where
        K: SecretKeyTrait + KeyTrait,
    {
        let keyflags = self.keyflags;
        let preferred_symmetric_algorithms = self.preferred_symmetric_algorithms;
        let preferred_hash_algorithms = self.preferred_hash_algorithms;
        let preferred_compression_algorithms = self.preferred_compression_algorithms;

        let config = |primary: bool| -> SignatureConfig {
            let mut config = SignatureConfig::v4(
                SignatureType::CertPositive,
                key.algorithm(),
                HashAlgorithm::default(),
            );

            let mut hashed = vec![
                Subpacket::regular(SubpacketData::SignatureCreationTime(
                    Utc::now().trunc_subsecs(0),
                )),
                Subpacket::regular(SubpacketData::KeyFlags(keyflags)),
                Subpacket::regular(SubpacketData::PreferredSymmetricAlgorithms(
                    preferred_symmetric_algorithms.clone(),
                )),
                Subpacket::regular(SubpacketData::PreferredHashAlgorithms(
                    preferred_hash_algorithms.clone(),
                )),
                Subpacket::regular(SubpacketData::PreferredCompressionAlgorithms(
                    preferred_compression_algorithms.clone(),
                )),
            ];
            if primary {
                hashed.push(Subpacket::regular(SubpacketData::PrimaryUserId(true)));
            }

            config.hashed_subpackets = hashed;
            config.unhashed_subpackets =
                vec![Subpacket::regular(SubpacketData::Issuer(key.key_id()))];

            config
        };

        let mut users = Vec::with_capacity(1 + self.user_ids.len());

        {
            let id = self.primary_user_id;
            let sig = config(true).sign_certification(key, key_pw, Tag::UserId, &id)?;
            users.push(SignedUser::new(id, vec![sig]));
        }

        for id in self.user_ids {
            let sig = config(false).sign_certification(key, key_pw, Tag::UserId, &id)?;
            users.push(SignedUser::new(id, vec![sig]));
        }

        let mut user_attributes = Vec::with_capacity(self.user_attributes.len());
        for attr in self.user_attributes {
            let sig = config(false).sign_certification(key, key_pw, Tag::UserAttribute, &attr)?;
            user_attributes.push(SignedUserAttribute::new(attr, vec![sig]));
        }

        Ok(SignedKeyDetails {
            revocation_signatures: Vec::new(),
            direct_signatures: Vec::new(),
            users,
            user_attributes,
        })
    }
}
