use std::collections::HashSet;
use std::io;

use chrono::Duration;
use log::warn;

use crate::composed::signed_key::{SignedUser, SignedUserAttribute};
use crate::errors::Result;
use crate::packet::{self, write_packet, Signature};
use crate::ser::Serialize;
use crate::types::PublicKeyTrait;

/// Shared details between secret and public keys: the certifications of the
/// primary key and its users.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignedKeyDetails {
    pub revocation_signatures: Vec<packet::Signature>,
    pub direct_signatures: Vec<packet::Signature>,
    pub users: Vec<SignedUser>,
    pub user_attributes: Vec<SignedUserAttribute>,
}

impl SignedKeyDetails {
    pub fn new(
        revocation_signatures: Vec<packet::Signature>,
        direct_signatures: Vec<packet::Signature>,
        mut users: Vec<SignedUser>,
        mut user_attributes: Vec<SignedUserAttribute>,
    ) -> Self {
        users.retain(|user| {
            if user.signatures.is_empty() {
                warn!("ignoring unsigned {}", user.id);
                false
            } else {
                true
            }
        });

        user_attributes.retain(|attr| {
            if attr.signatures.is_empty() {
                warn!("ignoring unsigned {}", attr.attr);
                false
            } else {
                true
            }
        });

        SignedKeyDetails {
            revocation_signatures,
            direct_signatures,
            users,
            user_attributes,
        }
    }

    /// The key expiration, from the primary user's certification.
    pub fn key_expiration_time(&self) -> Option<Duration> {
        let primary = self
            .users
            .iter()
            .find(|u| u.is_primary())
            .or_else(|| self.users.first())?;

        primary
            .signatures
            .iter()
            .find_map(|sig| sig.key_expiration_time())
            .copied()
    }

    /// Verify all bindings with the given primary key.
    pub fn verify(&self, key: &impl PublicKeyTrait) -> Result<()> {
        for user in &self.users {
            user.verify(key)?;
        }

        for attr in &self.user_attributes {
            attr.verify(key)?;
        }

        for sig in &self.revocation_signatures {
            sig.verify_key(key)?;
        }

        for sig in &self.direct_signatures {
            sig.verify_key(key)?;
        }

        Ok(())
    }

    /// Union the details of two views of the same key. Signatures are
    /// deduplicated by their serialized form, new users are appended in their
    /// original order.
    pub fn merge(mut self, other: SignedKeyDetails) -> Result<SignedKeyDetails> {
        merge_signatures(&mut self.revocation_signatures, other.revocation_signatures)?;
        merge_signatures(&mut self.direct_signatures, other.direct_signatures)?;

        for user in other.users {
            match self.users.iter_mut().find(|u| u.id == user.id) {
                Some(existing) => {
                    merge_signatures(&mut existing.signatures, user.signatures)?;
                }
                None => self.users.push(user),
            }
        }

        for attr in other.user_attributes {
            match self.user_attributes.iter_mut().find(|a| a.attr == attr.attr) {
                Some(existing) => {
                    merge_signatures(&mut existing.signatures, attr.signatures)?;
                }
                None => self.user_attributes.push(attr),
            }
        }

        Ok(self)
    }
}

/// Append the signatures from `incoming` that are not already present,
/// keeping the existing order.
pub(crate) fn merge_signatures(
    existing: &mut Vec<Signature>,
    incoming: Vec<Signature>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for sig in existing.iter() {
        seen.insert(sig.to_bytes()?);
    }

    for sig in incoming {
        if seen.insert(sig.to_bytes()?) {
            existing.push(sig);
        }
    }

    Ok(())
}

impl Serialize for SignedKeyDetails {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for sig in &self.revocation_signatures {
            write_packet(writer, sig)?;
        }

        for sig in &self.direct_signatures {
            write_packet(writer, sig)?;
        }

        for user in &self.users {
            user.to_writer(writer)?;
        }

        for attr in &self.user_attributes {
            attr.to_writer(writer)?;
        }

        Ok(())
    }
}
