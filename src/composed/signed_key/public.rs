use std::io;
use std::iter::Peekable;

use chrono::{DateTime, Utc};
use log::warn;
use rand::{CryptoRng, Rng};

use crate::armor::{self, BlockType, Headers};
use crate::composed::shared::Deserializable;
use crate::composed::signed_key::{key_parser, merge_signatures, SignedKeyDetails};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::{self, write_packet, Packet, Signature, SignatureType};
use crate::ser::Serialize;
use crate::types::{KeyId, KeyTrait, Mpi, PublicKeyTrait, Tag};

/// A signed ("transferable") public key: the primary key, its certifications
/// and its subkeys.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-11.1>
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignedPublicKey {
    pub primary_key: packet::PublicKey,
    pub details: SignedKeyDetails,
    pub public_subkeys: Vec<SignedPublicSubKey>,
}

/// Parse transferable public keys from the given packets.
pub struct SignedPublicKeyParser<I: Sized + Iterator<Item = Result<Packet>>> {
    inner: Peekable<I>,
}

impl<I: Sized + Iterator<Item = Result<Packet>>> Iterator for SignedPublicKeyParser<I> {
    type Item = Result<SignedPublicKey>;

    fn next(&mut self) -> Option<Self::Item> {
        match key_parser::next::<I, packet::PublicKey>(&mut self.inner, Tag::PublicKey, false) {
            Some(Err(err)) => Some(Err(err)),
            None => None,
            Some(Ok((primary_key, details, public_subkeys, _))) => Some(Ok(SignedPublicKey::new(
                primary_key,
                details,
                public_subkeys,
            ))),
        }
    }
}

impl Deserializable for SignedPublicKey {
    fn from_packets<'a, I: Iterator<Item = Result<Packet>> + 'a>(
        packets: Peekable<I>,
    ) -> Box<dyn Iterator<Item = Result<Self>> + 'a> {
        Box::new(SignedPublicKeyParser { inner: packets })
    }

    fn matches_block_type(typ: BlockType) -> bool {
        matches!(typ, BlockType::PublicKey)
    }
}

impl SignedPublicKey {
    pub fn new(
        primary_key: packet::PublicKey,
        details: SignedKeyDetails,
        mut public_subkeys: Vec<SignedPublicSubKey>,
    ) -> Self {
        public_subkeys.retain(|key| {
            if key.signatures.is_empty() {
                warn!("ignoring unsigned subkey {:?}", key.key.key_id());
                false
            } else {
                true
            }
        });

        SignedPublicKey {
            primary_key,
            details,
            public_subkeys,
        }
    }

    /// Is this a meaningful key: at least one signed user.
    pub fn is_meaningful(&self) -> bool {
        !self.details.users.is_empty() || !self.details.user_attributes.is_empty()
    }

    /// Get the public key expiration as a date.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let expiration = self.details.key_expiration_time()?;
        Some(*self.primary_key.created_at() + expiration)
    }

    /// Verify all signatures of this key against itself.
    pub fn verify(&self) -> Result<()> {
        self.details.verify(&self.primary_key)?;

        for subkey in &self.public_subkeys {
            subkey.verify(&self.primary_key)?;
        }

        Ok(())
    }

    /// Verify the given content signature against the signer referenced in
    /// it: the primary key or a matching subkey. If no key matches, the
    /// verification fails.
    pub fn verify_data(&self, signature: &Signature, data: &[u8]) -> Result<()> {
        match signature.issuer() {
            Some(issuer) => {
                if &self.primary_key.key_id() == issuer {
                    return signature.verify(&self.primary_key, data);
                }

                for subkey in &self.public_subkeys {
                    if &subkey.key.key_id() == issuer {
                        return signature.verify(&subkey.key, data);
                    }
                }

                bail!("no matching key found for issuer {}", issuer);
            }
            None => signature.verify(&self.primary_key, data),
        }
    }

    /// Merge another view of the same key into this one, without losing any
    /// packet. The primaries must be identical.
    pub fn merge(mut self, other: SignedPublicKey) -> Result<SignedPublicKey> {
        ensure!(
            self.primary_key == other.primary_key,
            "mismatched merge: different primary keys"
        );

        self.details = self.details.merge(other.details)?;

        for subkey in other.public_subkeys {
            match self
                .public_subkeys
                .iter_mut()
                .find(|k| k.key.fingerprint() == subkey.key.fingerprint())
            {
                Some(existing) => {
                    merge_signatures(&mut existing.signatures, subkey.signatures)?;
                }
                None => self.public_subkeys.push(subkey),
            }
        }

        Ok(self)
    }

    /// Attach a revocation certificate to the part of the key it revokes.
    /// The certificate must verify against the primary key.
    pub fn apply_revocation(mut self, sig: Signature) -> Result<SignedPublicKey> {
        match sig.typ() {
            SignatureType::KeyRevocation => {
                sig.verify_key(&self.primary_key)?;
                self.details.revocation_signatures.push(sig);
            }
            SignatureType::SubkeyRevocation => {
                let subkey = self
                    .public_subkeys
                    .iter_mut()
                    .find(|k| sig.verify_key_binding(&self.primary_key, &k.key).is_ok())
                    .ok_or_else(|| format_err!("revocation does not match any subkey"))?;
                subkey.signatures.push(sig);
            }
            SignatureType::CertRevocation => {
                if let Some(user) = self.details.users.iter_mut().find(|u| {
                    sig.verify_certification(&self.primary_key, Tag::UserId, &u.id)
                        .is_ok()
                }) {
                    user.signatures.push(sig);
                } else if let Some(attr) = self.details.user_attributes.iter_mut().find(|a| {
                    sig.verify_certification(&self.primary_key, Tag::UserAttribute, &a.attr)
                        .is_ok()
                }) {
                    attr.signatures.push(sig);
                } else {
                    bail!("revocation does not match any user");
                }
            }
            typ => bail!("not a revocation signature: {:?}", typ),
        }

        Ok(self)
    }

    /// Is the primary key revoked? True if any revocation signature verifies
    /// against the primary key.
    pub fn is_revoked(&self) -> bool {
        self.details
            .revocation_signatures
            .iter()
            .any(|sig| sig.verify_key(&self.primary_key).is_ok())
    }

    /// Is the subkey with the given fingerprint revoked? A revocation is
    /// superseded by a newer binding signature.
    pub fn is_subkey_revoked(&self, fingerprint: &[u8]) -> Result<bool> {
        let subkey = self
            .public_subkeys
            .iter()
            .find(|k| k.key.fingerprint() == fingerprint)
            .ok_or_else(|| format_err!("no subkey with the given fingerprint"))?;

        Ok(subkey.is_revoked(&self.primary_key))
    }

    /// Is the given user revoked? A revocation is superseded by a newer
    /// certification.
    pub fn is_user_revoked(&self, id: &packet::UserId) -> Result<bool> {
        let user = self
            .details
            .users
            .iter()
            .find(|u| &u.id == id)
            .ok_or_else(|| format_err!("no matching user id"))?;

        let latest_cert = user
            .signatures
            .iter()
            .filter(|sig| {
                sig.typ().is_certification()
                    && sig
                        .verify_certification(&self.primary_key, Tag::UserId, &user.id)
                        .is_ok()
            })
            .filter_map(|sig| sig.created())
            .max();

        Ok(user
            .signatures
            .iter()
            .filter(|sig| {
                sig.typ() == SignatureType::CertRevocation
                    && sig
                        .verify_certification(&self.primary_key, Tag::UserId, &user.id)
                        .is_ok()
            })
            .filter_map(|sig| sig.created())
            .any(|revoked_at| match latest_cert {
                Some(certified_at) => revoked_at >= certified_at,
                None => true,
            }))
    }

    pub fn to_armored_writer(
        &self,
        writer: &mut impl io::Write,
        headers: Option<&Headers>,
    ) -> Result<()> {
        armor::write(self, BlockType::PublicKey, writer, headers)
    }

    pub fn to_armored_bytes(&self, headers: Option<&Headers>) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_armored_writer(&mut buf, headers)?;
        Ok(buf)
    }

    pub fn to_armored_string(&self, headers: Option<&Headers>) -> Result<String> {
        Ok(String::from_utf8(self.to_armored_bytes(headers)?).map_err(|e| e.utf8_error())?)
    }
}

impl KeyTrait for SignedPublicKey {
    fn fingerprint(&self) -> Vec<u8> {
        self.primary_key.fingerprint()
    }

    fn key_id(&self) -> KeyId {
        self.primary_key.key_id()
    }

    fn algorithm(&self) -> PublicKeyAlgorithm {
        self.primary_key.algorithm()
    }
}

impl PublicKeyTrait for SignedPublicKey {
    fn verify_signature(&self, hash: HashAlgorithm, data: &[u8], sig: &[Mpi]) -> Result<()> {
        self.primary_key.verify_signature(hash, data, sig)
    }

    fn encrypt<R: CryptoRng + Rng>(&self, rng: &mut R, plain: &[u8]) -> Result<Vec<Mpi>> {
        self.primary_key.encrypt(rng, plain)
    }

    fn serialize_for_hashing(&self) -> Result<Vec<u8>> {
        self.primary_key.serialize_for_hashing()
    }
}

impl Serialize for SignedPublicKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_packet(writer, &self.primary_key)?;
        self.details.to_writer(writer)?;
        for subkey in &self.public_subkeys {
            subkey.to_writer(writer)?;
        }

        Ok(())
    }
}

/// A public subkey with its binding signatures.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignedPublicSubKey {
    pub key: packet::PublicSubkey,
    pub signatures: Vec<Signature>,
}

impl SignedPublicSubKey {
    pub fn new(key: packet::PublicSubkey, signatures: Vec<Signature>) -> Self {
        let signatures = signatures
            .into_iter()
            .filter(|sig| {
                if sig.typ() != SignatureType::SubkeyBinding
                    && sig.typ() != SignatureType::SubkeyRevocation
                {
                    warn!(
                        "ignoring unexpected signature {:?} after subkey packet",
                        sig.typ()
                    );
                    false
                } else {
                    true
                }
            })
            .collect();

        SignedPublicSubKey { key, signatures }
    }

    /// Verify the binding signatures with the given primary key.
    pub fn verify(&self, key: &impl PublicKeyTrait) -> Result<()> {
        ensure!(!self.signatures.is_empty(), "missing subkey bindings");

        for sig in &self.signatures {
            sig.verify_key_binding(key, &self.key)?;
        }

        Ok(())
    }

    /// Whether a verifying revocation exists that is not superseded by a
    /// newer binding.
    pub fn is_revoked(&self, primary: &impl PublicKeyTrait) -> bool {
        let latest_binding = self
            .signatures
            .iter()
            .filter(|sig| {
                sig.typ() == SignatureType::SubkeyBinding
                    && sig.verify_key_binding(primary, &self.key).is_ok()
            })
            .filter_map(|sig| sig.created())
            .max();

        self.signatures
            .iter()
            .filter(|sig| {
                sig.typ() == SignatureType::SubkeyRevocation
                    && sig.verify_key_binding(primary, &self.key).is_ok()
            })
            .filter_map(|sig| sig.created())
            .any(|revoked_at| match latest_binding {
                Some(bound_at) => revoked_at >= bound_at,
                None => true,
            })
    }
}

impl KeyTrait for SignedPublicSubKey {
    fn fingerprint(&self) -> Vec<u8> {
        self.key.fingerprint()
    }

    fn key_id(&self) -> KeyId {
        self.key.key_id()
    }

    fn algorithm(&self) -> PublicKeyAlgorithm {
        self.key.algorithm()
    }
}

impl PublicKeyTrait for SignedPublicSubKey {
    fn verify_signature(&self, hash: HashAlgorithm, data: &[u8], sig: &[Mpi]) -> Result<()> {
        self.key.verify_signature(hash, data, sig)
    }

    fn encrypt<R: CryptoRng + Rng>(&self, rng: &mut R, plain: &[u8]) -> Result<Vec<Mpi>> {
        self.key.encrypt(rng, plain)
    }

    fn serialize_for_hashing(&self) -> Result<Vec<u8>> {
        self.key.serialize_for_hashing()
    }
}

impl Serialize for SignedPublicSubKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_packet(writer, &self.key)?;
        for sig in &self.signatures {
            write_packet(writer, sig)?;
        }

        Ok(())
    }
}
