use std::io;
use std::iter::Peekable;

use chrono::{SubsecRound, Utc};
use log::warn;
use rand::{CryptoRng, Rng};

use crate::armor::{self, BlockType, Headers};
use crate::composed::shared::Deserializable;
use crate::composed::signed_key::{
    key_parser, merge_signatures, SignedKeyDetails, SignedPublicKey, SignedPublicSubKey,
};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::{
    self, write_packet, Packet, RevocationCode, Signature, SignatureConfig, SignatureType,
    Subpacket, SubpacketData,
};
use crate::ser::Serialize;
use crate::types::{KeyId, KeyTrait, Mpi, PublicKeyTrait, SecretKeyRepr, SecretKeyTrait, Tag};

/// A signed ("transferable") secret key.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-11.2>
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignedSecretKey {
    pub primary_key: packet::SecretKey,
    pub details: SignedKeyDetails,
    pub public_subkeys: Vec<SignedPublicSubKey>,
    pub secret_subkeys: Vec<SignedSecretSubKey>,
}

/// Parse transferable secret keys from the given packets.
pub struct SignedSecretKeyParser<I: Sized + Iterator<Item = Result<Packet>>> {
    inner: Peekable<I>,
}

impl<I: Sized + Iterator<Item = Result<Packet>>> Iterator for SignedSecretKeyParser<I> {
    type Item = Result<SignedSecretKey>;

    fn next(&mut self) -> Option<Self::Item> {
        match key_parser::next::<I, packet::SecretKey>(&mut self.inner, Tag::SecretKey, true) {
            Some(Err(err)) => Some(Err(err)),
            None => None,
            Some(Ok((primary_key, details, public_subkeys, secret_subkeys))) => Some(Ok(
                SignedSecretKey::new(primary_key, details, public_subkeys, secret_subkeys),
            )),
        }
    }
}

impl Deserializable for SignedSecretKey {
    fn from_packets<'a, I: Iterator<Item = Result<Packet>> + 'a>(
        packets: Peekable<I>,
    ) -> Box<dyn Iterator<Item = Result<Self>> + 'a> {
        Box::new(SignedSecretKeyParser { inner: packets })
    }

    fn matches_block_type(typ: BlockType) -> bool {
        matches!(typ, BlockType::PrivateKey)
    }
}

impl SignedSecretKey {
    pub fn new(
        primary_key: packet::SecretKey,
        details: SignedKeyDetails,
        mut public_subkeys: Vec<SignedPublicSubKey>,
        mut secret_subkeys: Vec<SignedSecretSubKey>,
    ) -> Self {
        public_subkeys.retain(|key| {
            if key.signatures.is_empty() {
                warn!("ignoring unsigned subkey {:?}", key.key.key_id());
                false
            } else {
                true
            }
        });

        secret_subkeys.retain(|key| {
            if key.signatures.is_empty() {
                warn!("ignoring unsigned subkey {:?}", key.key.key_id());
                false
            } else {
                true
            }
        });

        SignedSecretKey {
            primary_key,
            details,
            public_subkeys,
            secret_subkeys,
        }
    }

    /// Verify all signatures of this key against itself.
    pub fn verify(&self) -> Result<()> {
        let public = self.primary_key.public_key();

        self.details.verify(public)?;

        for subkey in &self.public_subkeys {
            subkey.verify(public)?;
        }

        for subkey in &self.secret_subkeys {
            subkey.verify(public)?;
        }

        Ok(())
    }

    /// Strip the secret material, keeping the signed public parts.
    pub fn public_key(&self) -> SignedPublicKey {
        let mut public_subkeys = self.public_subkeys.clone();
        public_subkeys.extend(self.secret_subkeys.iter().map(|k| SignedPublicSubKey {
            key: k.key.public_key().clone(),
            signatures: k.signatures.clone(),
        }));

        SignedPublicKey {
            primary_key: self.primary_key.public_key().clone(),
            details: self.details.clone(),
            public_subkeys,
        }
    }

    /// Merge another view of the same key into this one.
    pub fn merge(mut self, other: SignedSecretKey) -> Result<SignedSecretKey> {
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

        for subkey in other.secret_subkeys {
            match self
                .secret_subkeys
                .iter_mut()
                .find(|k| k.key.fingerprint() == subkey.key.fingerprint())
            {
                Some(existing) => {
                    merge_signatures(&mut existing.signatures, subkey.signatures)?;
                }
                None => self.secret_subkeys.push(subkey),
            }
        }

        Ok(self)
    }

    fn revocation_config(
        &self,
        typ: SignatureType,
        code: RevocationCode,
        reason: &str,
    ) -> SignatureConfig {
        let mut config = SignatureConfig::v4(
            typ,
            self.primary_key.algorithm(),
            HashAlgorithm::default(),
        );
        config.hashed_subpackets = vec![
            Subpacket::regular(SubpacketData::SignatureCreationTime(
                Utc::now().trunc_subsecs(0),
            )),
            Subpacket::regular(SubpacketData::RevocationReason(code, reason.to_string())),
        ];
        config.unhashed_subpackets = vec![Subpacket::regular(SubpacketData::Issuer(
            self.primary_key.key_id(),
        ))];

        config
    }

    /// Issue a revocation certificate (type 0x20) for the primary key.
    pub fn revoke_primary(
        &self,
        key_pw: &str,
        code: RevocationCode,
        reason: &str,
    ) -> Result<Signature> {
        self.revocation_config(SignatureType::KeyRevocation, code, reason)
            .sign_key(&self.primary_key, key_pw, self.primary_key.public_key())
    }

    /// Issue a revocation certificate (type 0x28) for the subkey with the
    /// given fingerprint.
    pub fn revoke_subkey(
        &self,
        key_pw: &str,
        fingerprint: &[u8],
        code: RevocationCode,
        reason: &str,
    ) -> Result<Signature> {
        let config = self.revocation_config(SignatureType::SubkeyRevocation, code, reason);

        if let Some(subkey) = self
            .secret_subkeys
            .iter()
            .find(|k| k.key.fingerprint() == fingerprint)
        {
            return config.sign_key_binding(&self.primary_key, key_pw, subkey.key.public_key());
        }

        if let Some(subkey) = self
            .public_subkeys
            .iter()
            .find(|k| k.key.fingerprint() == fingerprint)
        {
            return config.sign_key_binding(&self.primary_key, key_pw, &subkey.key);
        }

        bail!("no subkey with the given fingerprint");
    }

    /// Issue a revocation certificate (type 0x30) for the given user id.
    pub fn revoke_user(
        &self,
        key_pw: &str,
        id: &packet::UserId,
        code: RevocationCode,
        reason: &str,
    ) -> Result<Signature> {
        ensure!(
            self.details.users.iter().any(|u| &u.id == id),
            "no matching user id"
        );

        self.revocation_config(SignatureType::CertRevocation, code, reason)
            .sign_certification(&self.primary_key, key_pw, Tag::UserId, id)
    }

    /// Attach a revocation certificate to the part of the key it revokes.
    pub fn apply_revocation(mut self, sig: Signature) -> Result<SignedSecretKey> {
        let public = self.primary_key.public_key().clone();

        match sig.typ() {
            SignatureType::KeyRevocation => {
                sig.verify_key(&public)?;
                self.details.revocation_signatures.push(sig);
            }
            SignatureType::SubkeyRevocation => {
                if let Some(subkey) = self
                    .secret_subkeys
                    .iter_mut()
                    .find(|k| sig.verify_key_binding(&public, k.key.public_key()).is_ok())
                {
                    subkey.signatures.push(sig);
                } else if let Some(subkey) = self
                    .public_subkeys
                    .iter_mut()
                    .find(|k| sig.verify_key_binding(&public, &k.key).is_ok())
                {
                    subkey.signatures.push(sig);
                } else {
                    bail!("revocation does not match any subkey");
                }
            }
            SignatureType::CertRevocation => {
                if let Some(user) = self
                    .details
                    .users
                    .iter_mut()
                    .find(|u| sig.verify_certification(&public, Tag::UserId, &u.id).is_ok())
                {
                    user.signatures.push(sig);
                } else {
                    bail!("revocation does not match any user");
                }
            }
            typ => bail!("not a revocation signature: {:?}", typ),
        }

        Ok(self)
    }

    /// Is the primary key revoked?
    pub fn is_revoked(&self) -> bool {
        let public = self.primary_key.public_key();
        self.details
            .revocation_signatures
            .iter()
            .any(|sig| sig.verify_key(public).is_ok())
    }

    /// Is the subkey with the given fingerprint revoked?
    pub fn is_subkey_revoked(&self, fingerprint: &[u8]) -> Result<bool> {
        let public = self.primary_key.public_key();

        if let Some(subkey) = self
            .secret_subkeys
            .iter()
            .find(|k| k.key.fingerprint() == fingerprint)
        {
            return Ok(subkey.is_revoked(public));
        }

        if let Some(subkey) = self
            .public_subkeys
            .iter()
            .find(|k| k.key.fingerprint() == fingerprint)
        {
            return Ok(subkey.is_revoked(public));
        }

        bail!("no subkey with the given fingerprint");
    }

    pub fn to_armored_writer(
        &self,
        writer: &mut impl io::Write,
        headers: Option<&Headers>,
    ) -> Result<()> {
        armor::write(self, BlockType::PrivateKey, writer, headers)
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

impl KeyTrait for SignedSecretKey {
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

impl PublicKeyTrait for SignedSecretKey {
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

impl SecretKeyTrait for SignedSecretKey {
    fn unlock<F, G, T>(&self, pw: F, work: G) -> Result<T>
    where
        F: FnOnce() -> String,
        G: FnOnce(&SecretKeyRepr) -> Result<T>,
    {
        self.primary_key.unlock(pw, work)
    }

    fn create_signature(&self, key_pw: &str, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<Mpi>> {
        self.primary_key.create_signature(key_pw, hash, data)
    }
}

impl Serialize for SignedSecretKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_packet(writer, &self.primary_key)?;
        self.details.to_writer(writer)?;
        for subkey in &self.public_subkeys {
            subkey.to_writer(writer)?;
        }
        for subkey in &self.secret_subkeys {
            subkey.to_writer(writer)?;
        }

        Ok(())
    }
}

/// A secret subkey with its binding signatures.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignedSecretSubKey {
    pub key: packet::SecretSubkey,
    pub signatures: Vec<Signature>,
}

impl SignedSecretSubKey {
    pub fn new(key: packet::SecretSubkey, signatures: Vec<Signature>) -> Self {
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

        SignedSecretSubKey { key, signatures }
    }

    /// Verify the binding signatures with the given primary key.
    pub fn verify(&self, key: &impl PublicKeyTrait) -> Result<()> {
        ensure!(!self.signatures.is_empty(), "missing subkey bindings");

        for sig in &self.signatures {
            sig.verify_key_binding(key, self.key.public_key())?;
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
                    && sig.verify_key_binding(primary, self.key.public_key()).is_ok()
            })
            .filter_map(|sig| sig.created())
            .max();

        self.signatures
            .iter()
            .filter(|sig| {
                sig.typ() == SignatureType::SubkeyRevocation
                    && sig.verify_key_binding(primary, self.key.public_key()).is_ok()
            })
            .filter_map(|sig| sig.created())
            .any(|revoked_at| match latest_binding {
                Some(bound_at) => revoked_at >= bound_at,
                None => true,
            })
    }
}

impl KeyTrait for SignedSecretSubKey {
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

impl SecretKeyTrait for SignedSecretSubKey {
    fn unlock<F, G, T>(&self, pw: F, work: G) -> Result<T>
    where
        F: FnOnce() -> String,
        G: FnOnce(&SecretKeyRepr) -> Result<T>,
    {
        self.key.unlock(pw, work)
    }

    fn create_signature(&self, key_pw: &str, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<Mpi>> {
        self.key.create_signature(key_pw, hash, data)
    }
}

impl PublicKeyTrait for SignedSecretSubKey {
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

impl Serialize for SignedSecretSubKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_packet(writer, &self.key)?;
        for sig in &self.signatures {
            write_packet(writer, sig)?;
        }

        Ok(())
    }
}
