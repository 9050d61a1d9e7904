use std::fmt;

use chrono::{DateTime, Duration, Utc};
use num_enum::{FromPrimitive, IntoPrimitive};
use smallvec::SmallVec;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::signature::SignatureConfig;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, KeyId, Mpi, PublicKeyTrait, Tag, Version};

/// Signature Packet
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2>
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    packet_version: Version,

    pub config: SignatureConfig,

    pub signed_hash_value: [u8; 2],
    pub signature: Vec<Mpi>,
}

/// Available signature types.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.1>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SignatureType {
    /// Signature of a binary document
    Binary = 0x00,
    /// Signature of a canonical text document
    Text = 0x01,
    /// Standalone signature
    Standalone = 0x02,
    /// Generic certification of a User ID and Public-Key packet
    CertGeneric = 0x10,
    /// Persona certification of a User ID and Public-Key packet
    CertPersona = 0x11,
    /// Casual certification of a User ID and Public-Key packet
    CertCasual = 0x12,
    /// Positive certification of a User ID and Public-Key packet
    CertPositive = 0x13,
    /// Subkey Binding Signature
    SubkeyBinding = 0x18,
    /// Primary Key Binding Signature
    KeyBinding = 0x19,
    /// Signature directly on a key
    Key = 0x1F,
    /// Key revocation signature
    KeyRevocation = 0x20,
    /// Subkey revocation signature
    SubkeyRevocation = 0x28,
    /// Certification revocation signature
    CertRevocation = 0x30,
    /// Timestamp signature
    Timestamp = 0x40,
    /// Third-Party Confirmation signature
    ThirdParty = 0x50,

    #[num_enum(catch_all)]
    Other(u8),
}

impl SignatureType {
    pub fn is_certification(self) -> bool {
        matches!(
            self,
            SignatureType::CertGeneric
                | SignatureType::CertPersona
                | SignatureType::CertCasual
                | SignatureType::CertPositive
        )
    }

    pub fn is_revocation(self) -> bool {
        matches!(
            self,
            SignatureType::KeyRevocation
                | SignatureType::SubkeyRevocation
                | SignatureType::CertRevocation
        )
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum SignatureVersion {
    V3 = 3,
    V4 = 4,
}

/// A signature subpacket with its critical bit.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.3.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpacket {
    pub is_critical: bool,
    pub data: SubpacketData,
}

impl Subpacket {
    pub fn regular(data: SubpacketData) -> Self {
        Subpacket {
            is_critical: false,
            data,
        }
    }

    pub fn critical(data: SubpacketData) -> Self {
        Subpacket {
            is_critical: true,
            data,
        }
    }

    pub fn typ(&self) -> SubpacketType {
        self.data.typ()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SubpacketType {
    SignatureCreationTime = 2,
    SignatureExpirationTime = 3,
    Revocable = 7,
    KeyExpirationTime = 9,
    PreferredSymmetricAlgorithms = 11,
    Issuer = 16,
    PreferredHashAlgorithms = 21,
    PreferredCompressionAlgorithms = 22,
    PrimaryUserId = 25,
    KeyFlags = 27,
    RevocationReason = 29,
    Features = 30,
    EmbeddedSignature = 32,
    IssuerFingerprint = 33,

    #[num_enum(catch_all)]
    Other(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubpacketData {
    /// The time the signature was made.
    SignatureCreationTime(DateTime<Utc>),
    /// The time the signature will expire.
    SignatureExpirationTime(Duration),
    /// The validity period of the key.
    KeyExpirationTime(Duration),
    /// The OpenPGP Key ID of the key issuing the signature.
    Issuer(KeyId),
    /// List of symmetric algorithms that indicate which algorithms the key holder prefers to use.
    PreferredSymmetricAlgorithms(SmallVec<[SymmetricKeyAlgorithm; 8]>),
    /// List of hash algorithms that indicate which algorithms the key holder prefers to use.
    PreferredHashAlgorithms(SmallVec<[HashAlgorithm; 8]>),
    /// List of compression algorithms that indicate which algorithms the key holder prefers to use.
    PreferredCompressionAlgorithms(SmallVec<[CompressionAlgorithm; 8]>),
    Revocable(bool),
    PrimaryUserId(bool),
    KeyFlags(KeyFlags),
    Features(Vec<u8>),
    RevocationReason(RevocationCode, String),
    EmbeddedSignature(Box<Signature>),
    /// The version prefixed fingerprint of the key issuing the signature.
    IssuerFingerprint(Vec<u8>),
    /// Subpacket types we do not interpret; preserved verbatim.
    Other(u8, Vec<u8>),
}

impl SubpacketData {
    pub fn typ(&self) -> SubpacketType {
        match self {
            SubpacketData::SignatureCreationTime(_) => SubpacketType::SignatureCreationTime,
            SubpacketData::SignatureExpirationTime(_) => SubpacketType::SignatureExpirationTime,
            SubpacketData::KeyExpirationTime(_) => SubpacketType::KeyExpirationTime,
            SubpacketData::Issuer(_) => SubpacketType::Issuer,
            SubpacketData::PreferredSymmetricAlgorithms(_) => {
                SubpacketType::PreferredSymmetricAlgorithms
            }
            SubpacketData::PreferredHashAlgorithms(_) => SubpacketType::PreferredHashAlgorithms,
            SubpacketData::PreferredCompressionAlgorithms(_) => {
                SubpacketType::PreferredCompressionAlgorithms
            }
            SubpacketData::Revocable(_) => SubpacketType::Revocable,
            SubpacketData::PrimaryUserId(_) => SubpacketType::PrimaryUserId,
            SubpacketData::KeyFlags(_) => SubpacketType::KeyFlags,
            SubpacketData::Features(_) => SubpacketType::Features,
            SubpacketData::RevocationReason(_, _) => SubpacketType::RevocationReason,
            SubpacketData::EmbeddedSignature(_) => SubpacketType::EmbeddedSignature,
            SubpacketData::IssuerFingerprint(_) => SubpacketType::IssuerFingerprint,
            SubpacketData::Other(typ, _) => SubpacketType::from(*typ),
        }
    }
}

/// Reason for revocation.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.3.23>
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RevocationCode {
    /// No reason specified
    NoReason = 0,
    /// Key is superseded
    KeySuperseded = 1,
    /// Key material has been compromised
    KeyCompromised = 2,
    /// Key is retired and no longer used
    KeyRetired = 3,
    /// User ID information is no longer valid
    CertUserIdInvalid = 32,

    #[num_enum(catch_all)]
    Other(u8),
}

/// Key flags, as a single octet of capabilities.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.3.21>
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyFlags(u8);

impl KeyFlags {
    pub fn certify(&self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn sign(&self) -> bool {
        self.0 & 0x02 != 0
    }

    pub fn encrypt_comms(&self) -> bool {
        self.0 & 0x04 != 0
    }

    pub fn encrypt_storage(&self) -> bool {
        self.0 & 0x08 != 0
    }

    pub fn authentication(&self) -> bool {
        self.0 & 0x20 != 0
    }

    pub fn set_certify(&mut self, val: bool) {
        self.set(0x01, val)
    }

    pub fn set_sign(&mut self, val: bool) {
        self.set(0x02, val)
    }

    pub fn set_encrypt_comms(&mut self, val: bool) {
        self.set(0x04, val)
    }

    pub fn set_encrypt_storage(&mut self, val: bool) {
        self.set(0x08, val)
    }

    pub fn set_authentication(&mut self, val: bool) {
        self.set(0x20, val)
    }

    fn set(&mut self, mask: u8, val: bool) {
        if val {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

impl From<u8> for KeyFlags {
    fn from(v: u8) -> Self {
        KeyFlags(v)
    }
}

impl From<KeyFlags> for u8 {
    fn from(flags: KeyFlags) -> Self {
        flags.0
    }
}

impl Signature {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        packet_version: Version,
        version: SignatureVersion,
        typ: SignatureType,
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
        signed_hash_value: [u8; 2],
        signature: Vec<Mpi>,
        hashed_subpackets: Vec<Subpacket>,
        unhashed_subpackets: Vec<Subpacket>,
    ) -> Self {
        Signature {
            packet_version,
            config: SignatureConfig::new_v4(
                version,
                typ,
                pub_alg,
                hash_alg,
                hashed_subpackets,
                unhashed_subpackets,
            ),
            signed_hash_value,
            signature,
        }
    }

    pub fn from_config(
        config: SignatureConfig,
        signed_hash_value: [u8; 2],
        signature: Vec<Mpi>,
    ) -> Self {
        Signature {
            packet_version: Default::default(),
            config,
            signed_hash_value,
            signature,
        }
    }

    /// Returns what kind of signature this is.
    pub fn typ(&self) -> SignatureType {
        self.config.typ
    }

    pub(crate) fn set_packet_version(&mut self, packet_version: Version) {
        self.packet_version = packet_version;
    }

    /// Verify this signature over the content of a binary or text document.
    pub fn verify(&self, key: &impl PublicKeyTrait, data: &[u8]) -> Result<()> {
        ensure!(
            matches!(self.typ(), SignatureType::Binary | SignatureType::Text),
            "invalid signature type for content verification: {:?}",
            self.typ()
        );

        let mut hasher = self.config.hash_alg.new_hasher()?;
        self.config.hash_data_to_sign(&mut *hasher, data)?;
        let len = self.config.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.config.trailer(len)?);

        self.verify_hash(key, &hasher.finish())
    }

    /// Verify a standalone (0x02) or timestamp (0x40) signature; only the own
    /// signature data is hashed.
    pub fn verify_standalone(&self, key: &impl PublicKeyTrait) -> Result<()> {
        let mut hasher = self.config.hash_alg.new_hasher()?;
        let len = self.config.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.config.trailer(len)?);

        self.verify_hash(key, &hasher.finish())
    }

    /// Verifies a certification signature over the given user id or user
    /// attribute, issued by `key`.
    pub fn verify_certification(
        &self,
        key: &impl PublicKeyTrait,
        tag: Tag,
        id: &impl Serialize,
    ) -> Result<()> {
        let mut hasher = self.config.hash_alg.new_hasher()?;

        hasher.update(&key.serialize_for_hashing()?);
        self.config.hash_certification(&mut *hasher, tag, id)?;

        let len = self.config.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.config.trailer(len)?);

        self.verify_hash(key, &hasher.finish())
    }

    /// Verifies a subkey binding (0x18) or subkey revocation (0x28)
    /// signature.
    pub fn verify_key_binding(
        &self,
        signing_key: &impl PublicKeyTrait,
        key: &impl PublicKeyTrait,
    ) -> Result<()> {
        let mut hasher = self.config.hash_alg.new_hasher()?;

        hasher.update(&signing_key.serialize_for_hashing()?);
        hasher.update(&key.serialize_for_hashing()?);

        let len = self.config.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.config.trailer(len)?);

        self.verify_hash(signing_key, &hasher.finish())
    }

    /// Verifies a direct key (0x1F) or key revocation (0x20) signature over
    /// the primary key itself.
    pub fn verify_key(&self, key: &impl PublicKeyTrait) -> Result<()> {
        let mut hasher = self.config.hash_alg.new_hasher()?;

        hasher.update(&key.serialize_for_hashing()?);

        let len = self.config.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.config.trailer(len)?);

        self.verify_hash(key, &hasher.finish())
    }

    fn verify_hash(&self, key: &impl PublicKeyTrait, hash: &[u8]) -> Result<()> {
        // the left most two bytes are stored as a quick check
        ensure_eq!(
            &self.signed_hash_value[..],
            &hash[..2],
            "invalid signed hash value"
        );

        key.verify_signature(self.config.hash_alg, hash, &self.signature)
    }

    /// Returns an iterator over all subpackets, hashed first.
    pub fn subpackets(&self) -> impl Iterator<Item = &Subpacket> {
        self.config
            .hashed_subpackets
            .iter()
            .chain(self.config.unhashed_subpackets.iter())
    }

    /// The time the signature was made, from the explicit v3 field or the
    /// hashed subpacket area.
    pub fn created(&self) -> Option<&DateTime<Utc>> {
        self.config.created()
    }

    /// The issuer of this signature. v3 signatures carry it explicitly, v4
    /// signatures are searched hashed area first.
    /// The id is only a hint; verification uses the purported issuer's
    /// actual key material.
    pub fn issuer(&self) -> Option<&KeyId> {
        self.config.issuer()
    }

    /// The issuer fingerprint, with its leading key version octet.
    pub fn issuer_fingerprint(&self) -> Option<&[u8]> {
        self.subpackets().find_map(|p| match &p.data {
            SubpacketData::IssuerFingerprint(fp) => Some(&fp[..]),
            _ => None,
        })
    }

    pub fn key_flags(&self) -> KeyFlags {
        self.config
            .hashed_subpackets
            .iter()
            .find_map(|p| match &p.data {
                SubpacketData::KeyFlags(flags) => Some(*flags),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn preferred_symmetric_algs(&self) -> &[SymmetricKeyAlgorithm] {
        self.config
            .hashed_subpackets
            .iter()
            .find_map(|p| match &p.data {
                SubpacketData::PreferredSymmetricAlgorithms(algs) => Some(&algs[..]),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn preferred_hash_algs(&self) -> &[HashAlgorithm] {
        self.config
            .hashed_subpackets
            .iter()
            .find_map(|p| match &p.data {
                SubpacketData::PreferredHashAlgorithms(algs) => Some(&algs[..]),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn preferred_compression_algs(&self) -> &[CompressionAlgorithm] {
        self.config
            .hashed_subpackets
            .iter()
            .find_map(|p| match &p.data {
                SubpacketData::PreferredCompressionAlgorithms(algs) => Some(&algs[..]),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn is_primary_user_id(&self) -> bool {
        self.config
            .hashed_subpackets
            .iter()
            .find_map(|p| match &p.data {
                SubpacketData::PrimaryUserId(primary) => Some(*primary),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn key_expiration_time(&self) -> Option<&Duration> {
        self.config
            .hashed_subpackets
            .iter()
            .find_map(|p| match &p.data {
                SubpacketData::KeyExpirationTime(d) => Some(d),
                _ => None,
            })
    }

    pub fn revocation_reason(&self) -> Option<(RevocationCode, &str)> {
        self.subpackets().find_map(|p| match &p.data {
            SubpacketData::RevocationReason(code, reason) => Some((*code, reason.as_str())),
            _ => None,
        })
    }
}

impl PacketTrait for Signature {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::Signature
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("config", &self.config)
            .field("signed_hash_value", &hex::encode(self.signed_hash_value))
            .field("signature", &self.signature)
            .finish()
    }
}
