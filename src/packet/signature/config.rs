use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Utc};
use log::debug;

use crate::crypto::hash::{HashAlgorithm, Hasher};
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::normalize_lines::normalize_lines;
use crate::packet::signature::types::{
    Signature, SignatureType, SignatureVersion, Subpacket, SubpacketData, SubpacketType,
};
use crate::ser::Serialize;
use crate::types::{KeyId, PublicKeyTrait, SecretKeyTrait, Tag};

/// The data of a signature packet without the actual crypto output, used
/// both for parsed signatures and as the starting point for creating one.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignatureConfig {
    pub typ: SignatureType,
    pub pub_alg: PublicKeyAlgorithm,
    pub hash_alg: HashAlgorithm,

    pub hashed_subpackets: Vec<Subpacket>,
    pub unhashed_subpackets: Vec<Subpacket>,

    pub version_specific: SignatureVersionSpecific,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SignatureVersionSpecific {
    V3 {
        created: DateTime<Utc>,
        issuer: KeyId,
    },
    V4,
}

impl From<&SignatureVersionSpecific> for SignatureVersion {
    fn from(value: &SignatureVersionSpecific) -> Self {
        match value {
            SignatureVersionSpecific::V3 { .. } => SignatureVersion::V3,
            SignatureVersionSpecific::V4 => SignatureVersion::V4,
        }
    }
}

impl SignatureConfig {
    /// Constructor for a v3 signature config.
    ///
    /// OpenPGP v3 signatures are historical; they are read and verified but
    /// never generated by this crate.
    pub fn v3(
        typ: SignatureType,
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
        created: DateTime<Utc>,
        issuer: KeyId,
    ) -> Self {
        Self {
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets: Vec::new(),
            unhashed_subpackets: Vec::new(),
            version_specific: SignatureVersionSpecific::V3 { created, issuer },
        }
    }

    /// Constructor for a v4 signature config.
    pub fn v4(typ: SignatureType, pub_alg: PublicKeyAlgorithm, hash_alg: HashAlgorithm) -> Self {
        Self {
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets: Vec::new(),
            unhashed_subpackets: Vec::new(),
            version_specific: SignatureVersionSpecific::V4,
        }
    }

    pub(crate) fn new_v4(
        _version: SignatureVersion,
        typ: SignatureType,
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
        hashed_subpackets: Vec<Subpacket>,
        unhashed_subpackets: Vec<Subpacket>,
    ) -> Self {
        Self {
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets,
            unhashed_subpackets,
            version_specific: SignatureVersionSpecific::V4,
        }
    }

    pub fn version(&self) -> SignatureVersion {
        (&self.version_specific).into()
    }

    /// Returns what kind of signature this is.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Sign the given content (binary or text mode).
    pub fn sign<K>(self, key: &K, key_pw: &str, data: &[u8]) -> Result<Signature>
    where
        K: SecretKeyTrait,
    {
        ensure!(
            matches!(self.typ, SignatureType::Binary | SignatureType::Text),
            "incompatible signature type {:?}",
            self.typ
        );
        debug!("signing content {:?}", self.typ);

        let mut hasher = self.hash_alg.new_hasher()?;

        self.hash_data_to_sign(&mut *hasher, data)?;
        let len = self.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.trailer(len)?);

        let hash = hasher.finish();

        let signed_hash_value = [hash[0], hash[1]];
        let signature = key.create_signature(key_pw, self.hash_alg, &hash)?;

        Ok(Signature::from_config(self, signed_hash_value, signature))
    }

    /// Create a standalone (0x02) or timestamp (0x40) signature, covering
    /// only its own signature data.
    pub fn sign_standalone<K>(self, key: &K, key_pw: &str) -> Result<Signature>
    where
        K: SecretKeyTrait,
    {
        ensure!(
            matches!(
                self.typ,
                SignatureType::Standalone | SignatureType::Timestamp
            ),
            "incompatible signature type {:?}",
            self.typ
        );

        let mut hasher = self.hash_alg.new_hasher()?;

        let len = self.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.trailer(len)?);

        let hash = hasher.finish();

        let signed_hash_value = [hash[0], hash[1]];
        let signature = key.create_signature(key_pw, self.hash_alg, &hash)?;

        Ok(Signature::from_config(self, signed_hash_value, signature))
    }

    /// Create a certification signature (or a certification revocation) over
    /// the given user id or user attribute.
    pub fn sign_certification<K>(
        self,
        key: &K,
        key_pw: &str,
        tag: Tag,
        id: &impl Serialize,
    ) -> Result<Signature>
    where
        K: SecretKeyTrait,
    {
        debug!("signing certification {:?}", self.typ);

        let mut hasher = self.hash_alg.new_hasher()?;

        hasher.update(&key.serialize_for_hashing()?);
        self.hash_certification(&mut *hasher, tag, id)?;

        let len = self.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.trailer(len)?);

        let hash = hasher.finish();

        let signed_hash_value = [hash[0], hash[1]];
        let signature = key.create_signature(key_pw, self.hash_alg, &hash)?;

        Ok(Signature::from_config(self, signed_hash_value, signature))
    }

    /// Create a subkey binding (0x18) or subkey revocation (0x28) signature.
    pub fn sign_key_binding<K, P>(self, signing_key: &K, key_pw: &str, key: &P) -> Result<Signature>
    where
        K: SecretKeyTrait,
        P: PublicKeyTrait,
    {
        debug!("signing key binding {:?}", self.typ);

        let mut hasher = self.hash_alg.new_hasher()?;

        // the signing key
        hasher.update(&signing_key.serialize_for_hashing()?);
        // the key being bound
        hasher.update(&key.serialize_for_hashing()?);

        let len = self.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.trailer(len)?);

        let hash = hasher.finish();

        let signed_hash_value = [hash[0], hash[1]];
        let signature = signing_key.create_signature(key_pw, self.hash_alg, &hash)?;

        Ok(Signature::from_config(self, signed_hash_value, signature))
    }

    /// Create a direct key (0x1F) or key revocation (0x20) signature.
    pub fn sign_key<K, P>(self, signing_key: &K, key_pw: &str, key: &P) -> Result<Signature>
    where
        K: SecretKeyTrait,
        P: PublicKeyTrait,
    {
        debug!("signing key {:?}", self.typ);

        let mut hasher = self.hash_alg.new_hasher()?;

        hasher.update(&key.serialize_for_hashing()?);

        let len = self.hash_signature_data(&mut *hasher)?;
        hasher.update(&self.trailer(len)?);

        let hash = hasher.finish();

        let signed_hash_value = [hash[0], hash[1]];
        let signature = signing_key.create_signature(key_pw, self.hash_alg, &hash)?;

        Ok(Signature::from_config(self, signed_hash_value, signature))
    }

    /// Hash the actual content to sign: for binary signatures the raw bytes,
    /// for text signatures with line endings normalized to CR-LF. Standalone
    /// and timestamp signatures hash nothing beyond their own data.
    pub fn hash_data_to_sign(&self, hasher: &mut dyn Hasher, data: &[u8]) -> Result<usize> {
        match self.typ {
            SignatureType::Binary => {
                hasher.update(data);
                Ok(data.len())
            }
            SignatureType::Text => {
                let normalized = normalize_lines(data);
                hasher.update(&normalized);
                Ok(normalized.len())
            }
            SignatureType::Standalone | SignatureType::Timestamp => Ok(0),
            _ => unimplemented_err!("hashing {:?}", self.typ),
        }
    }

    /// Hash the certification target: the user id or user attribute body,
    /// with the v4 type prefix.
    pub fn hash_certification(
        &self,
        hasher: &mut dyn Hasher,
        tag: Tag,
        id: &impl Serialize,
    ) -> Result<()> {
        let packet_buf = id.to_bytes()?;

        match self.version() {
            SignatureVersion::V3 => {
                // no prefixes
            }
            SignatureVersion::V4 => {
                let prefix = match tag {
                    Tag::UserId => 0xB4,
                    Tag::UserAttribute => 0xD1,
                    _ => bail!("invalid tag for certification signature: {:?}", tag),
                };

                let mut prefix_buf = [prefix, 0u8, 0u8, 0u8, 0u8];
                BigEndian::write_u32(&mut prefix_buf[1..], packet_buf.len() as u32);
                hasher.update(&prefix_buf);
            }
        }

        hasher.update(&packet_buf);

        Ok(())
    }

    /// Hash the signature's own data: for v4 the version, type, algorithms
    /// and hashed subpacket area; for v3 the five-octet type and creation
    /// time block. Returns the number of bytes that go into the v4 trailer
    /// length.
    pub fn hash_signature_data(&self, hasher: &mut dyn Hasher) -> Result<usize> {
        match &self.version_specific {
            SignatureVersionSpecific::V3 { created, .. } => {
                let mut buf = [0u8; 5];
                buf[0] = self.typ.into();
                BigEndian::write_u32(&mut buf[1..], created.timestamp() as u32);

                hasher.update(&buf);

                // no trailer
                Ok(0)
            }
            SignatureVersionSpecific::V4 => {
                let mut hashed_subpackets = Vec::new();
                for packet in &self.hashed_subpackets {
                    // A critical subpacket we do not know about makes the
                    // signature invalid.
                    if packet.is_critical && matches!(packet.typ(), SubpacketType::Other(_)) {
                        bail!("unknown critical subpacket {:?}", packet);
                    }

                    packet.to_writer(&mut hashed_subpackets)?;
                }

                let mut res = vec![
                    SignatureVersion::V4 as u8,
                    self.typ.into(),
                    self.pub_alg.into(),
                    self.hash_alg.into(),
                ];
                res.extend((hashed_subpackets.len() as u16).to_be_bytes());
                res.extend(hashed_subpackets);

                hasher.update(&res);

                Ok(res.len())
            }
        }
    }

    /// The final trailer: empty for v3, `0x04 0xFF len` for v4.
    pub fn trailer(&self, len: usize) -> Result<Vec<u8>> {
        match self.version_specific {
            SignatureVersionSpecific::V3 { .. } => Ok(Vec::new()),
            SignatureVersionSpecific::V4 => {
                let mut trailer = vec![0x04, 0xFF, 0, 0, 0, 0];
                BigEndian::write_u32(&mut trailer[2..], len as u32);
                Ok(trailer)
            }
        }
    }

    /// Signature creation time, explicit for v3, from the hashed area for v4.
    pub fn created(&self) -> Option<&DateTime<Utc>> {
        if let SignatureVersionSpecific::V3 { created, .. } = &self.version_specific {
            return Some(created);
        }

        self.hashed_subpackets.iter().find_map(|p| match p.data {
            SubpacketData::SignatureCreationTime(ref d) => Some(d),
            _ => None,
        })
    }

    /// Issuer key id, explicit for v3; for v4 the hashed area is searched
    /// before the unhashed area.
    pub fn issuer(&self) -> Option<&KeyId> {
        if let SignatureVersionSpecific::V3 { issuer, .. } = &self.version_specific {
            return Some(issuer);
        }

        self.hashed_subpackets
            .iter()
            .chain(self.unhashed_subpackets.iter())
            .find_map(|p| match p.data {
                SubpacketData::Issuer(ref id) => Some(id),
                _ => None,
            })
    }
}
