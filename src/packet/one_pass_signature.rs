use std::io;

use nom::bytes::streaming::take;
use nom::number::streaming::be_u8;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::signature::SignatureType;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{KeyId, Tag, Version};

/// One-Pass Signature Packet, announces a trailing signature so the content
/// can be processed in a single pass.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.4>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnePassSignature {
    packet_version: Version,
    pub version: u8,
    pub typ: SignatureType,
    pub hash_algorithm: HashAlgorithm,
    pub pub_algorithm: PublicKeyAlgorithm,
    pub key_id: KeyId,
    /// zero if another one pass signature packet follows, nonzero otherwise
    pub last: u8,
}

impl OnePassSignature {
    pub fn new(
        typ: SignatureType,
        hash_algorithm: HashAlgorithm,
        pub_algorithm: PublicKeyAlgorithm,
        key_id: KeyId,
    ) -> Self {
        OnePassSignature {
            packet_version: Default::default(),
            version: 3,
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last: 1,
        }
    }

    pub fn is_nested(&self) -> bool {
        self.last == 0
    }
}

impl Deserialize for OnePassSignature {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        let (i, version) = be_u8(input)?;
        ensure_eq!(version, 3, "invalid one pass signature version");
        let (i, typ) = be_u8(i)?;
        let (i, hash) = be_u8(i)?;
        let (i, pub_alg) = be_u8(i)?;
        let (i, key_id) = take(8usize)(i)?;
        let (_, last) = be_u8(i)?;

        Ok(OnePassSignature {
            packet_version,
            version,
            typ: SignatureType::from(typ),
            hash_algorithm: HashAlgorithm::from(hash),
            pub_algorithm: PublicKeyAlgorithm::from(pub_alg),
            key_id: KeyId::from_slice(key_id)?,
            last,
        })
    }
}

impl Serialize for OnePassSignature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            self.version,
            self.typ.into(),
            self.hash_algorithm.into(),
            self.pub_algorithm.into(),
        ])?;
        writer.write_all(self.key_id.as_ref())?;
        writer.write_all(&[self.last])?;

        Ok(())
    }
}

impl PacketTrait for OnePassSignature {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::OnePassSignature
    }
}
