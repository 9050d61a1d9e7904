use std::fmt;
use std::io;

use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};

/// Symmetrically Encrypted Data Packet, the legacy encrypted container
/// without integrity protection.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.7>
#[derive(Clone, PartialEq, Eq)]
pub struct SymEncryptedData {
    packet_version: Version,
    data: Vec<u8>,
    partial: bool,
}

impl SymEncryptedData {
    pub fn from_raw(data: Vec<u8>) -> Self {
        SymEncryptedData {
            packet_version: Default::default(),
            data,
            partial: false,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_partial(&mut self, partial: bool) {
        self.partial = partial;
    }
}

impl Deserialize for SymEncryptedData {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        Ok(SymEncryptedData {
            packet_version,
            data: input.to_vec(),
            partial: false,
        })
    }
}

impl Serialize for SymEncryptedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }
}

impl PacketTrait for SymEncryptedData {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::SymEncryptedData
    }

    fn is_partial(&self) -> bool {
        self.partial
    }
}

impl fmt::Debug for SymEncryptedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymEncryptedData")
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}
