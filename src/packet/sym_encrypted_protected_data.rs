use std::fmt;
use std::io;

use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};

/// Symmetrically Encrypted Integrity Protected Data Packet: the encrypted
/// container whose plaintext carries a trailing MDC packet.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.13>
#[derive(Clone, PartialEq, Eq)]
pub struct SymEncryptedProtectedData {
    packet_version: Version,
    version: u8,
    data: Vec<u8>,
    partial: bool,
}

impl SymEncryptedProtectedData {
    pub fn from_raw(data: Vec<u8>) -> Self {
        SymEncryptedProtectedData {
            packet_version: Default::default(),
            version: 1,
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

impl Deserialize for SymEncryptedProtectedData {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        ensure!(!input.is_empty(), "invalid protected data packet");
        ensure_eq!(input[0], 1, "unsupported seipd version");

        Ok(SymEncryptedProtectedData {
            packet_version,
            version: input[0],
            data: input[1..].to_vec(),
            partial: false,
        })
    }
}

impl Serialize for SymEncryptedProtectedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.version])?;
        writer.write_all(&self.data)?;

        Ok(())
    }
}

impl PacketTrait for SymEncryptedProtectedData {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::SymEncryptedProtectedData
    }

    fn is_partial(&self) -> bool {
        self.partial
    }
}

impl fmt::Debug for SymEncryptedProtectedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymEncryptedProtectedData")
            .field("version", &self.version)
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}
