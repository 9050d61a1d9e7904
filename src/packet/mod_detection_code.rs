use std::fmt;
use std::io;

use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};
use crate::util::clone_into_array;

/// Modification Detection Code Packet: the SHA-1 over the plaintext prefix.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.14>
#[derive(Clone, PartialEq, Eq)]
pub struct ModDetectionCode {
    packet_version: Version,
    /// 20 octet SHA1 hash
    hash: [u8; 20],
}

impl ModDetectionCode {
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
}

impl Deserialize for ModDetectionCode {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        ensure_eq!(input.len(), 20, "invalid mdc length");

        Ok(ModDetectionCode {
            packet_version,
            hash: clone_into_array(input),
        })
    }
}

impl Serialize for ModDetectionCode {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.hash)?;
        Ok(())
    }
}

impl PacketTrait for ModDetectionCode {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::ModDetectionCode
    }
}

impl fmt::Debug for ModDetectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModDetectionCode")
            .field("hash", &hex::encode(self.hash))
            .finish()
    }
}
