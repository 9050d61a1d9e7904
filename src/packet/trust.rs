use std::io;

use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};

/// Trust Packet, only found in keyrings and not specified further.
/// The raw bytes are preserved.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.10>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trust {
    packet_version: Version,
    value: Vec<u8>,
}

impl Deserialize for Trust {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        Ok(Trust {
            packet_version,
            value: input.to_vec(),
        })
    }
}

impl Serialize for Trust {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.value)?;
        Ok(())
    }
}

impl PacketTrait for Trust {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::Trust
    }
}
