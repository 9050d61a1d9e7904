use std::io;

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};

/// A packet with an unknown tag or an unsupported body; the raw bytes are
/// preserved so the stream round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unknown {
    packet_version: Version,
    tag: Tag,
    body: Vec<u8>,
}

impl Unknown {
    pub fn new(packet_version: Version, tag: Tag, body: Vec<u8>) -> Self {
        Unknown {
            packet_version,
            tag,
            body,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Serialize for Unknown {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.body)?;
        Ok(())
    }
}

impl PacketTrait for Unknown {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        self.tag
    }
}
