use std::fmt;
use std::io;

use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};

/// Marker Packet, must be ignored (and is) when received.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.8>
#[derive(Clone, PartialEq, Eq)]
pub struct Marker {
    packet_version: Version,
}

impl Deserialize for Marker {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        ensure_eq!(input, &b"PGP"[..], "invalid marker");

        Ok(Marker { packet_version })
    }
}

impl Serialize for Marker {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(b"PGP")?;
        Ok(())
    }
}

impl PacketTrait for Marker {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::Marker
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marker")
            .field("packet_version", &self.packet_version)
            .finish()
    }
}
