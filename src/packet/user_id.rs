use std::fmt;
use std::io;

use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};

/// User ID Packet, by convention an RFC 2822 mail name-addr.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.11>
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UserId {
    packet_version: Version,
    id: String,
}

impl UserId {
    pub fn from_str(packet_version: Version, id: impl Into<String>) -> Self {
        UserId {
            packet_version,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Deserialize for UserId {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        Ok(UserId {
            packet_version,
            id: crate::util::read_string(input),
        })
    }
}

impl Serialize for UserId {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.id.as_bytes())?;
        Ok(())
    }
}

impl PacketTrait for UserId {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::UserId
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User ID: \"{}\"", self.id)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({:?})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let id = UserId::from_str(Version::New, "alice <alice@example.com>");
        let bytes = id.to_bytes().unwrap();
        let back = UserId::from_slice(Version::New, &bytes).unwrap();
        assert_eq!(id, back);
    }
}
