use std::fmt;
use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use nom::bytes::streaming::take;
use nom::number::streaming::{be_u32, be_u8};
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};

/// Literal Data Packet
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.9>
#[derive(Clone, PartialEq, Eq)]
pub struct LiteralData {
    packet_version: Version,
    mode: DataMode,
    created: DateTime<Utc>,
    /// The filename, may contain non utf-8 bytes
    file_name: Vec<u8>,
    data: Vec<u8>,
    partial: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DataMode {
    Binary = b'b',
    Text = b't',
    Utf8 = b'u',

    #[num_enum(catch_all)]
    Other(u8),
}

impl LiteralData {
    /// Creates a literal data packet from the given string.
    pub fn from_str(file_name: &str, raw_data: &str) -> Self {
        LiteralData {
            packet_version: Default::default(),
            mode: DataMode::Utf8,
            created: Utc::now().trunc_subsecs(0),
            file_name: file_name.as_bytes().to_vec(),
            data: raw_data.as_bytes().to_vec(),
            partial: false,
        }
    }

    /// Creates a literal data packet from the given bytes.
    pub fn from_bytes(file_name: &str, data: Vec<u8>) -> Self {
        LiteralData {
            packet_version: Default::default(),
            mode: DataMode::Binary,
            created: Utc::now().trunc_subsecs(0),
            file_name: file_name.as_bytes().to_vec(),
            data,
            partial: false,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn file_name(&self) -> &[u8] {
        &self.file_name
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn created(&self) -> &DateTime<Utc> {
        &self.created
    }

    /// Mark this packet for partial length framing when written.
    pub fn set_partial(&mut self, partial: bool) {
        self.partial = partial;
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl Deserialize for LiteralData {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        let (i, mode) = be_u8(input)?;
        let (i, name_len) = be_u8(i)?;
        let (i, name) = take(name_len as usize)(i)?;
        let (i, created) = be_u32(i)?;

        let created = Utc
            .timestamp_opt(i64::from(created), 0)
            .single()
            .ok_or_else(|| format_err!("invalid created field"))?;

        Ok(LiteralData {
            packet_version,
            mode: DataMode::from(mode),
            created,
            file_name: name.to_vec(),
            data: i.to_vec(),
            partial: false,
        })
    }
}

impl Serialize for LiteralData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.mode.into(), self.file_name.len() as u8])?;
        writer.write_all(&self.file_name)?;
        writer.write_u32::<BigEndian>(self.created.timestamp() as u32)?;
        writer.write_all(&self.data)?;

        Ok(())
    }
}

impl PacketTrait for LiteralData {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::LiteralData
    }

    fn is_partial(&self) -> bool {
        self.partial
    }
}

impl fmt::Debug for LiteralData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiteralData")
            .field("mode", &self.mode)
            .field("created", &self.created)
            .field("file_name", &String::from_utf8_lossy(&self.file_name))
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let literal = LiteralData::from_str("hello.txt", "hello world\n");
        let bytes = literal.to_bytes().unwrap();
        let back = LiteralData::from_slice(Version::New, &bytes).unwrap();
        assert_eq!(literal, back);
    }
}
