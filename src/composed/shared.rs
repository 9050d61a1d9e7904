use std::iter::Peekable;

use crate::armor::{self, BlockType, Headers};
use crate::errors::{Error, Result};
use crate::packet::{Packet, PacketParser};

/// Compositions of packets that can be read from byte or armored input.
pub trait Deserializable: Sized {
    /// Turn a stream of packets into a stream of compositions.
    fn from_packets<'a, I: Iterator<Item = Result<Packet>> + 'a>(
        packets: Peekable<I>,
    ) -> Box<dyn Iterator<Item = Result<Self>> + 'a>;

    /// Check if the given armor block type is valid for this composition.
    fn matches_block_type(typ: BlockType) -> bool;

    /// Parse a single composition from raw bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut el = Self::from_packets(PacketParser::new(bytes).peekable());

        let first = el.next().ok_or(Error::NoMatchingPacket)??;

        if el.next().is_some() {
            return Err(Error::TooManyPackets);
        }

        Ok(first)
    }

    /// Parse all compositions from raw bytes.
    fn from_bytes_many(bytes: &[u8]) -> Result<Vec<Self>> {
        Self::from_packets(PacketParser::new(bytes).peekable()).collect()
    }

    /// Parse a single composition from an armored block.
    fn from_armor_single(input: &[u8]) -> Result<(Self, Headers)> {
        let (typ, headers, decoded) = armor::parse(input)?;

        ensure!(
            Self::matches_block_type(typ),
            "unexpected armor block type {:?}",
            typ
        );

        Ok((Self::from_bytes(&decoded)?, headers))
    }

    /// Parse a single composition from an armored string.
    fn from_string(input: &str) -> Result<(Self, Headers)> {
        Self::from_armor_single(input.as_bytes())
    }

    /// Parse all compositions from an armored block.
    fn from_armor_many(input: &[u8]) -> Result<(Vec<Self>, Headers)> {
        let (typ, headers, decoded) = armor::parse(input)?;

        ensure!(
            Self::matches_block_type(typ),
            "unexpected armor block type {:?}",
            typ
        );

        Ok((Self::from_bytes_many(&decoded)?, headers))
    }
}
