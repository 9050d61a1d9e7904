//! # Deserialize trait module

use crate::errors::Result;
use crate::types::Version;

/// Parse a packet body, given the framing version recorded in its header.
pub trait Deserialize: Sized {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self>;
}
