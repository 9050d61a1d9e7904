//! Shared helpers for the wire codecs.

use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use nom::number::streaming::{be_u32, be_u8};

use crate::errors::{IResult, Result};

/// Parses a length prefixed by a single octet, in the "new format" encoding
/// without partial lengths. Used for signature subpackets and user attribute
/// sub-records.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.3.1>
pub fn packet_length(i: &[u8]) -> IResult<&[u8], usize> {
    let (i, olen) = be_u8(i)?;
    match olen {
        // One-Octet Lengths
        0..=191 => Ok((i, olen as usize)),
        // Two-Octet Lengths
        192..=254 => {
            let (i, a) = be_u8(i)?;
            Ok((i, ((olen as usize - 192) << 8) + 192 + a as usize))
        }
        // Five-Octet Lengths
        255 => {
            let (i, len) = be_u32(i)?;
            Ok((i, len as usize))
        }
    }
}

/// Writes the length of a packet or subpacket body in the "new format"
/// encoding, choosing the shortest representation.
pub fn write_packet_length(len: usize, writer: &mut impl io::Write) -> Result<()> {
    if len < 192 {
        writer.write_u8(len as u8)?;
    } else if len < 8384 {
        let n = len - 192;
        writer.write_u8(((n >> 8) + 192) as u8)?;
        writer.write_u8((n & 0xff) as u8)?;
    } else {
        writer.write_u8(255)?;
        writer.write_u32::<BigEndian>(len as u32)?;
    }

    Ok(())
}

/// Number of octets the non-partial length encoding of `len` occupies,
/// header octet excluded.
pub fn packet_length_len(len: usize) -> usize {
    if len < 192 {
        1
    } else if len < 8384 {
        2
    } else {
        5
    }
}

/// Convert a slice into an array.
pub fn clone_into_array<A, T>(slice: &[T]) -> A
where
    A: Default + AsMut<[T]>,
    T: Clone,
{
    let mut a = Default::default();
    <A as AsMut<[T]>>::as_mut(&mut a).clone_from_slice(slice);
    a
}

/// Interpret the given bytes as a lossy utf-8 string.
pub fn read_string(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_length_roundtrip() {
        for len in [0usize, 1, 190, 191, 192, 8382, 8383, 8384, 70_000] {
            let mut buf = Vec::new();
            write_packet_length(len, &mut buf).unwrap();
            assert_eq!(buf.len(), packet_length_len(len));
            let (rest, parsed) = packet_length(&buf).unwrap();
            assert!(rest.is_empty());
            assert_eq!(parsed, len);
        }
    }

    #[test]
    fn test_packet_length_encoding_boundaries() {
        let mut buf = Vec::new();
        write_packet_length(191, &mut buf).unwrap();
        assert_eq!(buf, vec![191]);

        buf.clear();
        write_packet_length(192, &mut buf).unwrap();
        assert_eq!(buf, vec![192, 0]);

        buf.clear();
        write_packet_length(8383, &mut buf).unwrap();
        assert_eq!(buf, vec![223, 255]);

        buf.clear();
        write_packet_length(8384, &mut buf).unwrap();
        assert_eq!(buf, vec![255, 0, 0, 32, 192]);
    }
}
