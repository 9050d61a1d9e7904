use log::warn;
use nom::bytes::streaming::take;
use nom::combinator::rest;
use nom::number::streaming::{be_u16, be_u32, be_u8};

use crate::de::Deserialize;
use crate::errors::{IResult, Result};
use crate::packet::packet_sum::Packet;
use crate::packet::{
    CompressedData, LiteralData, Marker, ModDetectionCode, OnePassSignature, PublicKey,
    PublicKeyEncryptedSessionKey, PublicSubkey, SecretKey, SecretSubkey, Signature,
    SymEncryptedData, SymEncryptedProtectedData, SymKeyEncryptedSessionKey, Trust, Unknown,
    UserAttribute, UserId,
};
use crate::types::{PacketLength, Tag, Version};

#[derive(Debug)]
pub enum ParseResult<'a> {
    Fixed(&'a [u8]),
    Indeterminate(&'a [u8]),
    Partial(Vec<&'a [u8]>),
}

/// Parses an old format packet header.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-4.2.1>
fn old_packet_header(i: &[u8]) -> IResult<&[u8], (Version, Tag, PacketLength)> {
    let (i, head) = be_u8(i)?;

    let tag = (head & 0b0011_1100) >> 2;
    if tag == 0 {
        return Err(nom::Err::Failure(format_err!(
            "a packet tag must not be 0"
        )));
    }

    let (i, length) = match head & 0b0000_0011 {
        // One-Octet Lengths
        0 => {
            let (i, len) = be_u8(i)?;
            (i, PacketLength::Fixed(len as usize))
        }
        // Two-Octet Lengths
        1 => {
            let (i, len) = be_u16(i)?;
            (i, PacketLength::Fixed(len as usize))
        }
        // Four-Octet Lengths
        2 => {
            let (i, len) = be_u32(i)?;
            (i, PacketLength::Fixed(len as usize))
        }
        3 => (i, PacketLength::Indeterminate),
        _ => unreachable!("old packet length type is only 2 bits"),
    };

    Ok((i, (Version::Old, Tag::from(tag), length)))
}

/// Parses a new format packet length.
fn read_packet_len(i: &[u8]) -> IResult<&[u8], PacketLength> {
    let (i, olen) = be_u8(i)?;
    match olen {
        // One-Octet Lengths
        0..=191 => Ok((i, PacketLength::Fixed(olen as usize))),
        // Two-Octet Lengths
        192..=223 => {
            let (i, a) = be_u8(i)?;
            Ok((
                i,
                PacketLength::Fixed(((olen as usize - 192) << 8) + 192 + a as usize),
            ))
        }
        // Partial Body Lengths
        224..=254 => Ok((i, PacketLength::Partial(1 << (olen as usize & 0x1F)))),
        // Five-Octet Lengths
        255 => {
            let (i, len) = be_u32(i)?;
            Ok((i, PacketLength::Fixed(len as usize)))
        }
    }
}

/// Parses a new format packet header.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-4.2.2>
fn new_packet_header(i: &[u8]) -> IResult<&[u8], (Version, Tag, PacketLength)> {
    let (i, head) = be_u8(i)?;

    let tag = head & 0b0011_1111;
    if tag == 0 {
        return Err(nom::Err::Failure(format_err!(
            "a packet tag must not be 0"
        )));
    }

    let (i, length) = read_packet_len(i)?;

    Ok((i, (Version::New, Tag::from(tag), length)))
}

/// Read the chunks of a partial body length encoded packet. The final chunk
/// uses a regular length header.
fn read_partial_bodies(input: &[u8], len: usize) -> IResult<&[u8], ParseResult<'_>> {
    let (mut rest, first) = take(len)(input)?;
    let mut out = vec![first];

    loop {
        let (i, length) = read_packet_len(rest)?;
        match length {
            PacketLength::Partial(len) => {
                let (i, chunk) = take(len)(i)?;
                out.push(chunk);
                rest = i;
            }
            PacketLength::Fixed(len) => {
                let (i, chunk) = take(len)(i)?;
                out.push(chunk);
                rest = i;
                // this is the last chunk
                break;
            }
            PacketLength::Indeterminate => {
                // this should not happen in a new style packet, but
                // lets handle it gracefully
                let (i, chunk) = rest_parser(i)?;
                out.push(chunk);
                rest = i;
                break;
            }
        }
    }

    Ok((rest, ParseResult::Partial(out)))
}

fn rest_parser(i: &[u8]) -> IResult<&[u8], &[u8]> {
    rest(i)
}

/// Parse a single packet: its framing header and raw (reassembled) body.
pub fn parser(i: &[u8]) -> IResult<&[u8], (Version, Tag, PacketLength, ParseResult<'_>)> {
    if i.is_empty() {
        return Err(nom::Err::Incomplete(nom::Needed::new(1)));
    }

    let (i, (version, tag, length)) = match i[0] & 0b1100_0000 {
        // new starts with 0b11
        0b1100_0000 => new_packet_header(i)?,
        // old starts with 0b10
        0b1000_0000 => old_packet_header(i)?,
        _ => {
            return Err(nom::Err::Failure(format_err!(
                "unknown packet header version 0x{:02x}",
                i[0]
            )))
        }
    };

    let (i, body) = match length {
        PacketLength::Fixed(len) => {
            let (i, body) = take(len)(i)?;
            (i, ParseResult::Fixed(body))
        }
        PacketLength::Indeterminate => {
            let (i, body) = rest(i)?;
            (i, ParseResult::Indeterminate(body))
        }
        PacketLength::Partial(len) => {
            // Partial length chunks are only legal for a few container
            // packet types.
            if !matches!(
                tag,
                Tag::LiteralData
                    | Tag::CompressedData
                    | Tag::SymEncryptedData
                    | Tag::SymEncryptedProtectedData
            ) {
                return Err(nom::Err::Failure(format_err!(
                    "partial body length is not allowed for {:?}",
                    tag
                )));
            }

            read_partial_bodies(i, len)?
        }
    };

    Ok((i, (version, tag, length, body)))
}

/// Parse a packet body into its structured form.
/// Unknown tags and bodies we cannot operate on are preserved opaquely.
pub fn body_parser(version: Version, tag: Tag, body: &[u8], is_partial: bool) -> Result<Packet> {
    let res: Result<Packet> = match tag {
        Tag::PublicKeyEncryptedSessionKey => {
            PublicKeyEncryptedSessionKey::from_slice(version, body).map(Into::into)
        }
        Tag::Signature => Signature::from_slice(version, body).map(Into::into),
        Tag::SymKeyEncryptedSessionKey => {
            SymKeyEncryptedSessionKey::from_slice(version, body).map(Into::into)
        }
        Tag::OnePassSignature => OnePassSignature::from_slice(version, body).map(Into::into),
        Tag::SecretKey => SecretKey::from_slice(version, body).map(Into::into),
        Tag::PublicKey => PublicKey::from_slice(version, body).map(Into::into),
        Tag::SecretSubkey => SecretSubkey::from_slice(version, body).map(Into::into),
        Tag::CompressedData => CompressedData::from_slice(version, body).map(Into::into),
        Tag::SymEncryptedData => SymEncryptedData::from_slice(version, body).map(Into::into),
        Tag::Marker => Marker::from_slice(version, body).map(Into::into),
        Tag::LiteralData => LiteralData::from_slice(version, body).map(Into::into),
        Tag::Trust => Trust::from_slice(version, body).map(Into::into),
        Tag::UserId => UserId::from_slice(version, body).map(Into::into),
        Tag::PublicSubkey => PublicSubkey::from_slice(version, body).map(Into::into),
        Tag::UserAttribute => UserAttribute::from_slice(version, body).map(Into::into),
        Tag::SymEncryptedProtectedData => {
            SymEncryptedProtectedData::from_slice(version, body).map(Into::into)
        }
        Tag::ModDetectionCode => ModDetectionCode::from_slice(version, body).map(Into::into),
        Tag::Other(_) => Ok(Packet::Unknown(Unknown::new(version, tag, body.to_vec()))),
    };

    let mut packet = match res {
        Ok(packet) => packet,
        Err(err) if err.is_unsupported() => {
            warn!("unsupported {:?} body: {:?}", tag, err);
            Packet::Unknown(Unknown::new(version, tag, body.to_vec()))
        }
        Err(err) => return Err(err),
    };

    if is_partial {
        match &mut packet {
            Packet::LiteralData(p) => p.set_partial(true),
            Packet::CompressedData(p) => p.set_partial(true),
            Packet::SymEncryptedData(p) => p.set_partial(true),
            Packet::SymEncryptedProtectedData(p) => p.set_partial(true),
            _ => {}
        }
    }

    Ok(packet)
}
