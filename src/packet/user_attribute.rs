use std::fmt;
use std::io;

use nom::bytes::streaming::take;
use nom::combinator::complete;
use nom::multi::many1;
use nom::number::streaming::be_u8;

use crate::de::Deserialize;
use crate::errors::{IResult, Result};
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{Tag, Version};
use crate::util::{packet_length, write_packet_length};

/// User Attribute Packet, a collection of typed sub-records.
/// Only the image sub-record (type 1) is specified; everything else is
/// preserved verbatim.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.12>
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UserAttribute {
    packet_version: Version,
    subpackets: Vec<UserAttributeSubpacket>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum UserAttributeSubpacket {
    /// An image, stored with its raw 16 octet image header.
    /// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.12.1>
    Image { header: Vec<u8>, data: Vec<u8> },
    Unknown { typ: u8, data: Vec<u8> },
}

impl UserAttribute {
    pub fn subpackets(&self) -> &[UserAttributeSubpacket] {
        &self.subpackets
    }

    /// Returns the first image, if any.
    pub fn image(&self) -> Option<&[u8]> {
        self.subpackets.iter().find_map(|sub| match sub {
            UserAttributeSubpacket::Image { data, .. } => Some(&data[..]),
            _ => None,
        })
    }
}

fn subpacket(i: &[u8]) -> IResult<&[u8], UserAttributeSubpacket> {
    let (i, len) = packet_length(i)?;
    if len < 1 {
        return Err(nom::Err::Error(crate::errors::Error::InvalidInput));
    }
    let (i, typ) = be_u8(i)?;
    let (i, body) = take(len - 1)(i)?;

    match typ {
        1 => {
            // 16 octet image header, the rest is the image itself
            if body.len() < 16 {
                return Err(nom::Err::Error(crate::errors::Error::InvalidInput));
            }
            let (header, data) = body.split_at(16);
            Ok((
                i,
                UserAttributeSubpacket::Image {
                    header: header.to_vec(),
                    data: data.to_vec(),
                },
            ))
        }
        _ => Ok((
            i,
            UserAttributeSubpacket::Unknown {
                typ,
                data: body.to_vec(),
            },
        )),
    }
}

impl Deserialize for UserAttribute {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        let (rest, subpackets) = many1(complete(subpacket))(input)?;
        ensure!(rest.is_empty(), "trailing bytes in user attribute");

        Ok(UserAttribute {
            packet_version,
            subpackets,
        })
    }
}

impl Serialize for UserAttribute {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for sub in &self.subpackets {
            match sub {
                UserAttributeSubpacket::Image { header, data } => {
                    write_packet_length(1 + header.len() + data.len(), writer)?;
                    writer.write_all(&[1u8])?;
                    writer.write_all(header)?;
                    writer.write_all(data)?;
                }
                UserAttributeSubpacket::Unknown { typ, data } => {
                    write_packet_length(1 + data.len(), writer)?;
                    writer.write_all(&[*typ])?;
                    writer.write_all(data)?;
                }
            }
        }

        Ok(())
    }
}

impl PacketTrait for UserAttribute {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::UserAttribute
    }
}

impl fmt::Display for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User Attribute: ")?;
        for sub in &self.subpackets {
            match sub {
                UserAttributeSubpacket::Image { data, .. } => {
                    write!(f, "[image, {} bytes]", data.len())?
                }
                UserAttributeSubpacket::Unknown { typ, data } => {
                    write!(f, "[unknown type {}, {} bytes]", typ, data.len())?
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAttribute({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_roundtrip() {
        // 16 byte v1 jpeg header as emitted by gnupg
        let mut header = vec![0x10, 0x00, 0x01, 0x01];
        header.extend_from_slice(&[0u8; 12]);

        let attr = UserAttribute {
            packet_version: Version::New,
            subpackets: vec![UserAttributeSubpacket::Image {
                header,
                data: vec![0xff, 0xd8, 0xff, 0xe0],
            }],
        };

        let bytes = attr.to_bytes().unwrap();
        let back = UserAttribute::from_slice(Version::New, &bytes).unwrap();
        assert_eq!(attr, back);
        assert_eq!(back.image().unwrap(), &[0xff, 0xd8, 0xff, 0xe0]);
    }
}
