mod compressed_data;
mod key;
mod literal_data;
mod many;
mod marker;
mod mod_detection_code;
mod one_pass_signature;
mod packet_sum;
mod packet_trait;
mod public_key_encrypted_session_key;
pub mod signature;
mod single;
mod sym_encrypted_data;
mod sym_encrypted_protected_data;
mod sym_key_encrypted_session_key;
mod trust;
mod unknown;
mod user_attribute;
mod user_id;

use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::errors::Result;
use crate::ser::Serialize;
use crate::types::Version;
use crate::util::write_packet_length;

pub use self::compressed_data::CompressedData;
pub use self::key::{PublicKey, PublicSubkey, SecretKey, SecretSubkey};
pub use self::literal_data::{DataMode, LiteralData};
pub use self::many::{parser, PacketParser};
pub use self::marker::Marker;
pub use self::mod_detection_code::ModDetectionCode;
pub use self::one_pass_signature::OnePassSignature;
pub use self::packet_sum::Packet;
pub use self::packet_trait::PacketTrait;
pub use self::public_key_encrypted_session_key::PublicKeyEncryptedSessionKey;
pub use self::signature::{
    KeyFlags, RevocationCode, Signature, SignatureConfig, SignatureType, SignatureVersion,
    SignatureVersionSpecific, Subpacket, SubpacketData, SubpacketType,
};
pub use self::sym_encrypted_data::SymEncryptedData;
pub use self::sym_encrypted_protected_data::SymEncryptedProtectedData;
pub use self::sym_key_encrypted_session_key::SymKeyEncryptedSessionKey;
pub use self::trust::Trust;
pub use self::unknown::Unknown;
pub use self::user_attribute::{UserAttribute, UserAttributeSubpacket};
pub use self::user_id::UserId;

/// Chunk size used when writing partial body lengths; 512 is the smallest
/// legal first chunk.
const PARTIAL_CHUNK_SIZE: usize = 512;

/// Write the packet including its framing header. New style framing uses the
/// shortest length encoding, or partial body chunks when the packet asks for
/// them.
pub fn write_packet(writer: &mut impl io::Write, packet: &impl PacketTrait) -> Result<()> {
    let body = packet.to_bytes()?;
    let tag: u8 = packet.tag().into();
    ensure!(tag != 0 && tag < 64, "invalid packet tag {}", tag);

    match packet.packet_version() {
        Version::Old => {
            ensure!(
                tag < 16,
                "old style packet headers can only carry tags up to 15"
            );

            let len = body.len();
            if len < 256 {
                writer.write_u8(0b1000_0000 | (tag << 2))?;
                writer.write_u8(len as u8)?;
            } else if len < 65536 {
                writer.write_u8(0b1000_0000 | (tag << 2) | 1)?;
                writer.write_u16::<BigEndian>(len as u16)?;
            } else {
                writer.write_u8(0b1000_0000 | (tag << 2) | 2)?;
                writer.write_u32::<BigEndian>(len as u32)?;
            }
            writer.write_all(&body)?;
        }
        Version::New => {
            writer.write_u8(0b1100_0000 | tag)?;

            if packet.is_partial() && body.len() > PARTIAL_CHUNK_SIZE {
                // 512 == 1 << 9
                let mut rest = &body[..];
                while rest.len() > PARTIAL_CHUNK_SIZE {
                    writer.write_u8(224 + 9)?;
                    writer.write_all(&rest[..PARTIAL_CHUNK_SIZE])?;
                    rest = &rest[PARTIAL_CHUNK_SIZE..];
                }

                write_packet_length(rest.len(), writer)?;
                writer.write_all(rest)?;
            } else {
                write_packet_length(body.len(), writer)?;
                writer.write_all(&body)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tag;

    #[test]
    fn test_literal_packet_roundtrip() {
        let literal = LiteralData::from_str("file.txt", "hello world");

        let mut buf = Vec::new();
        write_packet(&mut buf, &literal).unwrap();

        let packets = parser(&buf).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0], Packet::LiteralData(literal));
    }

    #[test]
    fn test_partial_roundtrip_bit_identical() {
        let mut literal = LiteralData::from_bytes("big.bin", vec![0xAB; 5000]);
        literal.set_partial(true);

        let mut buf = Vec::new();
        write_packet(&mut buf, &literal).unwrap();

        // re-parse and re-encode, the bytes must be identical
        let packets = parser(&buf).unwrap();
        assert_eq!(packets.len(), 1);
        match &packets[0] {
            Packet::LiteralData(p) => {
                assert!(p.is_partial());
                assert_eq!(p.data(), literal.data());
            }
            _ => panic!("unexpected packet"),
        }

        let mut buf2 = Vec::new();
        write_packet(&mut buf2, &packets[0]).unwrap();
        assert_eq!(buf, buf2);
    }

    #[test]
    fn test_partial_only_for_data_packets() {
        // a user id packet with a partial length header is a framing error
        let buf = vec![0b1100_0000 | u8::from(Tag::UserId), 224 + 9];
        assert!(parser(&buf).is_err());
    }

    #[test]
    fn test_tag_zero_rejected() {
        // old style header with tag 0
        let buf = vec![0b1000_0000, 0x01, 0xAA];
        assert!(parser(&buf).is_err());

        // new style header with tag 0
        let buf = vec![0b1100_0000, 0x01, 0xAA];
        assert!(parser(&buf).is_err());
    }

    #[test]
    fn test_unknown_tag_preserved() {
        // tag 61 (private/experimental) with a 3 byte body
        let buf = vec![0b1100_0000 | 61, 3, 1, 2, 3];
        let packets = parser(&buf).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].tag(), Tag::Other(61));

        let mut buf2 = Vec::new();
        write_packet(&mut buf2, &packets[0]).unwrap();
        assert_eq!(buf, buf2);
    }

    #[test]
    fn test_old_format_headers() {
        for (len, header) in [
            (200usize, vec![0b1000_0000 | (11 << 2), 200u8]),
            (
                60_000,
                vec![0b1000_0000 | (11 << 2) | 1, 0xEA, 0x60],
            ),
        ] {
            let mut buf = header.clone();
            // mode byte, empty filename, timestamp, data
            let mut body = vec![b'b', 0, 0, 0, 0, 0];
            body.extend(vec![0x42; len - 6]);
            buf.extend_from_slice(&body);

            let packets = parser(&buf).unwrap();
            assert_eq!(packets.len(), 1);
            assert_eq!(packets[0].tag(), Tag::LiteralData);
            assert_eq!(packets[0].packet_version(), Version::Old);
        }
    }

    #[test]
    fn test_truncated_stream() {
        // announces 100 bytes, provides 3
        let buf = vec![0b1100_0000 | 11, 100, 1, 2, 3];
        assert!(parser(&buf).is_err());
    }
}
