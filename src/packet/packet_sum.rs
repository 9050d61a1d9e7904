use std::io;

use crate::errors::Error;
use crate::packet::{
    CompressedData, LiteralData, Marker, ModDetectionCode, OnePassSignature, PacketTrait,
    PublicKey, PublicKeyEncryptedSessionKey, PublicSubkey, SecretKey, SecretSubkey, Signature,
    SymEncryptedData, SymEncryptedProtectedData, SymKeyEncryptedSessionKey, Trust, Unknown,
    UserAttribute, UserId,
};
use crate::ser::Serialize;
use crate::types::{Tag, Version};

/// The sum of all packet types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    CompressedData(CompressedData),
    PublicKey(PublicKey),
    PublicSubkey(PublicSubkey),
    SecretKey(SecretKey),
    SecretSubkey(SecretSubkey),
    LiteralData(LiteralData),
    Marker(Marker),
    ModDetectionCode(ModDetectionCode),
    OnePassSignature(OnePassSignature),
    PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey),
    Signature(Signature),
    SymEncryptedData(SymEncryptedData),
    SymEncryptedProtectedData(SymEncryptedProtectedData),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
    Trust(Trust),
    UserAttribute(UserAttribute),
    UserId(UserId),
    Unknown(Unknown),
}

macro_rules! impl_packet_conversions {
    ($name:ident) => {
        impl From<$name> for Packet {
            fn from(other: $name) -> Packet {
                Packet::$name(other)
            }
        }

        impl TryFrom<Packet> for $name {
            type Error = Error;

            fn try_from(other: Packet) -> Result<$name, Error> {
                match other {
                    Packet::$name(c) => Ok(c),
                    p => Err(format_err!(
                        "invalid packet type: expected {}, got {:?}",
                        stringify!($name),
                        p.tag()
                    )),
                }
            }
        }
    };
}

impl_packet_conversions!(CompressedData);
impl_packet_conversions!(PublicKey);
impl_packet_conversions!(PublicSubkey);
impl_packet_conversions!(SecretKey);
impl_packet_conversions!(SecretSubkey);
impl_packet_conversions!(LiteralData);
impl_packet_conversions!(Marker);
impl_packet_conversions!(ModDetectionCode);
impl_packet_conversions!(OnePassSignature);
impl_packet_conversions!(PublicKeyEncryptedSessionKey);
impl_packet_conversions!(Signature);
impl_packet_conversions!(SymEncryptedData);
impl_packet_conversions!(SymEncryptedProtectedData);
impl_packet_conversions!(SymKeyEncryptedSessionKey);
impl_packet_conversions!(Trust);
impl_packet_conversions!(UserAttribute);
impl_packet_conversions!(UserId);
impl_packet_conversions!(Unknown);

macro_rules! for_each_packet {
    ($self:expr, $p:ident, $body:expr) => {
        match $self {
            Packet::CompressedData($p) => $body,
            Packet::PublicKey($p) => $body,
            Packet::PublicSubkey($p) => $body,
            Packet::SecretKey($p) => $body,
            Packet::SecretSubkey($p) => $body,
            Packet::LiteralData($p) => $body,
            Packet::Marker($p) => $body,
            Packet::ModDetectionCode($p) => $body,
            Packet::OnePassSignature($p) => $body,
            Packet::PublicKeyEncryptedSessionKey($p) => $body,
            Packet::Signature($p) => $body,
            Packet::SymEncryptedData($p) => $body,
            Packet::SymEncryptedProtectedData($p) => $body,
            Packet::SymKeyEncryptedSessionKey($p) => $body,
            Packet::Trust($p) => $body,
            Packet::UserAttribute($p) => $body,
            Packet::UserId($p) => $body,
            Packet::Unknown($p) => $body,
        }
    };
}

impl Serialize for Packet {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> crate::errors::Result<()> {
        for_each_packet!(self, p, p.to_writer(writer))
    }
}

impl PacketTrait for Packet {
    fn packet_version(&self) -> Version {
        for_each_packet!(self, p, p.packet_version())
    }

    fn tag(&self) -> Tag {
        for_each_packet!(self, p, p.tag())
    }

    fn is_partial(&self) -> bool {
        for_each_packet!(self, p, p.is_partial())
    }
}
