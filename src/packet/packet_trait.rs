use crate::ser::Serialize;
use crate::types::{Tag, Version};

pub trait PacketTrait: Serialize {
    fn packet_version(&self) -> Version;
    fn tag(&self) -> Tag;

    /// Whether the body should be written with partial length framing.
    /// Only meaningful for literal, compressed and encrypted data packets.
    fn is_partial(&self) -> bool {
        false
    }
}

impl<T: PacketTrait> PacketTrait for &T {
    fn packet_version(&self) -> Version {
        (*self).packet_version()
    }

    fn tag(&self) -> Tag {
        (*self).tag()
    }

    fn is_partial(&self) -> bool {
        (*self).is_partial()
    }
}
