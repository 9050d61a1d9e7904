use std::fmt;

use crate::errors::Result;
use crate::util::clone_into_array;

/// The size in bytes of a key id.
const KEY_ID_LEN: usize = 8;

/// The low 64 bits of a key fingerprint.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-3.3>
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; KEY_ID_LEN]);

impl KeyId {
    pub fn from_slice(input: &[u8]) -> Result<KeyId> {
        ensure_eq!(input.len(), KEY_ID_LEN, "invalid key id length");

        Ok(KeyId(clone_into_array(input)))
    }

    /// A key id of all zeros matches any key ("anonymous recipient").
    /// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.1>
    pub const WILDCARD: KeyId = KeyId([0u8; KEY_ID_LEN]);

    pub fn is_wildcard(&self) -> bool {
        self.0 == [0u8; KEY_ID_LEN]
    }
}

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.0))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let id = KeyId::from_slice(&[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        assert_eq!(id.as_ref(), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(!id.is_wildcard());
        assert!(KeyId::from_slice(&[0; 4]).is_err());
    }

    #[test]
    fn test_wildcard() {
        assert!(KeyId::from_slice(&[0; 8]).unwrap().is_wildcard());
        assert_eq!(KeyId::WILDCARD.to_string(), "0000000000000000");
    }
}
