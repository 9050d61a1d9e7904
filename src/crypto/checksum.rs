use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use sha1::{Digest, Sha1};

use crate::errors::Result;

/// Two octet checksum: sum of all octets mod 65536.
#[inline]
pub fn calculate_simple(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |acc, v| acc.wrapping_add(u16::from(*v)))
}

/// Verify the two octet checksum in `actual` against `data`.
#[inline]
pub fn simple(actual: &[u8], data: &[u8]) -> Result<()> {
    let expected = calculate_simple(data);

    ensure_eq!(
        &actual[..2],
        &expected.to_be_bytes()[..],
        "invalid simple checksum"
    );

    Ok(())
}

#[inline]
pub fn simple_to_writer<W: io::Write>(data: &[u8], writer: &mut W) -> Result<()> {
    writer.write_u16::<BigEndian>(calculate_simple(data))?;
    Ok(())
}

/// SHA1 checksum, first 20 octets.
#[inline]
pub fn calculate_sha1<I, T>(data: I) -> [u8; 20]
where
    T: AsRef<[u8]>,
    I: IntoIterator<Item = T>,
{
    let mut digest = Sha1::new();
    for chunk in data {
        digest.update(chunk.as_ref());
    }

    digest.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        assert_eq!(calculate_simple(&[]), 0);
        assert_eq!(calculate_simple(&[1, 2, 3]), 6);
        // wraps mod 65536: 258 * 255 = 65790
        assert_eq!(calculate_simple(&vec![0xff; 258]), 254);
        assert!(simple(&[0, 6], &[1, 2, 3]).is_ok());
        assert!(simple(&[0, 7], &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_simple_writer() {
        let mut buf = Vec::new();
        simple_to_writer(&[1, 2, 3], &mut buf).unwrap();
        assert_eq!(buf, vec![0, 6]);
    }
}
