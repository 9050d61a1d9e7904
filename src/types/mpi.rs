use std::fmt;
use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use nom::bytes::streaming::take;
use nom::number::streaming::be_u16;
use num_bigint::BigUint;
use zeroize::Zeroize;

use crate::errors::{Error, IResult, Result};
use crate::ser::Serialize;

/// Number of bits we accept when reading or writing MPIs.
/// The value is the same as gnupgs.
const MAX_EXTERN_MPI_BITS: u32 = 16384;

/// Represents an owned MPI value.
/// The inner value is stored without leading zero octets.
///
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-3.2>
#[derive(Default, Clone, PartialEq, Eq, Zeroize)]
pub struct Mpi(Vec<u8>);

impl Mpi {
    /// Represent the data in `raw` as an Mpi, stripping leading zeros.
    /// Note that `raw` is not expected to be length-prefixed.
    pub fn from_slice(raw: &[u8]) -> Self {
        Mpi(strip_leading_zeros(raw).to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Number of octets the wire form of this MPI occupies.
    pub fn encoded_len(&self) -> usize {
        2 + self.0.len()
    }
}

impl From<BigUint> for Mpi {
    fn from(other: BigUint) -> Self {
        Mpi(other.to_bytes_be())
    }
}

impl From<&BigUint> for Mpi {
    fn from(other: &BigUint) -> Self {
        Mpi(other.to_bytes_be())
    }
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Mpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mpi({})", hex::encode(&self.0))
    }
}

/// Returns the bit length of a given slice, ignoring leading zeros.
#[inline]
pub fn bit_size(val: &[u8]) -> usize {
    if val.is_empty() {
        0
    } else {
        (val.len() * 8) - val[0].leading_zeros() as usize
    }
}

#[inline]
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| b != &0) {
        Some(offset) => &bytes[offset..],
        None => &[],
    }
}

/// Parse a Multi Precision Integer.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-3.2>
pub fn mpi(input: &[u8]) -> IResult<&[u8], Mpi> {
    let (number, len) = be_u16(input)?;

    let bits = u32::from(len);
    if bits > MAX_EXTERN_MPI_BITS {
        return Err(nom::Err::Error(Error::InvalidInput));
    }

    let len_actual = ((bits + 7) >> 3) as usize;
    let (rest, n) = take(len_actual)(number)?;

    Ok((rest, Mpi::from_slice(n)))
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        let size = bit_size(&self.0);
        w.write_u16::<BigEndian>(size as u16)?;
        w.write_all(&self.0)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mpi_parse() {
        // Decode the number `1`.
        assert_eq!(
            mpi(&[0x00, 0x01, 0x01][..]).unwrap(),
            (&b""[..], Mpi::from_slice(&[1][..]))
        );

        // Decode the number `511` (`0x01 0xFF`).
        assert_eq!(
            mpi(&[0x00, 0x09, 0x01, 0xFF][..]).unwrap(),
            (&b""[..], Mpi::from_slice(&[0x01, 0xFF][..]))
        );
    }

    #[test]
    fn test_mpi_roundtrip() {
        let n = Mpi::from_slice(&[0x01, 0xFF]);
        let bytes = n.to_bytes().unwrap();
        assert_eq!(bytes, vec![0x00, 0x09, 0x01, 0xFF]);
        let (rest, back) = mpi(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(back, n);
    }

    #[test]
    fn test_mpi_strips_leading_zeros() {
        assert_eq!(
            Mpi::from_slice(&[0x00, 0x00, 0x01]),
            Mpi::from_slice(&[0x01])
        );
        assert!(Mpi::from_slice(&[0x00, 0x00]).is_empty());
    }

    #[test]
    fn test_bignum_conversion() {
        let n = BigUint::from(65537u32);
        let m: Mpi = (&n).into();
        assert_eq!(m.as_ref(), &[0x01, 0x00, 0x01]);
        assert_eq!(m.to_biguint(), n);
    }
}
