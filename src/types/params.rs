use std::fmt;
use std::io;

use nom::combinator::rest;
use num_bigint::BigUint;
use zeroize::Zeroize;

use crate::crypto::checksum;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{IResult, Result};
use crate::ser::Serialize;
use crate::types::{mpi, Mpi, StringToKey};

/// The public parameters of a key, specific to its algorithm.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.5.2>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicParams {
    RSA {
        n: Mpi,
        e: Mpi,
    },
    DSA {
        p: Mpi,
        q: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Elgamal {
        p: Mpi,
        g: Mpi,
        y: Mpi,
    },
    /// Algorithms we do not operate on; the raw parameter bytes are preserved
    /// so the packet round-trips.
    Unknown {
        data: Vec<u8>,
    },
}

/// Parse the public parameters for the given algorithm.
pub fn parse_public_params(
    alg: PublicKeyAlgorithm,
) -> impl Fn(&[u8]) -> IResult<&[u8], PublicParams> {
    move |i: &[u8]| match alg {
        PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
            let (i, n) = mpi(i)?;
            let (i, e) = mpi(i)?;
            Ok((i, PublicParams::RSA { n, e }))
        }
        PublicKeyAlgorithm::DSA => {
            let (i, p) = mpi(i)?;
            let (i, q) = mpi(i)?;
            let (i, g) = mpi(i)?;
            let (i, y) = mpi(i)?;
            Ok((i, PublicParams::DSA { p, q, g, y }))
        }
        PublicKeyAlgorithm::Elgamal | PublicKeyAlgorithm::ElgamalSign => {
            let (i, p) = mpi(i)?;
            let (i, g) = mpi(i)?;
            let (i, y) = mpi(i)?;
            Ok((i, PublicParams::Elgamal { p, g, y }))
        }
        _ => {
            let (i, data) = rest(i)?;
            Ok((
                i,
                PublicParams::Unknown {
                    data: data.to_vec(),
                },
            ))
        }
    }
}

impl Serialize for PublicParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PublicParams::RSA { n, e } => {
                n.to_writer(writer)?;
                e.to_writer(writer)?;
            }
            PublicParams::DSA { p, q, g, y } => {
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::Elgamal { p, g, y } => {
                p.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::Unknown { data } => {
                writer.write_all(data)?;
            }
        }

        Ok(())
    }
}

/// The secret parameters of a key, stored in the clear.
/// Zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub enum PlainSecretParams {
    RSA { d: Mpi, p: Mpi, q: Mpi, u: Mpi },
    DSA { x: Mpi },
    Elgamal { x: Mpi },
}

impl fmt::Debug for PlainSecretParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlainSecretParams::RSA { .. } => write!(f, "PlainSecretParams::RSA(..)"),
            PlainSecretParams::DSA { .. } => write!(f, "PlainSecretParams::DSA(..)"),
            PlainSecretParams::Elgamal { .. } => write!(f, "PlainSecretParams::Elgamal(..)"),
        }
    }
}

impl PlainSecretParams {
    /// Parse the secret MPIs for the given algorithm. The input must contain
    /// exactly the MPIs, without any trailing checksum.
    pub fn from_slice(data: &[u8], alg: PublicKeyAlgorithm) -> Result<Self> {
        let (rest, params) = match alg {
            PublicKeyAlgorithm::RSA
            | PublicKeyAlgorithm::RSAEncrypt
            | PublicKeyAlgorithm::RSASign => {
                let (i, d) = mpi(data)?;
                let (i, p) = mpi(i)?;
                let (i, q) = mpi(i)?;
                let (i, u) = mpi(i)?;
                (i, PlainSecretParams::RSA { d, p, q, u })
            }
            PublicKeyAlgorithm::DSA => {
                let (i, x) = mpi(data)?;
                (i, PlainSecretParams::DSA { x })
            }
            PublicKeyAlgorithm::Elgamal | PublicKeyAlgorithm::ElgamalSign => {
                let (i, x) = mpi(data)?;
                (i, PlainSecretParams::Elgamal { x })
            }
            _ => unsupported_err!("secret params for {:?}", alg),
        };

        ensure!(rest.is_empty(), "trailing bytes in secret params");

        Ok(params)
    }

    /// The two-octet sum checksum over the serialized MPIs.
    pub fn checksum_simple(&self) -> Result<[u8; 2]> {
        let bytes = self.to_bytes()?;
        Ok(checksum::calculate_simple(&bytes).to_be_bytes())
    }

    /// The 20-octet SHA-1 checksum over the serialized MPIs.
    pub fn checksum_sha1(&self) -> Result<[u8; 20]> {
        let bytes = self.to_bytes()?;
        HashAlgorithm::SHA1
            .digest(&bytes)
            .map(|d| crate::util::clone_into_array(&d))
    }

    /// Build the in-memory representation used by the cryptographic
    /// operations, combining the secret half with the public parameters.
    pub fn as_repr(&self, public_params: &PublicParams) -> Result<SecretKeyRepr> {
        match (self, public_params) {
            (PlainSecretParams::RSA { d, p, q, .. }, PublicParams::RSA { n, e }) => {
                let key = rsa::RsaPrivateKey::from_components(
                    n.to_biguint(),
                    e.to_biguint(),
                    d.to_biguint(),
                    vec![p.to_biguint(), q.to_biguint()],
                )?;

                Ok(SecretKeyRepr::RSA(key))
            }
            (PlainSecretParams::DSA { x }, PublicParams::DSA { p, q, g, y }) => {
                let key = crate::crypto::dsa::signing_key(
                    &p.to_biguint(),
                    &q.to_biguint(),
                    &g.to_biguint(),
                    &y.to_biguint(),
                    &x.to_biguint(),
                )?;

                Ok(SecretKeyRepr::DSA(key))
            }
            (PlainSecretParams::Elgamal { x }, PublicParams::Elgamal { p, g, .. }) => {
                Ok(SecretKeyRepr::Elgamal {
                    p: p.to_biguint(),
                    g: g.to_biguint(),
                    x: x.to_biguint(),
                })
            }
            _ => bail!("secret params do not match public params"),
        }
    }
}

impl Serialize for PlainSecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PlainSecretParams::RSA { d, p, q, u } => {
                d.to_writer(writer)?;
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                u.to_writer(writer)?;
            }
            PlainSecretParams::DSA { x } | PlainSecretParams::Elgamal { x } => {
                x.to_writer(writer)?;
            }
        }

        Ok(())
    }
}

/// The secret parameters of a key, encrypted with a passphrase-derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecretParams {
    /// The encrypted secret MPIs, including the trailing checksum.
    pub data: Vec<u8>,
    /// The IV used for the CFB encryption.
    pub iv: Vec<u8>,
    /// The cipher the secret MPIs are encrypted with.
    pub encryption_algorithm: SymmetricKeyAlgorithm,
    pub string_to_key: StringToKey,
    /// The S2K usage octet: 254 (SHA-1 check), 255 (simple check) or a legacy
    /// symmetric algorithm id.
    pub string_to_key_id: u8,
}

impl EncryptedSecretParams {
    /// Decrypt the secret MPIs with the given passphrase and verify the
    /// embedded checksum.
    pub fn unlock(&self, passphrase: &str, alg: PublicKeyAlgorithm) -> Result<PlainSecretParams> {
        let key = self
            .string_to_key
            .derive_key(passphrase, self.encryption_algorithm.key_size())?;

        let mut plaintext = self.data.clone();
        self.encryption_algorithm
            .decrypt_with_iv_regular(&key, &self.iv, &mut plaintext)?;

        match self.string_to_key_id {
            254 => {
                ensure!(plaintext.len() > 20, "truncated secret params");
                let (data, cksum) = plaintext.split_at(plaintext.len() - 20);
                let expected = HashAlgorithm::SHA1.digest(data)?;
                ensure_eq!(cksum, &expected[..], "invalid SHA-1 checksum");
                PlainSecretParams::from_slice(data, alg)
            }
            _ => {
                ensure!(plaintext.len() > 2, "truncated secret params");
                let (data, cksum) = plaintext.split_at(plaintext.len() - 2);
                checksum::simple(cksum, data)?;
                PlainSecretParams::from_slice(data, alg)
            }
        }
    }
}

/// The secret parameters of a key, either plaintext or passphrase-protected.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.5.3>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretParams {
    Plain(PlainSecretParams),
    Encrypted(EncryptedSecretParams),
}

impl SecretParams {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretParams::Encrypted(_))
    }

    /// Parse the secret part of a key packet, starting at the S2K usage octet.
    pub fn from_slice(data: &[u8], alg: PublicKeyAlgorithm) -> Result<Self> {
        ensure!(!data.is_empty(), "truncated secret params");
        let usage = data[0];
        let i = &data[1..];

        match usage {
            // plaintext, with a simple checksum
            0 => {
                ensure!(i.len() > 2, "truncated secret params");
                let (mpis, cksum) = i.split_at(i.len() - 2);
                checksum::simple(cksum, mpis)?;

                Ok(SecretParams::Plain(PlainSecretParams::from_slice(
                    mpis, alg,
                )?))
            }
            // encrypted, with an explicit S2K specifier
            254 | 255 => {
                ensure!(i.len() > 1, "truncated secret params");
                let sym = SymmetricKeyAlgorithm::from(i[0]);
                let (i, s2k) = crate::types::s2k_parser(&i[1..])?;
                let bs = sym.block_size();
                ensure!(i.len() > bs, "truncated secret params");
                let (iv, rest) = i.split_at(bs);

                Ok(SecretParams::Encrypted(EncryptedSecretParams {
                    data: rest.to_vec(),
                    iv: iv.to_vec(),
                    encryption_algorithm: sym,
                    string_to_key: s2k,
                    string_to_key_id: usage,
                }))
            }
            // legacy: the usage octet is the symmetric algorithm, the key is
            // a simple MD5 of the passphrase
            _ => {
                let sym = SymmetricKeyAlgorithm::from(usage);
                let bs = sym.block_size();
                ensure!(bs > 0, "invalid legacy encryption algorithm {}", usage);
                ensure!(i.len() > bs, "truncated secret params");
                let (iv, rest) = i.split_at(bs);

                Ok(SecretParams::Encrypted(EncryptedSecretParams {
                    data: rest.to_vec(),
                    iv: iv.to_vec(),
                    encryption_algorithm: sym,
                    string_to_key: StringToKey::legacy_md5(),
                    string_to_key_id: usage,
                }))
            }
        }
    }
}

impl Serialize for SecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            SecretParams::Plain(p) => {
                writer.write_all(&[0u8])?;
                p.to_writer(writer)?;
                writer.write_all(&p.checksum_simple()?)?;
            }
            SecretParams::Encrypted(p) => {
                writer.write_all(&[p.string_to_key_id])?;
                match p.string_to_key_id {
                    254 | 255 => {
                        writer.write_all(&[p.encryption_algorithm.into()])?;
                        p.string_to_key.to_writer(writer)?;
                        writer.write_all(&p.iv)?;
                    }
                    _ => {
                        writer.write_all(&p.iv)?;
                    }
                }
                writer.write_all(&p.data)?;
            }
        }

        Ok(())
    }
}

/// Decrypted secret key material, ready for cryptographic operations.
pub enum SecretKeyRepr {
    RSA(rsa::RsaPrivateKey),
    DSA(dsa::SigningKey),
    Elgamal { p: BigUint, g: BigUint, x: BigUint },
}

impl fmt::Debug for SecretKeyRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretKeyRepr::RSA(_) => write!(f, "SecretKeyRepr::RSA(..)"),
            SecretKeyRepr::DSA(_) => write!(f, "SecretKeyRepr::DSA(..)"),
            SecretKeyRepr::Elgamal { .. } => write!(f, "SecretKeyRepr::Elgamal(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_secret_roundtrip() {
        let params = PlainSecretParams::DSA {
            x: Mpi::from_slice(&[0x12, 0x34, 0x56]),
        };

        let mut buf = Vec::new();
        SecretParams::Plain(params.clone())
            .to_writer(&mut buf)
            .unwrap();

        // usage octet 0, mpi, 2 byte checksum
        assert_eq!(buf[0], 0);
        assert_eq!(buf.len(), 1 + 2 + 3 + 2);

        let back = SecretParams::from_slice(&buf, PublicKeyAlgorithm::DSA).unwrap();
        assert_eq!(back, SecretParams::Plain(params));
    }

    #[test]
    fn test_plain_secret_bad_checksum() {
        let params = PlainSecretParams::DSA {
            x: Mpi::from_slice(&[0x12, 0x34, 0x56]),
        };

        let mut buf = Vec::new();
        SecretParams::Plain(params).to_writer(&mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0x01;

        assert!(SecretParams::from_slice(&buf, PublicKeyAlgorithm::DSA).is_err());
    }
}
