use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{DateTime, TimeZone, Utc};
use nom::combinator::map;
use nom::number::streaming::{be_u16, be_u32, be_u8};
use rand::{CryptoRng, Rng};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::{dsa, elgamal, rsa};
use crate::de::Deserialize;
use crate::errors::{Error, IResult, Result};
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{
    parse_public_params, KeyId, KeyTrait, KeyVersion, Mpi, PublicKeyTrait, PublicParams, Tag,
    Version,
};

/// Parse the fields of a public key packet body, shared by all four key tags.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.5.2>
pub(crate) fn parse_key_fields(
    i: &[u8],
) -> IResult<
    &[u8],
    (
        KeyVersion,
        PublicKeyAlgorithm,
        DateTime<Utc>,
        Option<u16>,
        PublicParams,
    ),
> {
    let (i, version) = map(be_u8, KeyVersion::from)(i)?;

    match version {
        KeyVersion::V2 | KeyVersion::V3 => {
            let (i, created) = be_u32(i)?;
            let (i, expiration) = be_u16(i)?;
            let (i, alg) = map(be_u8, PublicKeyAlgorithm::from)(i)?;
            let (i, params) = parse_public_params(alg)(i)?;

            let created = Utc
                .timestamp_opt(i64::from(created), 0)
                .single()
                .ok_or(nom::Err::Error(Error::InvalidInput))?;

            Ok((i, (version, alg, created, Some(expiration), params)))
        }
        KeyVersion::V4 => {
            let (i, created) = be_u32(i)?;
            let (i, alg) = map(be_u8, PublicKeyAlgorithm::from)(i)?;
            let (i, params) = parse_public_params(alg)(i)?;

            let created = Utc
                .timestamp_opt(i64::from(created), 0)
                .single()
                .ok_or(nom::Err::Error(Error::InvalidInput))?;

            Ok((i, (version, alg, created, None, params)))
        }
        KeyVersion::Other(v) => Err(nom::Err::Error(Error::Unsupported {
            message: format!("key version {v}"),
            backtrace: None,
        })),
    }
}

macro_rules! impl_public_key {
    ($name:ident, $tag:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            packet_version: Version,
            version: KeyVersion,
            algorithm: PublicKeyAlgorithm,
            created_at: DateTime<Utc>,
            expiration: Option<u16>,
            public_params: PublicParams,
        }

        impl $name {
            pub fn new(
                packet_version: Version,
                version: KeyVersion,
                algorithm: PublicKeyAlgorithm,
                created_at: DateTime<Utc>,
                expiration: Option<u16>,
                public_params: PublicParams,
            ) -> Result<Self> {
                ensure!(
                    version == KeyVersion::V4 || expiration.is_some(),
                    "missing expiration for a v2/v3 key"
                );

                Ok($name {
                    packet_version,
                    version,
                    algorithm,
                    created_at,
                    expiration,
                    public_params,
                })
            }

            pub fn version(&self) -> KeyVersion {
                self.version
            }

            pub fn created_at(&self) -> &DateTime<Utc> {
                &self.created_at
            }

            pub fn expiration(&self) -> Option<u16> {
                self.expiration
            }

            pub fn public_params(&self) -> &PublicParams {
                &self.public_params
            }
        }

        impl KeyTrait for $name {
            /// Ref: <https://tools.ietf.org/html/rfc4880.html#section-12.2>
            fn fingerprint(&self) -> Vec<u8> {
                match self.version {
                    KeyVersion::V2 | KeyVersion::V3 => {
                        // MD5 over the raw magnitude octets of the material
                        let data = match &self.public_params {
                            PublicParams::RSA { n, e } => {
                                let mut data =
                                    Vec::with_capacity(n.as_ref().len() + e.as_ref().len());
                                data.extend_from_slice(n.as_ref());
                                data.extend_from_slice(e.as_ref());
                                data
                            }
                            params => params.to_bytes().expect("known material"),
                        };

                        HashAlgorithm::MD5
                            .digest(&data)
                            .expect("MD5 is implemented")
                    }
                    _ => {
                        let data = self
                            .serialize_for_hashing()
                            .expect("known key material");

                        HashAlgorithm::SHA1
                            .digest(&data)
                            .expect("SHA1 is implemented")
                    }
                }
            }

            fn key_id(&self) -> KeyId {
                match self.version {
                    KeyVersion::V2 | KeyVersion::V3 => match &self.public_params {
                        // the low 64 bits of the public modulus
                        PublicParams::RSA { n, .. } => {
                            let n = n.as_ref();
                            let offset = n.len().saturating_sub(8);

                            KeyId::from_slice(&n[offset..]).expect("known length")
                        }
                        _ => KeyId::WILDCARD,
                    },
                    _ => {
                        let f = self.fingerprint();
                        let offset = f.len() - 8;

                        KeyId::from_slice(&f[offset..]).expect("known length")
                    }
                }
            }

            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.algorithm
            }
        }

        impl PublicKeyTrait for $name {
            fn verify_signature(
                &self,
                hash: HashAlgorithm,
                hashed: &[u8],
                sig: &[Mpi],
            ) -> Result<()> {
                match &self.public_params {
                    PublicParams::RSA { n, e } => {
                        ensure_eq!(sig.len(), 1, "invalid signature");
                        rsa::verify(n.as_ref(), e.as_ref(), hash, hashed, sig[0].as_ref())
                    }
                    PublicParams::DSA { p, q, g, y } => dsa::verify(
                        &p.to_biguint(),
                        &q.to_biguint(),
                        &g.to_biguint(),
                        &y.to_biguint(),
                        hashed,
                        sig,
                    ),
                    PublicParams::Elgamal { .. } => {
                        unsupported_err!("signatures with {:?}", self.algorithm)
                    }
                    PublicParams::Unknown { .. } => {
                        unsupported_err!("signatures with {:?}", self.algorithm)
                    }
                }
            }

            fn encrypt<R: CryptoRng + Rng>(&self, rng: &mut R, plain: &[u8]) -> Result<Vec<Mpi>> {
                match &self.public_params {
                    PublicParams::RSA { n, e } => rsa::encrypt(rng, n.as_ref(), e.as_ref(), plain),
                    PublicParams::Elgamal { p, g, y } => {
                        elgamal::encrypt(rng, p.as_ref(), g.as_ref(), y.as_ref(), plain)
                    }
                    PublicParams::DSA { .. } => bail!("DSA is only suitable for signatures"),
                    PublicParams::Unknown { .. } => {
                        unsupported_err!("encryption with {:?}", self.algorithm)
                    }
                }
            }

            fn serialize_for_hashing(&self) -> Result<Vec<u8>> {
                let body = self.to_bytes()?;

                let mut out = Vec::with_capacity(body.len() + 3);
                out.push(0x99);
                out.write_u16::<BigEndian>(body.len() as u16)?;
                out.extend_from_slice(&body);

                Ok(out)
            }
        }

        impl Deserialize for $name {
            fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
                let (_, (version, algorithm, created_at, expiration, public_params)) =
                    parse_key_fields(input)?;

                $name::new(
                    packet_version,
                    version,
                    algorithm,
                    created_at,
                    expiration,
                    public_params,
                )
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                writer.write_all(&[self.version.into()])?;

                match self.version {
                    KeyVersion::V2 | KeyVersion::V3 => {
                        writer.write_u32::<BigEndian>(self.created_at.timestamp() as u32)?;
                        writer.write_u16::<BigEndian>(self.expiration.unwrap_or(0))?;
                        writer.write_all(&[self.algorithm.into()])?;
                        self.public_params.to_writer(writer)?;
                    }
                    KeyVersion::V4 => {
                        writer.write_u32::<BigEndian>(self.created_at.timestamp() as u32)?;
                        writer.write_all(&[self.algorithm.into()])?;
                        self.public_params.to_writer(writer)?;
                    }
                    KeyVersion::Other(v) => bail!("unsupported key version {}", v),
                }

                Ok(())
            }
        }

        impl PacketTrait for $name {
            fn packet_version(&self) -> Version {
                self.packet_version
            }

            fn tag(&self) -> Tag {
                $tag
            }
        }
    };
}

impl_public_key!(PublicKey, Tag::PublicKey);
impl_public_key!(PublicSubkey, Tag::PublicSubkey);
