use chrono::{Duration, TimeZone, Utc};
use nom::bytes::streaming::take;
use nom::combinator::{complete, map};
use nom::multi::many0;
use nom::number::streaming::{be_u16, be_u32, be_u8};
use smallvec::SmallVec;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::de::Deserialize;
use crate::errors::{Error, IResult, Result};
use crate::packet::signature::types::{
    KeyFlags, RevocationCode, Signature, SignatureType, Subpacket, SubpacketData, SubpacketType,
};
use crate::packet::signature::SignatureConfig;
use crate::types::{mpi, CompressionAlgorithm, KeyId, Mpi, Version};
use crate::util::packet_length;

impl Deserialize for Signature {
    /// Parses a `Signature` packet from the given slice.
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        let (_, sig) = parse(packet_version)(input)?;

        Ok(sig)
    }
}

fn parse(packet_version: Version) -> impl Fn(&[u8]) -> IResult<&[u8], Signature> {
    move |i: &[u8]| {
        let (i, version) = be_u8(i)?;
        match version {
            3 => v3_parser(packet_version, i),
            4 => v4_parser(packet_version, i),
            v => Err(nom::Err::Error(Error::Unsupported {
                message: format!("signature version {v}"),
                backtrace: None,
            })),
        }
    }
}

/// Parse the signature MPIs, their count is determined by the algorithm.
fn actual_signature(pub_alg: PublicKeyAlgorithm) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<Mpi>> {
    move |i: &[u8]| match pub_alg {
        PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSASign => map(mpi, |v| vec![v])(i),
        PublicKeyAlgorithm::DSA | PublicKeyAlgorithm::Elgamal | PublicKeyAlgorithm::ElgamalSign => {
            let (i, first) = mpi(i)?;
            let (i, second) = mpi(i)?;
            Ok((i, vec![first, second]))
        }
        _ => many0(complete(mpi))(i),
    }
}

/// Parse a v3 signature packet (the version octet is already consumed).
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.2>
fn v3_parser(packet_version: Version, i: &[u8]) -> IResult<&[u8], Signature> {
    // One-octet length of following hashed material. MUST be 5.
    let (i, len) = be_u8(i)?;
    if len != 5 {
        return Err(nom::Err::Error(Error::InvalidInput));
    }

    let (i, typ) = map(be_u8, SignatureType::from)(i)?;
    let (i, created) = be_u32(i)?;
    let (i, issuer) = take(8usize)(i)?;
    let (i, pub_alg) = map(be_u8, PublicKeyAlgorithm::from)(i)?;
    let (i, hash_alg) = map(be_u8, HashAlgorithm::from)(i)?;
    let (i, signed_hash_value) = take(2usize)(i)?;
    let (i, signature) = actual_signature(pub_alg)(i)?;

    let created = Utc
        .timestamp_opt(i64::from(created), 0)
        .single()
        .ok_or(nom::Err::Error(Error::InvalidInput))?;
    let issuer = KeyId::from_slice(issuer).map_err(nom::Err::Error)?;

    let mut sig = Signature::from_config(
        SignatureConfig::v3(typ, pub_alg, hash_alg, created, issuer),
        [signed_hash_value[0], signed_hash_value[1]],
        signature,
    );
    sig.set_packet_version(packet_version);

    Ok((i, sig))
}

/// Parse a v4 signature packet (the version octet is already consumed).
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.3>
fn v4_parser(packet_version: Version, i: &[u8]) -> IResult<&[u8], Signature> {
    let (i, typ) = map(be_u8, SignatureType::from)(i)?;
    let (i, pub_alg) = map(be_u8, PublicKeyAlgorithm::from)(i)?;
    let (i, hash_alg) = map(be_u8, HashAlgorithm::from)(i)?;

    let (i, hashed_len) = be_u16(i)?;
    let (i, hashed_raw) = take(hashed_len as usize)(i)?;
    let (i, unhashed_len) = be_u16(i)?;
    let (i, unhashed_raw) = take(unhashed_len as usize)(i)?;

    let (i, signed_hash_value) = take(2usize)(i)?;
    let (i, signature) = actual_signature(pub_alg)(i)?;

    let hashed_subpackets = subpackets(hashed_raw).map_err(nom::Err::Error)?;
    let unhashed_subpackets = subpackets(unhashed_raw).map_err(nom::Err::Error)?;

    let mut config = SignatureConfig::v4(typ, pub_alg, hash_alg);
    config.hashed_subpackets = hashed_subpackets;
    config.unhashed_subpackets = unhashed_subpackets;

    let mut sig = Signature::from_config(
        config,
        [signed_hash_value[0], signed_hash_value[1]],
        signature,
    );
    sig.set_packet_version(packet_version);

    Ok((i, sig))
}

fn subpackets(mut i: &[u8]) -> Result<Vec<Subpacket>> {
    let mut res = Vec::new();

    while !i.is_empty() {
        let (rest, packet) = subpacket(i)?;
        res.push(packet);
        i = rest;
    }

    Ok(res)
}

fn subpacket(i: &[u8]) -> IResult<&[u8], Subpacket> {
    let (i, len) = packet_length(i)?;
    if len < 1 {
        return Err(nom::Err::Error(Error::InvalidInput));
    }

    let (i, raw_typ) = be_u8(i)?;
    let (i, body) = take(len - 1)(i)?;

    let is_critical = raw_typ & 0x80 != 0;
    let typ = SubpacketType::from(raw_typ & 0x7F);
    let data = subpacket_data(typ, raw_typ & 0x7F, body).map_err(nom::Err::Error)?;

    Ok((i, Subpacket { is_critical, data }))
}

fn subpacket_data(typ: SubpacketType, raw_typ: u8, body: &[u8]) -> Result<SubpacketData, Error> {
    use nom::number::complete as num;

    let res = match typ {
        SubpacketType::SignatureCreationTime => {
            let (_, ts) = num::be_u32::<_, Error>(body)?;
            let created = Utc
                .timestamp_opt(i64::from(ts), 0)
                .single()
                .ok_or(Error::InvalidInput)?;
            SubpacketData::SignatureCreationTime(created)
        }
        SubpacketType::SignatureExpirationTime => {
            let (_, d) = num::be_u32::<_, Error>(body)?;
            SubpacketData::SignatureExpirationTime(Duration::seconds(i64::from(d)))
        }
        SubpacketType::KeyExpirationTime => {
            let (_, d) = num::be_u32::<_, Error>(body)?;
            SubpacketData::KeyExpirationTime(Duration::seconds(i64::from(d)))
        }
        SubpacketType::Issuer => SubpacketData::Issuer(KeyId::from_slice(body)?),
        SubpacketType::PreferredSymmetricAlgorithms => SubpacketData::PreferredSymmetricAlgorithms(
            body.iter()
                .map(|v| SymmetricKeyAlgorithm::from(*v))
                .collect::<SmallVec<_>>(),
        ),
        SubpacketType::PreferredHashAlgorithms => SubpacketData::PreferredHashAlgorithms(
            body.iter()
                .map(|v| HashAlgorithm::from(*v))
                .collect::<SmallVec<_>>(),
        ),
        SubpacketType::PreferredCompressionAlgorithms => {
            SubpacketData::PreferredCompressionAlgorithms(
                body.iter()
                    .map(|v| CompressionAlgorithm::from(*v))
                    .collect::<SmallVec<_>>(),
            )
        }
        SubpacketType::Revocable => {
            let (_, b) = num::be_u8::<_, Error>(body)?;
            SubpacketData::Revocable(b != 0)
        }
        SubpacketType::PrimaryUserId => {
            let (_, b) = num::be_u8::<_, Error>(body)?;
            SubpacketData::PrimaryUserId(b != 0)
        }
        SubpacketType::KeyFlags => {
            // multi-octet key flags are valid but rare; preserve them opaquely
            if body.len() == 1 {
                SubpacketData::KeyFlags(KeyFlags::from(body[0]))
            } else {
                SubpacketData::Other(raw_typ, body.to_vec())
            }
        }
        SubpacketType::Features => SubpacketData::Features(body.to_vec()),
        SubpacketType::RevocationReason => {
            let (rest, code) = num::be_u8::<_, Error>(body)?;
            SubpacketData::RevocationReason(
                RevocationCode::from(code),
                String::from_utf8_lossy(rest).to_string(),
            )
        }
        SubpacketType::EmbeddedSignature => {
            let sig = Signature::from_slice(Version::New, body)?;
            SubpacketData::EmbeddedSignature(Box::new(sig))
        }
        SubpacketType::IssuerFingerprint => SubpacketData::IssuerFingerprint(body.to_vec()),
        SubpacketType::Other(_) => SubpacketData::Other(raw_typ, body.to_vec()),
        // a known type we do not interpret structurally
        _ => SubpacketData::Other(raw_typ, body.to_vec()),
    };

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser::Serialize;

    #[test]
    fn test_subpacket_roundtrip() {
        let packets = vec![
            Subpacket::regular(SubpacketData::SignatureCreationTime(
                Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            )),
            Subpacket::regular(SubpacketData::Issuer(
                KeyId::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(),
            )),
            Subpacket::regular(SubpacketData::KeyFlags(KeyFlags::from(0x03))),
            Subpacket::critical(SubpacketData::PrimaryUserId(true)),
            Subpacket::regular(SubpacketData::Other(100, vec![1, 2, 3])),
        ];

        let mut buf = Vec::new();
        for p in &packets {
            p.to_writer(&mut buf).unwrap();
        }

        let back = subpackets(&buf).unwrap();
        assert_eq!(packets, back);
    }
}
