use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::errors::Result;
use crate::packet::signature::config::SignatureVersionSpecific;
use crate::packet::signature::types::{Signature, Subpacket, SubpacketData};
use crate::ser::Serialize;
use crate::util::write_packet_length;

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match &self.config.version_specific {
            SignatureVersionSpecific::V3 { created, issuer } => {
                writer.write_all(&[
                    // version
                    3,
                    // length of the following hashed material
                    5,
                    self.config.typ.into(),
                ])?;
                writer.write_u32::<BigEndian>(created.timestamp() as u32)?;
                writer.write_all(issuer.as_ref())?;
                writer.write_all(&[self.config.pub_alg.into(), self.config.hash_alg.into()])?;
            }
            SignatureVersionSpecific::V4 => {
                writer.write_all(&[
                    4,
                    self.config.typ.into(),
                    self.config.pub_alg.into(),
                    self.config.hash_alg.into(),
                ])?;

                let mut hashed = Vec::new();
                for p in &self.config.hashed_subpackets {
                    p.to_writer(&mut hashed)?;
                }
                writer.write_u16::<BigEndian>(hashed.len() as u16)?;
                writer.write_all(&hashed)?;

                let mut unhashed = Vec::new();
                for p in &self.config.unhashed_subpackets {
                    p.to_writer(&mut unhashed)?;
                }
                writer.write_u16::<BigEndian>(unhashed.len() as u16)?;
                writer.write_all(&unhashed)?;
            }
        }

        writer.write_all(&self.signed_hash_value)?;

        for mpi in &self.signature {
            mpi.to_writer(writer)?;
        }

        Ok(())
    }
}

impl Serialize for Subpacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let body = subpacket_body(&self.data)?;

        write_packet_length(1 + body.len(), writer)?;

        let mut typ: u8 = self.typ().into();
        if self.is_critical {
            typ |= 0x80;
        }
        writer.write_all(&[typ])?;
        writer.write_all(&body)?;

        Ok(())
    }
}

fn subpacket_body(data: &SubpacketData) -> Result<Vec<u8>> {
    let mut body = Vec::new();

    match data {
        SubpacketData::SignatureCreationTime(created) => {
            body.write_u32::<BigEndian>(created.timestamp() as u32)?;
        }
        SubpacketData::SignatureExpirationTime(d) | SubpacketData::KeyExpirationTime(d) => {
            body.write_u32::<BigEndian>(d.num_seconds() as u32)?;
        }
        SubpacketData::Issuer(id) => {
            body.extend_from_slice(id.as_ref());
        }
        SubpacketData::PreferredSymmetricAlgorithms(algs) => {
            body.extend(algs.iter().map(|&a| u8::from(a)));
        }
        SubpacketData::PreferredHashAlgorithms(algs) => {
            body.extend(algs.iter().map(|&a| u8::from(a)));
        }
        SubpacketData::PreferredCompressionAlgorithms(algs) => {
            body.extend(algs.iter().map(|&a| u8::from(a)));
        }
        SubpacketData::Revocable(b) | SubpacketData::PrimaryUserId(b) => {
            body.push(u8::from(*b));
        }
        SubpacketData::KeyFlags(flags) => {
            body.push((*flags).into());
        }
        SubpacketData::Features(raw) => {
            body.extend_from_slice(raw);
        }
        SubpacketData::RevocationReason(code, reason) => {
            body.push((*code).into());
            body.extend_from_slice(reason.as_bytes());
        }
        SubpacketData::EmbeddedSignature(sig) => {
            sig.to_writer(&mut body)?;
        }
        SubpacketData::IssuerFingerprint(fp) => {
            body.extend_from_slice(fp);
        }
        SubpacketData::Other(_, raw) => {
            body.extend_from_slice(raw);
        }
    }

    Ok(body)
}
