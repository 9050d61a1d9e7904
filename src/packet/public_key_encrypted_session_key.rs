use std::fmt;
use std::io;

use nom::bytes::streaming::take;
use nom::number::streaming::be_u8;
use rand::{CryptoRng, Rng};

use crate::crypto::checksum;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{mpi, KeyId, KeyTrait, Mpi, PublicKeyTrait, Tag, Version};

/// Public-Key Encrypted Session Key Packet
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.1>
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyEncryptedSessionKey {
    packet_version: Version,
    version: u8,
    id: KeyId,
    algorithm: PublicKeyAlgorithm,
    mpis: Vec<Mpi>,
}

impl PublicKeyEncryptedSessionKey {
    /// Encrypt the given session key for `pkey`.
    pub fn from_session_key<R: CryptoRng + Rng>(
        rng: &mut R,
        session_key: &[u8],
        alg: SymmetricKeyAlgorithm,
        pkey: &impl PublicKeyTrait,
    ) -> Result<Self> {
        // the plaintext is the algorithm, the session key and a checksum over
        // the session key octets
        let mut data = Vec::with_capacity(session_key.len() + 3);
        data.push(alg.into());
        data.extend_from_slice(session_key);
        data.extend_from_slice(&checksum::calculate_simple(session_key).to_be_bytes());

        let mpis = pkey.encrypt(rng, &data)?;

        Ok(PublicKeyEncryptedSessionKey {
            packet_version: Default::default(),
            version: 3,
            id: pkey.key_id(),
            algorithm: pkey.algorithm(),
            mpis,
        })
    }

    /// Encrypt for an anonymous recipient: the key id is zeroed out, so a
    /// decrypting party has to try all of its keys.
    pub fn from_session_key_anonymous<R: CryptoRng + Rng>(
        rng: &mut R,
        session_key: &[u8],
        alg: SymmetricKeyAlgorithm,
        pkey: &impl PublicKeyTrait,
    ) -> Result<Self> {
        let mut esk = Self::from_session_key(rng, session_key, alg, pkey)?;
        esk.id = KeyId::WILDCARD;

        Ok(esk)
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    pub fn mpis(&self) -> &[Mpi] {
        &self.mpis
    }
}

impl Deserialize for PublicKeyEncryptedSessionKey {
    /// Parses a `PublicKeyEncryptedSessionKey` packet from the given slice.
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        // version, only 3 is allowed
        let (i, version) = be_u8(input)?;
        ensure_eq!(version, 3, "invalid pkesk version");

        // the key id this maps to
        let (i, id) = take(8usize)(i)?;
        let id = KeyId::from_slice(id)?;

        // the public key algorithm
        let (i, alg) = be_u8(i)?;
        let algorithm = PublicKeyAlgorithm::from(alg);

        // key algorithm specific data
        let mpis = match algorithm {
            PublicKeyAlgorithm::RSA
            | PublicKeyAlgorithm::RSASign
            | PublicKeyAlgorithm::RSAEncrypt => {
                let (_, m) = mpi(i)?;
                vec![m]
            }
            PublicKeyAlgorithm::Elgamal | PublicKeyAlgorithm::ElgamalSign => {
                let (i, first) = mpi(i)?;
                let (_, second) = mpi(i)?;
                vec![first, second]
            }
            _ => unsupported_err!("esk for {:?}", algorithm),
        };

        Ok(PublicKeyEncryptedSessionKey {
            packet_version,
            version,
            id,
            algorithm,
            mpis,
        })
    }
}

impl Serialize for PublicKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.version])?;
        writer.write_all(self.id.as_ref())?;
        writer.write_all(&[self.algorithm.into()])?;

        for mpi in &self.mpis {
            mpi.to_writer(writer)?;
        }

        Ok(())
    }
}

impl PacketTrait for PublicKeyEncryptedSessionKey {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::PublicKeyEncryptedSessionKey
    }
}

impl fmt::Debug for PublicKeyEncryptedSessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyEncryptedSessionKey")
            .field("version", &self.version)
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .field("mpis", &self.mpis)
            .finish()
    }
}
