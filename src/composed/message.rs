use std::io;
use std::iter::Peekable;

use chrono::{SubsecRound, Utc};
use log::debug;
use rand::{CryptoRng, Rng};

use crate::armor::{self, BlockType, Headers};
use crate::composed::shared::Deserializable;
use crate::composed::signed_key::{SignedPublicKey, SignedSecretKey};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::crypto::{checksum, elgamal, rsa};
use crate::errors::{Error, Result};
use crate::packet::{
    write_packet, CompressedData, LiteralData, OnePassSignature, Packet, PacketTrait,
    PublicKeyEncryptedSessionKey, Signature, SignatureConfig, SignatureType, Subpacket,
    SubpacketData, SymEncryptedData, SymEncryptedProtectedData, SymKeyEncryptedSessionKey,
};
use crate::ser::Serialize;
use crate::types::{
    CompressionAlgorithm, KeyTrait, PublicKeyTrait, SecretKeyRepr, SecretKeyTrait, StringToKey,
    Tag,
};

/// An encrypted session key packet: either public key or passphrase based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Esk {
    PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
}

impl Serialize for Esk {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Esk::PublicKeyEncryptedSessionKey(p) => write_packet(writer, p),
            Esk::SymKeyEncryptedSessionKey(p) => write_packet(writer, p),
        }
    }
}

impl TryFrom<Packet> for Esk {
    type Error = Error;

    fn try_from(other: Packet) -> Result<Esk> {
        match other {
            Packet::PublicKeyEncryptedSessionKey(p) => Ok(Esk::PublicKeyEncryptedSessionKey(p)),
            Packet::SymKeyEncryptedSessionKey(p) => Ok(Esk::SymKeyEncryptedSessionKey(p)),
            p => Err(format_err!("not an esk packet: {:?}", p.tag())),
        }
    }
}

/// An encrypted data packet: with or without integrity protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edata {
    SymEncryptedData(SymEncryptedData),
    SymEncryptedProtectedData(SymEncryptedProtectedData),
}

impl Serialize for Edata {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Edata::SymEncryptedData(d) => write_packet(writer, d),
            Edata::SymEncryptedProtectedData(d) => write_packet(writer, d),
        }
    }
}

impl TryFrom<Packet> for Edata {
    type Error = Error;

    fn try_from(other: Packet) -> Result<Edata> {
        match other {
            Packet::SymEncryptedData(d) => Ok(Edata::SymEncryptedData(d)),
            Packet::SymEncryptedProtectedData(d) => Ok(Edata::SymEncryptedProtectedData(d)),
            p => Err(format_err!("not an edata packet: {:?}", p.tag())),
        }
    }
}

/// A PGP message.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-11.3>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Literal(LiteralData),
    Compressed(CompressedData),
    Signed {
        /// nested message
        message: Option<Box<Message>>,
        /// for signature packets that contain a one pass message
        one_pass_signature: Option<OnePassSignature>,
        /// the actual signature
        signature: Signature,
    },
    Encrypted {
        esk: Vec<Esk>,
        edata: Vec<Edata>,
    },
}

/// Parse a message from the given packets, following the message grammar.
fn next<I: Iterator<Item = Result<Packet>>>(packets: &mut Peekable<I>) -> Option<Result<Message>> {
    macro_rules! err_opt {
        ($e:expr) => {
            match $e {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            }
        };
    }

    loop {
        let packet = match packets.next()? {
            Ok(packet) => packet,
            Err(e) => return Some(Err(e)),
        };

        match packet {
            // marker packets must be ignored
            Packet::Marker(_) => continue,
            Packet::LiteralData(literal) => return Some(Ok(Message::Literal(literal))),
            Packet::CompressedData(compressed) => {
                return Some(Ok(Message::Compressed(compressed)))
            }
            Packet::OnePassSignature(ops) => {
                // the content between a one pass signature and its trailing
                // signature packet
                let message = match next(packets) {
                    Some(Ok(message)) => Some(Box::new(message)),
                    Some(Err(e)) => return Some(Err(e)),
                    None => None,
                };

                let signature = match packets.next() {
                    Some(Ok(Packet::Signature(sig))) => sig,
                    Some(Ok(p)) => {
                        return Some(Err(format_err!(
                            "unexpected packet {:?}, expected a signature",
                            p.tag()
                        )))
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => {
                        return Some(Err(format_err!(
                            "missing signature for one pass signature"
                        )))
                    }
                };

                return Some(Ok(Message::Signed {
                    message,
                    one_pass_signature: Some(ops),
                    signature,
                }));
            }
            Packet::Signature(signature) => {
                // old style signed message: the signature comes first
                let message = match next(packets) {
                    Some(Ok(message)) => Some(Box::new(message)),
                    Some(Err(e)) => return Some(Err(e)),
                    None => None,
                };

                return Some(Ok(Message::Signed {
                    message,
                    one_pass_signature: None,
                    signature,
                }));
            }
            Packet::PublicKeyEncryptedSessionKey(_) | Packet::SymKeyEncryptedSessionKey(_) => {
                let mut esk = vec![err_opt!(Esk::try_from(packet))];

                // further session keys
                while let Some(res) = packets.next_if(|p| {
                    p.as_ref().is_ok_and(|p| {
                        p.tag() == Tag::PublicKeyEncryptedSessionKey
                            || p.tag() == Tag::SymKeyEncryptedSessionKey
                    })
                }) {
                    let packet = err_opt!(res);
                    esk.push(err_opt!(Esk::try_from(packet)));
                }

                // the actual encrypted data
                let mut edata = Vec::new();
                while let Some(res) = packets.next_if(|p| {
                    p.as_ref().is_ok_and(|p| {
                        p.tag() == Tag::SymEncryptedData
                            || p.tag() == Tag::SymEncryptedProtectedData
                    })
                }) {
                    let packet = err_opt!(res);
                    edata.push(err_opt!(Edata::try_from(packet)));
                }

                if edata.is_empty() {
                    return Some(Err(format_err!(
                        "missing encrypted data packet after session keys"
                    )));
                }

                return Some(Ok(Message::Encrypted { esk, edata }));
            }
            p => {
                return Some(Err(format_err!(
                    "unexpected packet in message: {:?}",
                    p.tag()
                )))
            }
        }
    }
}

pub struct MessageParser<I: Sized + Iterator<Item = Result<Packet>>> {
    source: Peekable<I>,
}

impl<I: Sized + Iterator<Item = Result<Packet>>> Iterator for MessageParser<I> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        next(&mut self.source)
    }
}

impl Deserializable for Message {
    fn from_packets<'a, I: Iterator<Item = Result<Packet>> + 'a>(
        packets: Peekable<I>,
    ) -> Box<dyn Iterator<Item = Result<Self>> + 'a> {
        Box::new(MessageParser { source: packets })
    }

    fn matches_block_type(typ: BlockType) -> bool {
        matches!(
            typ,
            BlockType::Message | BlockType::MultiPartMessage(_, _)
        )
    }
}

impl Message {
    pub fn new_literal(file_name: &str, data: &str) -> Self {
        Message::Literal(LiteralData::from_str(file_name, data))
    }

    pub fn new_literal_bytes(file_name: &str, data: &[u8]) -> Self {
        Message::Literal(LiteralData::from_bytes(file_name, data.to_vec()))
    }

    /// Compress this message into a compressed data packet.
    pub fn compress(&self, alg: CompressionAlgorithm) -> Result<Message> {
        let data = self.to_bytes()?;
        Ok(Message::Compressed(CompressedData::compress(alg, &data)?))
    }

    /// Unpack a compressed message.
    pub fn decompress(self) -> Result<Message> {
        match self {
            Message::Compressed(data) => Message::from_bytes(&data.decompress()?),
            _ => Ok(self),
        }
    }

    /// Sign this message, yielding a one pass signed message wrapping it.
    pub fn sign<K>(self, key: &K, key_pw: &str, hash_algorithm: HashAlgorithm) -> Result<Message>
    where
        K: SecretKeyTrait,
    {
        let data = self.signed_payload()?;

        let mut config = SignatureConfig::v4(
            SignatureType::Binary,
            key.algorithm(),
            hash_algorithm,
        );
        config.hashed_subpackets = vec![Subpacket::regular(SubpacketData::SignatureCreationTime(
            Utc::now().trunc_subsecs(0),
        ))];
        config.unhashed_subpackets =
            vec![Subpacket::regular(SubpacketData::Issuer(key.key_id()))];

        let signature = config.sign(key, key_pw, &data)?;

        let one_pass_signature = OnePassSignature::new(
            SignatureType::Binary,
            hash_algorithm,
            key.algorithm(),
            key.key_id(),
        );

        Ok(Message::Signed {
            message: Some(Box::new(self)),
            one_pass_signature: Some(one_pass_signature),
            signature,
        })
    }

    /// Verify the signature of a signed message against `key`. Compressed
    /// containers are unpacked to find the signature.
    pub fn verify(&self, key: &SignedPublicKey) -> Result<()> {
        match self {
            Message::Signed {
                message, signature, ..
            } => {
                let message = message
                    .as_ref()
                    .ok_or_else(|| format_err!("no message to verify"))?;
                let data = message.signed_payload()?;

                key.verify_data(signature, &data)
            }
            Message::Compressed(data) => Message::from_bytes(&data.decompress()?)?.verify(key),
            _ => bail!("no signature found"),
        }
    }

    /// The content bytes that a signature covers: the literal data.
    fn signed_payload(&self) -> Result<Vec<u8>> {
        match self {
            Message::Literal(literal) => Ok(literal.data().to_vec()),
            Message::Compressed(data) => {
                Message::from_bytes(&data.decompress()?)?.signed_payload()
            }
            Message::Signed {
                message: Some(message),
                ..
            } => message.signed_payload(),
            Message::Signed { message: None, .. } => bail!("empty signed message"),
            Message::Encrypted { .. } => bail!("can not sign encrypted message"),
        }
    }

    /// Encrypt this message to the given public keys.
    pub fn encrypt_to_keys<R: CryptoRng + Rng, K: PublicKeyTrait>(
        &self,
        rng: &mut R,
        alg: SymmetricKeyAlgorithm,
        keys: &[&K],
        protected: bool,
    ) -> Result<Message> {
        ensure!(!keys.is_empty(), "no recipients given");

        let session_key = alg.new_session_key(rng);

        let esk = keys
            .iter()
            .map(|key| {
                PublicKeyEncryptedSessionKey::from_session_key(rng, &session_key, alg, key)
                    .map(Esk::PublicKeyEncryptedSessionKey)
            })
            .collect::<Result<Vec<_>>>()?;

        let edata = self.encrypt_data(rng, alg, &session_key, protected)?;

        Ok(Message::Encrypted { esk, edata })
    }

    /// Encrypt this message with a passphrase.
    pub fn encrypt_with_password<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        msg_pw: &str,
        alg: SymmetricKeyAlgorithm,
        protected: bool,
    ) -> Result<Message> {
        let session_key = alg.new_session_key(rng);

        let s2k = StringToKey::new_default(rng);
        let esk = SymKeyEncryptedSessionKey::encrypt(msg_pw, &session_key, s2k, alg)?;

        let edata = self.encrypt_data(rng, alg, &session_key, protected)?;

        Ok(Message::Encrypted {
            esk: vec![Esk::SymKeyEncryptedSessionKey(esk)],
            edata,
        })
    }

    fn encrypt_data<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        alg: SymmetricKeyAlgorithm,
        session_key: &[u8],
        protected: bool,
    ) -> Result<Vec<Edata>> {
        let data = self.to_bytes()?;

        let edata = if protected {
            let encrypted = alg.encrypt_protected(rng, session_key, &data)?;
            Edata::SymEncryptedProtectedData(SymEncryptedProtectedData::from_raw(encrypted))
        } else {
            let encrypted = alg.encrypt(rng, session_key, &data)?;
            Edata::SymEncryptedData(SymEncryptedData::from_raw(encrypted))
        };

        Ok(vec![edata])
    }

    /// Decrypt the message using the given secret keys. The matching session
    /// key packet is selected by key id; a zero key id matches any key.
    pub fn decrypt(&self, key_pw: &str, keys: &[&SignedSecretKey]) -> Result<Message> {
        let Message::Encrypted { esk, edata } = self else {
            bail!("not an encrypted message");
        };

        let pkesks: Vec<_> = esk
            .iter()
            .filter_map(|esk| match esk {
                Esk::PublicKeyEncryptedSessionKey(k) => Some(k),
                _ => None,
            })
            .collect();
        ensure!(!pkesks.is_empty(), "no public key encrypted session key found");

        for key in keys {
            for pkesk in &pkesks {
                let id = pkesk.id();

                if *id == key.primary_key.key_id() {
                    return decrypt_esk(&key.primary_key, key_pw, pkesk, edata);
                }

                for subkey in &key.secret_subkeys {
                    if *id == subkey.key.key_id() {
                        return decrypt_esk(&subkey.key, key_pw, pkesk, edata);
                    }
                }

                if id.is_wildcard() {
                    // anonymous recipient: trial decryption
                    debug!("trying wildcard esk");
                    if let Ok(res) = decrypt_esk(&key.primary_key, key_pw, pkesk, edata) {
                        return Ok(res);
                    }
                    for subkey in &key.secret_subkeys {
                        if let Ok(res) = decrypt_esk(&subkey.key, key_pw, pkesk, edata) {
                            return Ok(res);
                        }
                    }
                }
            }
        }

        Err(Error::MissingKey)
    }

    /// Decrypt the message using the given passphrase.
    pub fn decrypt_with_password(&self, msg_pw: &str) -> Result<Message> {
        let Message::Encrypted { esk, edata } = self else {
            bail!("not an encrypted message");
        };

        let skesk = esk
            .iter()
            .find_map(|esk| match esk {
                Esk::SymKeyEncryptedSessionKey(k) => Some(k),
                _ => None,
            })
            .ok_or_else(|| format_err!("no password protected session key found"))?;

        let (alg, session_key) = skesk.decrypt(msg_pw)?;

        decrypt_edata(alg, &session_key, edata)
    }

    /// Check if this message is a signature that was signed with a one pass signature.
    pub fn is_one_pass_signed(&self) -> bool {
        match self {
            Message::Signed {
                one_pass_signature, ..
            } => one_pass_signature.is_some(),
            _ => false,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Message::Literal(_))
    }

    /// The literal data of this message, unpacking compressed and signed
    /// containers. `None` for encrypted messages.
    pub fn get_content(&self) -> Result<Option<Vec<u8>>> {
        match self {
            Message::Literal(literal) => Ok(Some(literal.data().to_vec())),
            Message::Compressed(data) => {
                Message::from_bytes(&data.decompress()?)?.get_content()
            }
            Message::Signed {
                message: Some(message),
                ..
            } => message.get_content(),
            Message::Signed { message: None, .. } => Ok(None),
            Message::Encrypted { .. } => Ok(None),
        }
    }

    pub fn to_armored_writer(
        &self,
        writer: &mut impl io::Write,
        headers: Option<&Headers>,
    ) -> Result<()> {
        armor::write(self, BlockType::Message, writer, headers)
    }

    pub fn to_armored_bytes(&self, headers: Option<&Headers>) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_armored_writer(&mut buf, headers)?;
        Ok(buf)
    }

    pub fn to_armored_string(&self, headers: Option<&Headers>) -> Result<String> {
        Ok(String::from_utf8(self.to_armored_bytes(headers)?).map_err(|e| e.utf8_error())?)
    }
}

/// Recover and check the session key from a PKESK with the given locked key,
/// then decrypt the data.
fn decrypt_esk<K: SecretKeyTrait>(
    locked_key: &K,
    key_pw: &str,
    pkesk: &PublicKeyEncryptedSessionKey,
    edata: &[Edata],
) -> Result<Message> {
    let decrypted = locked_key.unlock(
        || key_pw.to_string(),
        |repr| match repr {
            SecretKeyRepr::RSA(key) => rsa::decrypt(key, pkesk.mpis()),
            SecretKeyRepr::Elgamal { p, x, .. } => elgamal::decrypt(p, x, pkesk.mpis()),
            SecretKeyRepr::DSA(_) => bail!("DSA is only suitable for signatures"),
        },
    )?;

    // the plaintext is the algorithm, the session key and a checksum
    ensure!(decrypted.len() > 3, "invalid session key");
    let alg = SymmetricKeyAlgorithm::from(decrypted[0]);
    let (session_key, cksum) = decrypted[1..].split_at(decrypted.len() - 3);
    checksum::simple(cksum, session_key)?;
    ensure_eq!(
        session_key.len(),
        alg.key_size(),
        "invalid session key length"
    );

    decrypt_edata(alg, session_key, edata)
}

fn decrypt_edata(
    alg: SymmetricKeyAlgorithm,
    session_key: &[u8],
    edata: &[Edata],
) -> Result<Message> {
    ensure_eq!(edata.len(), 1, "expected exactly one encrypted data packet");

    let plaintext = match &edata[0] {
        Edata::SymEncryptedData(d) => {
            let mut ciphertext = d.data().to_vec();
            alg.decrypt(session_key, &mut ciphertext)?.to_vec()
        }
        Edata::SymEncryptedProtectedData(d) => {
            let mut ciphertext = d.data().to_vec();
            alg.decrypt_protected(session_key, &mut ciphertext)?.to_vec()
        }
    };

    Message::from_bytes(&plaintext)
}

impl Serialize for Message {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Message::Literal(literal) => write_packet(writer, literal),
            Message::Compressed(compressed) => write_packet(writer, compressed),
            Message::Signed {
                message,
                one_pass_signature,
                signature,
            } => {
                if let Some(ops) = one_pass_signature {
                    write_packet(writer, ops)?;
                }
                if let Some(message) = message {
                    message.to_writer(writer)?;
                }

                write_packet(writer, signature)
            }
            Message::Encrypted { esk, edata } => {
                for e in esk {
                    e.to_writer(writer)?;
                }
                for e in edata {
                    e.to_writer(writer)?;
                }

                Ok(())
            }
        }
    }
}
