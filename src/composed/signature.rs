use std::io;
use std::iter::Peekable;

use crate::armor::{self, BlockType, Headers};
use crate::composed::shared::Deserializable;
use crate::errors::Result;
use crate::packet::{write_packet, Packet, Signature};
use crate::ser::Serialize;
use crate::types::PublicKeyTrait;

/// A detached signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneSignature {
    pub signature: Signature,
}

impl StandaloneSignature {
    pub fn new(signature: Signature) -> Self {
        StandaloneSignature { signature }
    }

    /// Verify this signature over the given content.
    pub fn verify(&self, key: &impl PublicKeyTrait, content: &[u8]) -> Result<()> {
        self.signature.verify(key, content)
    }

    pub fn to_armored_writer(
        &self,
        writer: &mut impl io::Write,
        headers: Option<&Headers>,
    ) -> Result<()> {
        armor::write(self, BlockType::Signature, writer, headers)
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

impl Serialize for StandaloneSignature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        write_packet(writer, &self.signature)
    }
}

pub struct SignatureParser<I: Sized + Iterator<Item = Result<Packet>>> {
    source: Peekable<I>,
}

impl<I: Sized + Iterator<Item = Result<Packet>>> Iterator for SignatureParser<I> {
    type Item = Result<StandaloneSignature>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.source.next() {
            Some(Ok(packet)) => match Signature::try_from(packet) {
                Ok(signature) => Some(Ok(StandaloneSignature::new(signature))),
                Err(err) => Some(Err(err)),
            },
            Some(Err(err)) => Some(Err(err)),
            None => None,
        }
    }
}

impl Deserializable for StandaloneSignature {
    fn from_packets<'a, I: Iterator<Item = Result<Packet>> + 'a>(
        packets: Peekable<I>,
    ) -> Box<dyn Iterator<Item = Result<Self>> + 'a> {
        Box::new(SignatureParser { source: packets })
    }

    fn matches_block_type(typ: BlockType) -> bool {
        matches!(typ, BlockType::Signature)
    }
}
