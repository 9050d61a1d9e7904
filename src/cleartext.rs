//! Cleartext Signature Framework
//! Ref: <https://tools.ietf.org/html/rfc4880.html#section-7>

use std::fmt;

use chrono::{SubsecRound, Utc};

use crate::composed::{Deserializable, StandaloneSignature};
use crate::crypto::hash::HashAlgorithm;
use crate::errors::Result;
use crate::packet::{SignatureConfig, SignatureType, Subpacket, SubpacketData};
use crate::types::{KeyTrait, PublicKeyTrait, SecretKeyTrait};

const HEADER_LINE: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const SIGNATURE_LINE: &str = "-----BEGIN PGP SIGNATURE-----";

/// A cleartext signed message: human readable text together with the
/// armored signature over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleartextSignedMessage {
    /// The original, unescaped text.
    text: String,
    /// The hash algorithms announced in the `Hash` headers.
    hashes: Vec<HashAlgorithm>,
    /// The signature over the normalized text.
    signature: StandaloneSignature,
}

impl CleartextSignedMessage {
    /// Sign the given text.
    pub fn sign<K>(text: &str, key: &K, key_pw: &str, hash_algorithm: HashAlgorithm) -> Result<Self>
    where
        K: SecretKeyTrait,
    {
        let mut config =
            SignatureConfig::v4(SignatureType::Text, key.algorithm(), hash_algorithm);
        config.hashed_subpackets = vec![Subpacket::regular(SubpacketData::SignatureCreationTime(
            Utc::now().trunc_subsecs(0),
        ))];
        config.unhashed_subpackets =
            vec![Subpacket::regular(SubpacketData::Issuer(key.key_id()))];

        let signature = config.sign(key, key_pw, normalize_text(text).as_bytes())?;

        Ok(CleartextSignedMessage {
            text: text.to_string(),
            hashes: vec![hash_algorithm],
            signature: StandaloneSignature::new(signature),
        })
    }

    /// Verify the signature against the normalized cleartext.
    pub fn verify(&self, key: &impl PublicKeyTrait) -> Result<()> {
        self.signature
            .verify(key, self.signed_text().as_bytes())
    }

    /// The text in the form it was signed: trailing whitespace stripped per
    /// line, lines canonicalized to CR-LF.
    pub fn signed_text(&self) -> String {
        normalize_text(&self.text)
    }

    /// The clear text of the message.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn signature(&self) -> &StandaloneSignature {
        &self.signature
    }

    /// Parse from the armored framing.
    pub fn from_string(input: &str) -> Result<Self> {
        let rest = input
            .trim_start()
            .strip_prefix(HEADER_LINE)
            .ok_or_else(|| format_err!("missing cleartext header line"))?;
        let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
            .ok_or_else(|| format_err!("missing line ending after header"))?;

        let sig_start = rest
            .find(SIGNATURE_LINE)
            .ok_or_else(|| format_err!("missing signature armor"))?;
        let (head, armored_signature) = rest.split_at(sig_start);

        // `Hash` headers, terminated by an empty line
        let mut hashes = Vec::new();
        let mut body_lines = Vec::new();
        let mut in_headers = true;

        for line in head.lines() {
            if in_headers {
                if line.trim().is_empty() {
                    in_headers = false;
                    continue;
                }

                if let Some(values) = line.strip_prefix("Hash: ") {
                    for value in values.split(',') {
                        hashes.push(value.trim().parse::<HashAlgorithm>()?);
                    }
                } else {
                    bail!("unexpected header: {:?}", line);
                }
            } else {
                // undo the dash escaping
                body_lines.push(line.strip_prefix("- ").unwrap_or(line));
            }
        }

        let text = body_lines.join("\n");

        let (signature, _) = StandaloneSignature::from_string(armored_signature)?;

        Ok(CleartextSignedMessage {
            text,
            hashes,
            signature,
        })
    }

    /// Write out the full framing, including the armored signature.
    pub fn to_armored_string(&self) -> Result<String> {
        let mut out = String::new();
        out.push_str(HEADER_LINE);
        out.push('\n');

        for hash in &self.hashes {
            out.push_str(&format!("Hash: {hash}\n"));
        }
        out.push('\n');

        // dash escaped text
        for line in self.text.lines() {
            if line.starts_with('-') {
                out.push_str("- ");
            }
            out.push_str(line);
            out.push('\n');
        }

        out.push_str(&self.signature.to_armored_string(None)?);

        Ok(out)
    }
}

impl fmt::Display for CleartextSignedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Strip trailing whitespace from every line and canonicalize the line
/// endings to CR-LF.
fn normalize_text(text: &str) -> String {
    text.lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("a \nb\t\nc"), "a\r\nb\r\nc");
        assert_eq!(normalize_text("a\r\nb"), "a\r\nb");
    }

    #[test]
    fn test_dash_escape() {
        let msg = CleartextSignedMessage {
            text: "first line\n- second\n".to_string(),
            hashes: vec![],
            signature: dummy_signature(),
        };

        let armored = msg.to_armored_string().unwrap();
        assert!(armored.contains("first line\n- - second\n"));
    }

    #[test]
    fn test_dash_unescape() {
        let framed = format!(
            "{}\nHash: SHA256\n\nfirst line\n- - second\n{}",
            HEADER_LINE,
            dummy_signature().to_armored_string(None).unwrap()
        );

        let msg = CleartextSignedMessage::from_string(&framed).unwrap();
        assert_eq!(msg.text(), "first line\n- second");
        assert_eq!(msg.hashes, vec![HashAlgorithm::SHA2_256]);
    }

    fn dummy_signature() -> StandaloneSignature {
        use crate::crypto::public_key::PublicKeyAlgorithm;
        use crate::packet::Signature;
        use crate::types::Mpi;

        let config = SignatureConfig::v4(
            SignatureType::Text,
            PublicKeyAlgorithm::RSA,
            HashAlgorithm::SHA2_256,
        );

        StandaloneSignature::new(Signature::from_config(
            config,
            [0, 0],
            vec![Mpi::from_slice(&[1, 2, 3])],
        ))
    }
}
