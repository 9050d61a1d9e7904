//! ASCII Armor: Base64 framing with a CRC-24 checksum.
//! Ref: <https://tools.ietf.org/html/rfc4880.html#section-6>

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{digit1, line_ending, not_line_ending};
use nom::combinator::{map, map_res, opt, value};
use nom::multi::many0;
use nom::sequence::{pair, preceded, terminated};

use crate::errors::{Error, IResult, Result};
use crate::ser::Serialize;

/// Armor headers, e.g. `Version` or `Comment`.
pub type Headers = BTreeMap<String, String>;

/// The armor block types we recognize.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BlockType {
    Message,
    PublicKey,
    PrivateKey,
    /// `PART X/Y` or, with `0` as the second value, `PART X`.
    MultiPartMessage(usize, usize),
    Signature,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Message => write!(f, "PGP MESSAGE"),
            BlockType::PublicKey => write!(f, "PGP PUBLIC KEY BLOCK"),
            BlockType::PrivateKey => write!(f, "PGP PRIVATE KEY BLOCK"),
            BlockType::MultiPartMessage(x, 0) => write!(f, "PGP MESSAGE, PART {x}"),
            BlockType::MultiPartMessage(x, y) => write!(f, "PGP MESSAGE, PART {x}/{y}"),
            BlockType::Signature => write!(f, "PGP SIGNATURE"),
        }
    }
}

fn number(i: &[u8]) -> IResult<&[u8], usize> {
    map_res(map_res(digit1, std::str::from_utf8), str::parse)(i)
}

fn armor_header_type(i: &[u8]) -> IResult<&[u8], BlockType> {
    alt((
        value(BlockType::PublicKey, tag("PGP PUBLIC KEY BLOCK")),
        value(BlockType::PrivateKey, tag("PGP PRIVATE KEY BLOCK")),
        map(
            preceded(
                tag("PGP MESSAGE, PART "),
                pair(number, opt(preceded(tag("/"), number))),
            ),
            |(x, y)| BlockType::MultiPartMessage(x, y.unwrap_or(0)),
        ),
        value(BlockType::Message, tag("PGP MESSAGE")),
        value(BlockType::Signature, tag("PGP SIGNATURE")),
    ))(i)
}

fn armor_header_line(i: &[u8]) -> IResult<&[u8], BlockType> {
    terminated(
        preceded(tag("-----BEGIN "), terminated(armor_header_type, tag("-----"))),
        line_ending,
    )(i)
}

fn armor_header(i: &[u8]) -> IResult<&[u8], (String, String)> {
    let (i, line) = terminated(not_line_ending, line_ending)(i)?;
    let line = String::from_utf8_lossy(line);

    match line.split_once(": ") {
        Some((key, value)) => Ok((i, (key.to_string(), value.to_string()))),
        None => Err(nom::Err::Error(Error::InvalidInput)),
    }
}

fn armor_headers(i: &[u8]) -> IResult<&[u8], Headers> {
    map(many0(armor_header), |headers| {
        headers.into_iter().collect()
    })(i)
}

/// Parse a complete armored block: block type, headers and the decoded,
/// checksum verified payload.
pub fn parse(input: &[u8]) -> Result<(BlockType, Headers, Vec<u8>)> {
    // skip anything before the armor starts
    let start = find_subsequence(input, b"-----BEGIN")
        .ok_or(Error::InvalidArmorWrappers)?;
    let input = &input[start..];

    let (i, typ) = armor_header_line(input).map_err(|_| Error::InvalidArmorWrappers)?;
    let (i, headers) = armor_headers(i).map_err(Error::from)?;
    let (i, _) = opt(line_ending::<_, Error>)(i).map_err(Error::from)?;

    // collect the base64 payload and optional checksum line by line
    let mut payload = String::new();
    let mut crc = None;
    let mut seen_footer = false;

    for line in i.split(|b| *b == b'\n') {
        let line = if line.ends_with(b"\r") {
            &line[..line.len() - 1]
        } else {
            line
        };

        if line.starts_with(b"-----END ") {
            let (_, footer_typ) =
                armor_header_type(&line[b"-----END ".len()..]).map_err(|_| Error::InvalidArmorWrappers)?;
            ensure_eq!(footer_typ, typ, "mismatched armor header and footer");
            seen_footer = true;
            break;
        } else if let Some(crc_line) = line.strip_prefix(b"=") {
            let decoded = STANDARD.decode(crc_line)?;
            ensure_eq!(decoded.len(), 3, "invalid crc24 length");
            crc = Some(
                (u32::from(decoded[0]) << 16) | (u32::from(decoded[1]) << 8) | u32::from(decoded[2]),
            );
        } else {
            payload.push_str(String::from_utf8_lossy(line).trim());
        }
    }

    ensure!(seen_footer, "missing armor footer");

    let data = STANDARD.decode(payload.as_bytes())?;

    if let Some(expected) = crc {
        if crc24::hash_raw(&data) != expected {
            return Err(Error::InvalidChecksum);
        }
    }

    Ok((typ, headers, data))
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Number of base64 characters per armor line.
const LINE_LENGTH: usize = 76;

/// Write the serialized form of `source` as an armored block.
pub fn write(
    source: &impl Serialize,
    typ: BlockType,
    writer: &mut impl Write,
    headers: Option<&Headers>,
) -> Result<()> {
    let bytes = source.to_bytes()?;

    // armor header
    writer.write_all(b"-----BEGIN ")?;
    write!(writer, "{typ}")?;
    writer.write_all(b"-----\n")?;

    if let Some(headers) = headers {
        for (key, value) in headers.iter() {
            write!(writer, "{key}: {value}\n")?;
        }
    }
    writer.write_all(b"\n")?;

    // base64 encoded body
    let encoded = STANDARD.encode(&bytes);
    for chunk in encoded.as_bytes().chunks(LINE_LENGTH) {
        writer.write_all(chunk)?;
        writer.write_all(b"\n")?;
    }

    // crc24 checksum
    let crc = crc24::hash_raw(&bytes);
    let crc_bytes = [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8];
    writer.write_all(b"=")?;
    writer.write_all(STANDARD.encode(crc_bytes).as_bytes())?;
    writer.write_all(b"\n")?;

    // armor footer
    writer.write_all(b"-----END ")?;
    write!(writer, "{typ}")?;
    writer.write_all(b"-----\n")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Raw(Vec<u8>);

    impl Serialize for Raw {
        fn to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
            writer.write_all(&self.0)?;
            Ok(())
        }
    }

    #[test]
    fn test_roundtrip() {
        let data: Vec<u8> = (0..255).collect();

        let mut armored = Vec::new();
        write(&Raw(data.clone()), BlockType::Message, &mut armored, None).unwrap();

        let (typ, headers, decoded) = parse(&armored).unwrap();
        assert_eq!(typ, BlockType::Message);
        assert!(headers.is_empty());
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_headers_roundtrip() {
        let mut headers = Headers::new();
        headers.insert("Version".to_string(), "opgp".to_string());
        headers.insert("Comment".to_string(), "round trip".to_string());

        let mut armored = Vec::new();
        write(
            &Raw(b"hello".to_vec()),
            BlockType::Signature,
            &mut armored,
            Some(&headers),
        )
        .unwrap();

        let (typ, got_headers, decoded) = parse(&armored).unwrap();
        assert_eq!(typ, BlockType::Signature);
        assert_eq!(got_headers, headers);
        assert_eq!(decoded, b"hello");
    }

    #[test]
    fn test_crc_mismatch() {
        let mut armored = Vec::new();
        write(&Raw(b"hello".to_vec()), BlockType::Message, &mut armored, None).unwrap();

        // flip a payload character, which must break the crc
        let mut text = String::from_utf8(armored).unwrap();
        let idx = text.find("\n\n").unwrap() + 2;
        let replacement = if &text[idx..idx + 1] == "A" { "B" } else { "A" };
        text.replace_range(idx..idx + 1, replacement);

        assert!(matches!(
            parse(text.as_bytes()),
            Err(Error::InvalidChecksum)
        ));
    }

    #[test]
    fn test_block_types() {
        for (name, typ) in [
            ("PGP MESSAGE", BlockType::Message),
            ("PGP PUBLIC KEY BLOCK", BlockType::PublicKey),
            ("PGP PRIVATE KEY BLOCK", BlockType::PrivateKey),
            ("PGP SIGNATURE", BlockType::Signature),
            ("PGP MESSAGE, PART 2/7", BlockType::MultiPartMessage(2, 7)),
            ("PGP MESSAGE, PART 9", BlockType::MultiPartMessage(9, 0)),
        ] {
            let (rest, parsed) = armor_header_type(name.as_bytes()).unwrap();
            assert!(rest.is_empty());
            assert_eq!(parsed, typ);
            assert_eq!(typ.to_string(), name);
        }
    }

    #[test]
    fn test_missing_footer() {
        let broken = "-----BEGIN PGP MESSAGE-----\n\naGVsbG8=\n";
        assert!(parse(broken.as_bytes()).is_err());
    }
}
