use std::fmt;
use std::io;
use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;

use crate::de::Deserialize;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, Tag, Version};

/// Compressed Data Packet
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.6>
#[derive(Clone, PartialEq, Eq)]
pub struct CompressedData {
    packet_version: Version,
    compression_algorithm: CompressionAlgorithm,
    compressed_data: Vec<u8>,
    partial: bool,
}

impl CompressedData {
    /// Compress the given bytes.
    pub fn compress(alg: CompressionAlgorithm, data: &[u8]) -> Result<Self> {
        use std::io::Write;

        let compressed_data = match alg {
            CompressionAlgorithm::Uncompressed => data.to_vec(),
            CompressionAlgorithm::ZIP => {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data)?;
                enc.finish()?
            }
            CompressionAlgorithm::ZLIB => {
                let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data)?;
                enc.finish()?
            }
            CompressionAlgorithm::BZip2 => unsupported_err!("BZip2 compression"),
            CompressionAlgorithm::Other(id) => unsupported_err!("compression algorithm {}", id),
        };

        Ok(CompressedData {
            packet_version: Default::default(),
            compression_algorithm: alg,
            compressed_data,
            partial: false,
        })
    }

    /// Inflate the contained data, up to [`crate::MAX_BUFFER_SIZE`].
    pub fn decompress(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self.compression_algorithm {
            CompressionAlgorithm::Uncompressed => out.extend_from_slice(&self.compressed_data),
            CompressionAlgorithm::ZIP => {
                DeflateDecoder::new(&self.compressed_data[..])
                    .take(crate::MAX_BUFFER_SIZE as u64)
                    .read_to_end(&mut out)?;
            }
            CompressionAlgorithm::ZLIB => {
                ZlibDecoder::new(&self.compressed_data[..])
                    .take(crate::MAX_BUFFER_SIZE as u64)
                    .read_to_end(&mut out)?;
            }
            CompressionAlgorithm::BZip2 => unsupported_err!("BZip2 compression"),
            CompressionAlgorithm::Other(id) => unsupported_err!("compression algorithm {}", id),
        }

        Ok(out)
    }

    pub fn compression_algorithm(&self) -> CompressionAlgorithm {
        self.compression_algorithm
    }

    pub fn compressed_data(&self) -> &[u8] {
        &self.compressed_data
    }

    pub fn set_partial(&mut self, partial: bool) {
        self.partial = partial;
    }
}

impl Deserialize for CompressedData {
    fn from_slice(packet_version: Version, input: &[u8]) -> Result<Self> {
        ensure!(!input.is_empty(), "invalid compressed data packet");

        Ok(CompressedData {
            packet_version,
            compression_algorithm: CompressionAlgorithm::from(input[0]),
            compressed_data: input[1..].to_vec(),
            partial: false,
        })
    }
}

impl Serialize for CompressedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.compression_algorithm.into()])?;
        writer.write_all(&self.compressed_data)?;

        Ok(())
    }
}

impl PacketTrait for CompressedData {
    fn packet_version(&self) -> Version {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::CompressedData
    }

    fn is_partial(&self) -> bool {
        self.partial
    }
}

impl fmt::Debug for CompressedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressedData")
            .field("compression_algorithm", &self.compression_algorithm)
            .field("compressed_data", &hex::encode(&self.compressed_data))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_roundtrip() {
        for alg in [
            CompressionAlgorithm::Uncompressed,
            CompressionAlgorithm::ZIP,
            CompressionAlgorithm::ZLIB,
        ] {
            let data = b"hello hello hello hello compression".to_vec();
            let packet = CompressedData::compress(alg, &data).unwrap();
            assert_eq!(packet.decompress().unwrap(), data);
        }
    }

    #[test]
    fn test_bzip2_unsupported() {
        assert!(CompressedData::compress(CompressionAlgorithm::BZip2, b"x").is_err());
    }
}
