//! `CompressedData` packet, tag 8, RFC 4880 §5.6: `alg(1) | compressed`.
//! The compressed stream is itself a packet stream; decompression is the
//! message pipeline's job (it descends into this packet transparently),
//! this module only owns the alg byte and the codec.

use std::io::{self, Read, Write};

use bytes::Buf;
use byteorder::WriteBytesExt;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::errors::{unsupported_err, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::CompressionAlgorithm;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CompressedData {
    pub algorithm: CompressionAlgorithm,
    pub compressed_data: Vec<u8>,
}

impl CompressedData {
    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        let algorithm = CompressionAlgorithm::from(buf.read_u8()?);
        Ok(CompressedData {
            algorithm,
            compressed_data: buf.rest().to_vec(),
        })
    }

    pub fn compress(algorithm: CompressionAlgorithm, plain: &[u8]) -> Result<Self> {
        let compressed_data = match algorithm {
            CompressionAlgorithm::Uncompressed => plain.to_vec(),
            CompressionAlgorithm::ZLIB => {
                let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
                enc.write_all(plain)?;
                enc.finish()?
            }
            CompressionAlgorithm::ZIP => {
                let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(plain)?;
                enc.finish()?
            }
            #[cfg(feature = "bzip2")]
            CompressionAlgorithm::BZip2 => {
                let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                enc.write_all(plain)?;
                enc.finish()?
            }
            #[cfg(not(feature = "bzip2"))]
            CompressionAlgorithm::BZip2 => unsupported_err!("BZip2 support is not compiled in"),
            CompressionAlgorithm::Unknown(n) => unsupported_err!("compression algorithm {}", n),
        };
        Ok(CompressedData {
            algorithm,
            compressed_data,
        })
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self.algorithm {
            CompressionAlgorithm::Uncompressed => out = self.compressed_data.clone(),
            CompressionAlgorithm::ZLIB => {
                ZlibDecoder::new(&self.compressed_data[..]).read_to_end(&mut out)?;
            }
            CompressionAlgorithm::ZIP => {
                flate2::read::DeflateDecoder::new(&self.compressed_data[..]).read_to_end(&mut out)?;
            }
            #[cfg(feature = "bzip2")]
            CompressionAlgorithm::BZip2 => {
                bzip2::read::BzDecoder::new(&self.compressed_data[..]).read_to_end(&mut out)?;
            }
            #[cfg(not(feature = "bzip2"))]
            CompressionAlgorithm::BZip2 => unsupported_err!("BZip2 support is not compiled in"),
            CompressionAlgorithm::Unknown(n) => unsupported_err!("compression algorithm {}", n),
        }
        Ok(out)
    }
}

impl Serialize for CompressedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.algorithm.into())?;
        writer.write_all(&self.compressed_data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.compressed_data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_roundtrip() {
        let packet = CompressedData::compress(CompressionAlgorithm::ZLIB, b"hello world").unwrap();
        assert_eq!(packet.decompress().unwrap(), b"hello world");
    }

    #[test]
    fn uncompressed_roundtrip() {
        let packet =
            CompressedData::compress(CompressionAlgorithm::Uncompressed, b"hello world").unwrap();
        assert_eq!(packet.compressed_data, b"hello world");
        assert_eq!(packet.decompress().unwrap(), b"hello world");
    }
}
