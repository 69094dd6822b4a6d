use std::io;

use bytes::{Buf, Bytes};
use byteorder::{BigEndian, WriteBytesExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::errors::{bail, ensure, unsupported_err, Error, Result};
use crate::parsing::BufParsing;

/// The closed set of packet kinds this crate understands.
///
/// Ref: <https://tools.ietf.org/html/rfc4880#section-4.3>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Tag {
    PublicKeyEncryptedSessionKey = 1,
    Signature = 2,
    SymKeyEncryptedSessionKey = 3,
    OnePassSignature = 4,
    SecretKey = 5,
    PublicKey = 6,
    SecretSubkey = 7,
    CompressedData = 8,
    SymEncryptedData = 9,
    Marker = 10,
    LiteralData = 11,
    Trust = 12,
    UserId = 13,
    PublicSubkey = 14,
    UserAttribute = 17,
    SymEncryptedProtectedData = 18,
    ModDetectionCode = 19,
}

/// Old-format vs. new-format packet header, per RFC 4880 §4.2.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum PacketHeaderVersion {
    Old,
    #[default]
    New,
}

/// The declared length of a packet body.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketLength {
    Fixed(u32),
    Indeterminate,
}

impl PacketLength {
    pub fn maybe_len(&self) -> Option<u32> {
        match self {
            PacketLength::Fixed(n) => Some(*n),
            PacketLength::Indeterminate => None,
        }
    }
}

impl From<usize> for PacketLength {
    fn from(val: usize) -> PacketLength {
        PacketLength::Fixed(val as u32)
    }
}

/// The parsed header of a packet: which form it used, its tag, and its
/// declared body length. On emit the codec picks the smallest legal new
/// format form for a freshly-built packet, and re-emits whatever form it
/// parsed for a packet that round-trips unmodified.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PacketHeader {
    version: PacketHeaderVersion,
    tag: Tag,
    len: PacketLength,
}

impl PacketHeader {
    pub fn new(version: PacketHeaderVersion, tag: Tag, len: PacketLength) -> Self {
        PacketHeader { version, tag, len }
    }

    pub fn from_parts(version: PacketHeaderVersion, tag: Tag, len: PacketLength) -> Result<Self> {
        Ok(Self::new(version, tag, len))
    }

    /// Construct a header for a freshly built packet of known fixed length,
    /// using the new packet format.
    pub fn new_fixed(tag: Tag, len: u32) -> Self {
        PacketHeader::new(PacketHeaderVersion::New, tag, PacketLength::Fixed(len))
    }

    pub fn version(&self) -> PacketHeaderVersion {
        self.version
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn packet_length(&self) -> PacketLength {
        self.len
    }

    /// Parse a packet header from the front of `buf`, advancing past it.
    ///
    /// An unset high bit on the first byte is not a packet tag at all; the
    /// pipeline resynchronizes by skipping one byte and retrying, which is
    /// how a lenient stream recovers from trailing junk.
    pub fn from_buf<B: Buf>(buf: &mut B) -> Result<Self> {
        if !buf.has_remaining() {
            bail!("unexpected end of input while reading packet header");
        }
        let tag_byte = buf.read_u8()?;
        ensure!(tag_byte & 0b1000_0000 != 0, "invalid packet tag byte");

        if tag_byte & 0b0100_0000 != 0 {
            // New format: 11TTTTTT
            let tag = Tag::try_from(tag_byte & 0b0011_1111).map_err(|_| Error::Unsupported {
                message: format!("unknown tag {}", tag_byte & 0b0011_1111),
            })?;
            let len = Self::read_new_length(buf)?;
            Ok(PacketHeader::new(PacketHeaderVersion::New, tag, len))
        } else {
            // Old format: 10TTTTLL
            let tag =
                Tag::try_from((tag_byte & 0b0011_1100) >> 2).map_err(|_| Error::Unsupported {
                    message: format!("unknown tag {}", (tag_byte & 0b0011_1100) >> 2),
                })?;
            let len_type = tag_byte & 0b0000_0011;
            let len = match len_type {
                0 => PacketLength::Fixed(buf.read_u8()?.into()),
                1 => PacketLength::Fixed(buf.read_u16()?.into()),
                2 => PacketLength::Fixed(buf.read_u32()?),
                3 => PacketLength::Indeterminate,
                _ => unreachable!(),
            };
            Ok(PacketHeader::new(PacketHeaderVersion::Old, tag, len))
        }
    }

    fn read_new_length<B: Buf>(buf: &mut B) -> Result<PacketLength> {
        let first = buf.read_u8()?;
        match first {
            0..=191 => Ok(PacketLength::Fixed(first.into())),
            192..=223 => {
                let second = buf.read_u8()?;
                let len = ((first as u32 - 192) << 8) + second as u32 + 192;
                Ok(PacketLength::Fixed(len))
            }
            255 => {
                let len = buf.read_u32()?;
                Ok(PacketLength::Fixed(len))
            }
            // Partial body lengths (224..=254) are a streaming feature this
            // crate neither produces nor needs to consume: no packet kind
            // in the closed set relies on them for a complete message.
            224..=254 => unsupported_err!("partial body lengths are not supported"),
        }
    }

    /// Read exactly the declared body and return it alongside the header.
    pub fn read_body<B: Buf>(&self, buf: &mut B) -> Result<Bytes> {
        match self.len {
            PacketLength::Fixed(n) => buf.read_take(n as usize),
            PacketLength::Indeterminate => Ok(buf.rest()),
        }
    }

    pub fn write_header<W: io::Write>(&self, writer: &mut W, len: usize) -> Result<()> {
        let tag: u8 = self.tag.into();
        match self.version {
            PacketHeaderVersion::Old => {
                if len < 256 {
                    writer.write_all(&[0b1000_0000 | (tag << 2), len as u8])?;
                } else if len < 65536 {
                    writer.write_all(&[0b1000_0001 | (tag << 2)])?;
                    writer.write_u16::<BigEndian>(len as u16)?;
                } else {
                    writer.write_all(&[0b1000_0010 | (tag << 2)])?;
                    writer.write_u32::<BigEndian>(len as u32)?;
                }
            }
            PacketHeaderVersion::New => {
                writer.write_all(&[0b1100_0000 | tag])?;
                if len < 192 {
                    writer.write_all(&[len as u8])?;
                } else if len < 8384 {
                    writer.write_all(&[
                        ((len - 192) / 256 + 192) as u8,
                        ((len - 192) % 256) as u8,
                    ])?;
                } else {
                    writer.write_all(&[255])?;
                    writer.write_u32::<BigEndian>(len as u32)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum KeyVersion {
    V2 = 2,
    V3 = 3,
    V4 = 4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn old_format_header_roundtrip() {
        let header = PacketHeader::new(PacketHeaderVersion::Old, Tag::LiteralData, 42.into());
        let mut buf = Vec::new();
        header.write_header(&mut buf, 42).unwrap();

        let mut slice = &buf[..];
        let parsed = PacketHeader::from_buf(&mut slice).unwrap();
        assert_eq!(parsed.tag(), Tag::LiteralData);
        assert_eq!(parsed.packet_length(), PacketLength::Fixed(42));
    }

    #[test]
    fn new_format_header_roundtrip_small() {
        let header = PacketHeader::new_fixed(Tag::Signature, 10);
        let mut buf = Vec::new();
        header.write_header(&mut buf, 10).unwrap();
        assert_eq!(buf, vec![0b1100_0010, 10]);
    }

    #[test]
    fn new_format_header_roundtrip_medium() {
        let mut buf = Vec::new();
        let header = PacketHeader::new_fixed(Tag::Signature, 1000);
        header.write_header(&mut buf, 1000).unwrap();

        let mut slice = &buf[..];
        let parsed = PacketHeader::from_buf(&mut slice).unwrap();
        assert_eq!(parsed.packet_length(), PacketLength::Fixed(1000));
    }

    #[test]
    fn new_format_header_roundtrip_large() {
        let mut buf = Vec::new();
        let header = PacketHeader::new_fixed(Tag::Signature, 100_000);
        header.write_header(&mut buf, 100_000).unwrap();

        let mut slice = &buf[..];
        let parsed = PacketHeader::from_buf(&mut slice).unwrap();
        assert_eq!(parsed.packet_length(), PacketLength::Fixed(100_000));
    }
}