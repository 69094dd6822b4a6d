//! The closed packet tagged-union and its stream codec, RFC 4880 §4.3 and
//! §4.B: parse a byte stream into [`Packet`] values, re-synchronizing past
//! unrecognized tags or overrunning lengths one byte at a time, and emit
//! a `Packet` back to bytes with the smallest legal header.

pub mod compressed_data;
pub mod key;
pub mod literal_data;
pub mod marker;
pub mod mod_detection_code;
pub mod one_pass_signature;
pub mod pkesk;
pub mod signature;
pub mod skesk;
pub mod sym_encrypted_data;
pub mod sym_encrypted_protected_data;
pub mod trust;
pub mod user;

use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::ser::Serialize;
use crate::types::{PacketHeader, Tag};

pub use compressed_data::CompressedData;
pub use key::{PublicKeyPacket, SecretKeyPacket};
pub use literal_data::LiteralData;
pub use marker::Marker;
pub use mod_detection_code::ModDetectionCode;
pub use one_pass_signature::OnePassSignature;
pub use pkesk::PublicKeyEncryptedSessionKey;
pub use signature::Signature;
pub use skesk::SymKeyEncryptedSessionKey;
pub use sym_encrypted_data::SymEncryptedData;
pub use sym_encrypted_protected_data::SymEncryptedProtectedData;
pub use trust::Trust;
pub use user::{UserAttribute, UserId};

/// One packet of the closed ~15-kind RFC 4880 set, plus its parsed body.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Packet {
    PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey),
    Signature(Signature),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
    OnePassSignature(OnePassSignature),
    SecretKey(SecretKeyPacket),
    PublicKey(PublicKeyPacket),
    SecretSubkey(SecretKeyPacket),
    CompressedData(CompressedData),
    SymEncryptedData(SymEncryptedData),
    Marker(Marker),
    LiteralData(LiteralData),
    Trust(Trust),
    UserId(UserId),
    PublicSubkey(PublicKeyPacket),
    UserAttribute(UserAttribute),
    SymEncryptedProtectedData(SymEncryptedProtectedData),
    ModDetectionCode(ModDetectionCode),
}

impl Packet {
    pub fn tag(&self) -> Tag {
        match self {
            Packet::PublicKeyEncryptedSessionKey(_) => Tag::PublicKeyEncryptedSessionKey,
            Packet::Signature(_) => Tag::Signature,
            Packet::SymKeyEncryptedSessionKey(_) => Tag::SymKeyEncryptedSessionKey,
            Packet::OnePassSignature(_) => Tag::OnePassSignature,
            Packet::SecretKey(_) => Tag::SecretKey,
            Packet::PublicKey(_) => Tag::PublicKey,
            Packet::SecretSubkey(_) => Tag::SecretSubkey,
            Packet::CompressedData(_) => Tag::CompressedData,
            Packet::SymEncryptedData(_) => Tag::SymEncryptedData,
            Packet::Marker(_) => Tag::Marker,
            Packet::LiteralData(_) => Tag::LiteralData,
            Packet::Trust(_) => Tag::Trust,
            Packet::UserId(_) => Tag::UserId,
            Packet::PublicSubkey(_) => Tag::PublicSubkey,
            Packet::UserAttribute(_) => Tag::UserAttribute,
            Packet::SymEncryptedProtectedData(_) => Tag::SymEncryptedProtectedData,
            Packet::ModDetectionCode(_) => Tag::ModDetectionCode,
        }
    }

    fn from_header_and_body(header: PacketHeader, body: &[u8]) -> Result<Self> {
        Ok(match header.tag() {
            Tag::PublicKeyEncryptedSessionKey => Packet::PublicKeyEncryptedSessionKey(
                PublicKeyEncryptedSessionKey::from_buf(body)?,
            ),
            Tag::Signature => Packet::Signature(Signature::from_buf(body)?),
            Tag::SymKeyEncryptedSessionKey => {
                Packet::SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey::from_buf(body)?)
            }
            Tag::OnePassSignature => Packet::OnePassSignature(OnePassSignature::from_buf(body)?),
            Tag::SecretKey => Packet::SecretKey(SecretKeyPacket::from_buf(false, body)?),
            Tag::PublicKey => Packet::PublicKey(PublicKeyPacket::from_buf(false, body)?),
            Tag::SecretSubkey => Packet::SecretSubkey(SecretKeyPacket::from_buf(true, body)?),
            Tag::CompressedData => Packet::CompressedData(CompressedData::from_buf(body)?),
            Tag::SymEncryptedData => Packet::SymEncryptedData(SymEncryptedData::from_buf(body)?),
            Tag::Marker => Packet::Marker(Marker::from_buf(body)?),
            Tag::LiteralData => Packet::LiteralData(LiteralData::from_buf(body)?),
            Tag::Trust => Packet::Trust(Trust::from_buf(body)?),
            Tag::UserId => Packet::UserId(UserId::from_buf(body)?),
            Tag::PublicSubkey => Packet::PublicSubkey(PublicKeyPacket::from_buf(true, body)?),
            Tag::UserAttribute => Packet::UserAttribute(UserAttribute::from_buf(body)?),
            Tag::SymEncryptedProtectedData => {
                Packet::SymEncryptedProtectedData(SymEncryptedProtectedData::from_buf(body)?)
            }
            Tag::ModDetectionCode => Packet::ModDetectionCode(ModDetectionCode::from_buf(body)?),
        })
    }

    fn write_body<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Packet::PublicKeyEncryptedSessionKey(p) => p.to_writer(writer),
            Packet::Signature(p) => p.to_writer(writer),
            Packet::SymKeyEncryptedSessionKey(p) => p.to_writer(writer),
            Packet::OnePassSignature(p) => p.to_writer(writer),
            Packet::SecretKey(p) | Packet::SecretSubkey(p) => p.to_writer(writer),
            Packet::PublicKey(p) | Packet::PublicSubkey(p) => p.to_writer(writer),
            Packet::CompressedData(p) => p.to_writer(writer),
            Packet::SymEncryptedData(p) => p.to_writer(writer),
            Packet::Marker(p) => p.to_writer(writer),
            Packet::LiteralData(p) => p.to_writer(writer),
            Packet::Trust(p) => p.to_writer(writer),
            Packet::UserId(p) => p.to_writer(writer),
            Packet::UserAttribute(p) => p.to_writer(writer),
            Packet::SymEncryptedProtectedData(p) => p.to_writer(writer),
            Packet::ModDetectionCode(p) => p.to_writer(writer),
        }
    }

    fn body_len(&self) -> usize {
        let mut buf = Vec::new();
        self.write_body(&mut buf).expect("writing to a Vec never fails");
        buf.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        self.write_body(&mut body)?;
        let header = PacketHeader::new_fixed(self.tag(), body.len() as u32);
        let mut out = Vec::with_capacity(body.len() + 6);
        header.write_header(&mut out, body.len())?;
        out.extend_from_slice(&body);
        Ok(out)
    }
}

/// Parse a full packet stream, recovering from an unrecognized tag or an
/// overrunning length by advancing one byte and retrying (spec.md §4.B).
/// Unlike a single packet's `from_buf`, this never returns early on
/// garbage: it is the tolerant, top-level entry point real-world PGP
/// streams (which sometimes carry stray `Marker` bytes or trailing junk)
/// need.
pub fn parse_packets(mut data: &[u8]) -> Vec<Packet> {
    let mut out = Vec::new();
    while !data.is_empty() {
        let mut cursor = data;
        match PacketHeader::from_buf(&mut cursor) {
            Ok(header) => {
                let consumed_header = data.len() - cursor.remaining();
                match header.read_body(&mut cursor) {
                    Ok(body) => {
                        let total = consumed_header + body.len();
                        match Packet::from_header_and_body(header, &body) {
                            Ok(packet) => {
                                out.push(packet);
                                data = &data[total..];
                            }
                            Err(e) => {
                                log::warn!("failed to decode tag {:?} body, resyncing: {e}", header.tag());
                                data = &data[1..];
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("failed to read tag {:?} body, resyncing: {e}", header.tag());
                        data = &data[1..];
                    }
                }
            }
            Err(e) => {
                log::trace!("failed to read a packet header, resyncing: {e}");
                data = &data[1..];
            }
        }
    }
    out
}

/// Serialize a packet sequence back into a single byte stream.
pub fn write_packets(packets: &[Packet]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for packet in packets {
        out.extend_from_slice(&packet.to_bytes()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::literal_data::LiteralDataFormat;
    use chrono::{SubsecRound, Utc};

    #[test]
    fn literal_packet_roundtrips_through_stream() {
        let lit = LiteralData::new(
            LiteralDataFormat::Binary,
            b"hello".to_vec(),
            Utc::now().round_subsecs(0),
        );
        let packet = Packet::LiteralData(lit);
        let bytes = packet.to_bytes().unwrap();

        let parsed = parse_packets(&bytes);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0], packet);
    }

    #[test]
    fn unrecognized_tag_byte_is_skipped_and_resynced() {
        let lit = LiteralData::new(LiteralDataFormat::Binary, b"x".to_vec(), Utc::now().round_subsecs(0));
        let packet = Packet::LiteralData(lit);
        let mut bytes = vec![0xFFu8]; // not a valid tag byte framing (high bit set, tag 63 unknown)
        bytes.extend_from_slice(&packet.to_bytes().unwrap());

        let parsed = parse_packets(&bytes);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0], packet);
    }

    #[test]
    fn marker_packet_is_ignorable_prefix() {
        let mut bytes = Packet::Marker(Marker).to_bytes().unwrap();
        let lit = LiteralData::new(LiteralDataFormat::Binary, b"y".to_vec(), Utc::now().round_subsecs(0));
        let packet = Packet::LiteralData(lit);
        bytes.extend_from_slice(&packet.to_bytes().unwrap());

        let parsed = parse_packets(&bytes);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], Packet::Marker(Marker));
        assert_eq!(parsed[1], packet);
    }
}
