//! `LiteralData` packet, tag 11, RFC 4880 §5.9:
//! `format | nameLen | name | time(4) | data`.

use std::io;

use bytes::Buf;
use byteorder::WriteBytesExt;
use chrono::{DateTime, TimeZone, Utc};

use crate::errors::{unsupported_err, Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LiteralDataFormat {
    Binary,
    Text,
    Utf8,
}

impl LiteralDataFormat {
    fn tag(self) -> u8 {
        match self {
            LiteralDataFormat::Binary => b'b',
            LiteralDataFormat::Text => b't',
            LiteralDataFormat::Utf8 => b'u',
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            b'b' => LiteralDataFormat::Binary,
            b't' => LiteralDataFormat::Text,
            b'u' => LiteralDataFormat::Utf8,
            // `l`/`1` (local/MIME) are legacy synonyms for text; round-trip
            // them as text rather than refusing the whole message.
            b'l' | b'1' => LiteralDataFormat::Text,
            other => unsupported_err!("literal data format {}", other as char),
        })
    }

    /// Text modes imply CRLF normalization on the signed octet stream
    /// (spec.md §3 invariant 5).
    pub fn is_text(self) -> bool {
        matches!(self, LiteralDataFormat::Text | LiteralDataFormat::Utf8)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LiteralData {
    pub format: LiteralDataFormat,
    pub file_name: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub data: Vec<u8>,
}

impl LiteralData {
    pub fn new(format: LiteralDataFormat, data: Vec<u8>, created_at: DateTime<Utc>) -> Self {
        LiteralData {
            format,
            file_name: Vec::new(),
            created_at,
            data,
        }
    }

    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        let format = LiteralDataFormat::from_tag(buf.read_u8()?)?;
        let name_len = buf.read_u8()?;
        let file_name = buf.read_take(name_len.into())?.to_vec();
        let created = buf.read_u32()?;
        let created_at = Utc
            .timestamp_opt(created as i64, 0)
            .single()
            .ok_or_else(|| Error::Message {
                message: "invalid literal data timestamp".into(),
            })?;
        let data = buf.rest().to_vec();

        Ok(LiteralData {
            format,
            file_name,
            created_at,
            data,
        })
    }

    /// The octet stream a `Signature` over this literal body hashes: the
    /// raw bytes for binary, CRLF-normalized bytes for text/utf8.
    pub fn signed_data(&self) -> Vec<u8> {
        if self.format.is_text() {
            normalize_crlf(&self.data)
        } else {
            self.data.clone()
        }
    }
}

fn normalize_crlf(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'\r' if data.get(i + 1) == Some(&b'\n') => {
                out.extend_from_slice(b"\r\n");
                i += 2;
            }
            b'\n' => {
                out.extend_from_slice(b"\r\n");
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

impl Serialize for LiteralData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.format.tag())?;
        writer.write_u8(self.file_name.len() as u8)?;
        writer.write_all(&self.file_name)?;
        writer.write_all(&(self.created_at.timestamp() as u32).to_be_bytes())?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 1 + self.file_name.len() + 4 + self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::SubsecRound;

    use super::*;

    #[test]
    fn literal_roundtrip() {
        let lit = LiteralData::new(LiteralDataFormat::Binary, b"hello".to_vec(), Utc::now());
        let lit = LiteralData {
            created_at: lit.created_at.trunc_subsecs(0),
            ..lit
        };
        let bytes = lit.to_bytes().unwrap();
        let parsed = LiteralData::from_buf(&bytes[..]).unwrap();
        assert_eq!(lit, parsed);
    }

    #[test]
    fn text_signed_data_normalizes_newlines() {
        let lit = LiteralData::new(LiteralDataFormat::Utf8, b"a\nb\r\nc".to_vec(), Utc::now());
        assert_eq!(lit.signed_data(), b"a\r\nb\r\nc");
    }
}
