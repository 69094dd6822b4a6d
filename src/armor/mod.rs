//! ASCII Armor boundary, RFC 4880 §6 and spec.md §4.C: detect, extract
//! and wrap binary OpenPGP packet streams inside `-----BEGIN/END PGP
//! ...-----` text framing with a Base64 body and a trailing CRC-24.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::bytes::Regex;

use crate::errors::{bail, ensure_eq, Result};

/// The armor block kinds this crate emits or recognizes (spec.md §4.C, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Message,
    PublicKey,
    PrivateKey,
    Signature,
}

impl Kind {
    fn blurb(self) -> &'static str {
        match self {
            Kind::Message => "MESSAGE",
            Kind::PublicKey => "PUBLIC KEY BLOCK",
            Kind::PrivateKey => "PRIVATE KEY BLOCK",
            Kind::Signature => "SIGNATURE",
        }
    }
}

const LINE_LEN: usize = 64;
const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;

/// RFC 4880 §6.1 CRC-24, polynomial `0x864CFB`.
fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for &byte in data {
        crc ^= (byte as u32) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// spec.md §4.C `isArmored`: true iff the input's prefix is the armor
/// start marker.
pub fn is_armored(bytes: &[u8]) -> bool {
    bytes.starts_with(b"-----BEGIN PGP ")
}

/// Rewrite every line ending to CRLF, without assuming the input uses
/// one consistently (spec.md §4.C: "newline normalization is LF→CRLF
/// before scanning").
fn normalize_line_endings(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 40);
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
            out.push(b'\r');
            out.push(b'\n');
            i += 2;
        } else if bytes[i] == b'\n' {
            out.push(b'\r');
            out.push(b'\n');
            i += 1;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// Decode one block's body: skip any armor header lines up to the first
/// blank line, concatenate the Base64 data lines, and verify the
/// trailing `=XXXX` CRC-24 line when present.
fn decode_block_body(body: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(body)?;
    let mut lines = text.split("\r\n").peekable();

    while let Some(line) = lines.peek() {
        if line.is_empty() {
            lines.next();
            break;
        }
        lines.next();
    }

    let mut b64 = String::new();
    let mut crc_line = None;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('=') {
            crc_line = Some(rest.to_string());
            continue;
        }
        b64.push_str(line);
    }

    let decoded = match STANDARD.decode(b64.as_bytes()) {
        Ok(d) => d,
        Err(e) => bail!("invalid base64 in armor body: {e}"),
    };

    if let Some(crc_text) = crc_line {
        let crc_bytes = match STANDARD.decode(crc_text.as_bytes()) {
            Ok(b) => b,
            Err(e) => bail!("invalid base64 in armor CRC-24 line: {e}"),
        };
        ensure_eq!(crc_bytes.len(), 3, "malformed CRC-24 line");
        let expected = u32::from_be_bytes([0, crc_bytes[0], crc_bytes[1], crc_bytes[2]]);
        ensure_eq!(crc24(&decoded), expected, "armor CRC-24 mismatch");
    }

    Ok(decoded)
}

/// spec.md §4.C `extractBlocks`: regex-scan for BEGIN/END marker pairs
/// and Base64-decode each body. Non-armored input passes through
/// unchanged as a single-element sequence.
pub fn extract_blocks(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    if !is_armored(bytes) {
        return Ok(vec![bytes.to_vec()]);
    }

    let normalized = normalize_line_endings(bytes);
    let begin_re = Regex::new(r"-----BEGIN PGP [A-Z0-9 ]+-----\r\n").expect("static regex");
    let end_re = Regex::new(r"-----END PGP [A-Z0-9 ]+-----\r\n").expect("static regex");

    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some(begin) = begin_re.find_at(&normalized, pos) {
        let body_start = begin.end();
        let Some(end) = end_re.find_at(&normalized, body_start) else {
            break;
        };
        blocks.push(decode_block_body(&normalized[body_start..end.start()])?);
        pos = end.end();
    }

    if blocks.is_empty() {
        bail!("armored input has no complete BEGIN/END PGP block");
    }
    Ok(blocks)
}

/// spec.md §4.C `wrap`: emit the BEGIN marker, 64-column Base64 body,
/// trailing CRC-24 line, and END marker, all CRLF-terminated.
pub fn wrap(kind: Kind, bytes: &[u8]) -> String {
    let mut out = String::new();
    out.push_str("-----BEGIN PGP ");
    out.push_str(kind.blurb());
    out.push_str("-----\r\n\r\n");

    let b64 = STANDARD.encode(bytes);
    for chunk in b64.as_bytes().chunks(LINE_LEN) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        out.push_str("\r\n");
    }

    let crc = crc24(bytes);
    let crc_bytes = [(crc >> 16) as u8, (crc >> 8) as u8, crc as u8];
    out.push('=');
    out.push_str(&STANDARD.encode(crc_bytes));
    out.push_str("\r\n");

    out.push_str("-----END PGP ");
    out.push_str(kind.blurb());
    out.push_str("-----\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_armored_detects_prefix() {
        assert!(is_armored(b"-----BEGIN PGP MESSAGE-----\r\n"));
        assert!(!is_armored(b"\xc1\x0d\x03"));
    }

    #[test]
    fn wrap_then_extract_recovers_original() {
        let data = b"Hello, World!".to_vec();
        let armored = wrap(Kind::Message, &data);
        assert!(armored.starts_with("-----BEGIN PGP MESSAGE-----\r\n"));
        assert!(armored.ends_with("-----END PGP MESSAGE-----\r\n"));

        let blocks = extract_blocks(armored.as_bytes()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0], data);
    }

    #[test]
    fn lf_only_input_is_normalized_and_parsed() {
        let data = b"some binary data".to_vec();
        let armored = wrap(Kind::Signature, &data).replace("\r\n", "\n");
        let blocks = extract_blocks(armored.as_bytes()).unwrap();
        assert_eq!(blocks[0], data);
    }

    #[test]
    fn tampered_body_fails_crc_check() {
        let data = b"tamper me please".to_vec();
        let armored = wrap(Kind::Message, &data);
        let body_start = armored.find("\r\n\r\n").unwrap() + 4;
        let mut bytes = armored.into_bytes();
        bytes[body_start] ^= 0x01;

        assert!(extract_blocks(&bytes).is_err());
    }

    #[test]
    fn non_armored_input_passes_through() {
        let data = vec![0xC1, 0x0D, 0x03, 0x00];
        let blocks = extract_blocks(&data).unwrap();
        assert_eq!(blocks, vec![data]);
    }

    #[test]
    fn multiple_blocks_are_all_returned() {
        let a = b"first".to_vec();
        let b = b"second".to_vec();
        let combined = format!("{}{}", wrap(Kind::Message, &a), wrap(Kind::Message, &b));
        let blocks = extract_blocks(combined.as_bytes()).unwrap();
        assert_eq!(blocks, vec![a, b]);
    }
}
