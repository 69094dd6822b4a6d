//! Cleartext signature framework, RFC 4880 §7: a human-readable text body
//! followed by an ASCII-armored detached `Signature`, with dash-escaping
//! on any body line that would otherwise look like armor framing.
//!
//! This sits beside the binary message pipeline rather than inside it —
//! there is no encryption and no packet-framed literal body, just the
//! text plus its signature.

use rand::{CryptoRng, RngCore};

use crate::armor::{self, Kind as ArmorKind};
use crate::crypto::hash::HashAlgorithm;
use crate::errors::{Error, Result};
use crate::key::Key;
use crate::packet::signature::{Signature, SignatureType};
use crate::packet::{self, Packet};

use super::message::PassphraseFn;

/// A `-----BEGIN PGP SIGNED MESSAGE-----` block: dash-escaped text plus
/// its trailing armored `Signature` packet.
#[derive(Debug, Clone)]
pub struct CleartextSignedMessage {
    pub text: String,
    pub signature: Signature,
}

/// RFC 4880 §7.1: a line beginning with `-` (after any prior escaping) is
/// rewritten as `- -`; the signed document is the *un*-escaped text with
/// trailing whitespace on each line trimmed and line endings normalized
/// to CRLF, per §7.2's canonicalization rule for the hash.
fn canonicalize(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim_end_matches([' ', '\t']);
        out.extend_from_slice(trimmed.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Dash-escape `text` line by line, rejoining with CRLF so the rendered
/// block uses consistent armor-style line endings regardless of the
/// input's own newline convention.
fn dash_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('-') {
            out.push_str("- ");
        }
        out.push_str(line);
    }
    out
}

/// Inverse of [`dash_escape`]: split on the CRLF it rejoins with, strip
/// the escape prefix, and rejoin with a bare `\n` to recover the
/// caller's original text.
fn dash_unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split("\r\n").enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.strip_prefix("- ").unwrap_or(line));
    }
    out
}

impl CleartextSignedMessage {
    /// Sign `text` with `key`, producing the dash-escaped armored block.
    pub fn sign<R: CryptoRng + RngCore>(
        mut rng: R,
        text: &str,
        key: &Key,
        passphrase: Option<&str>,
        hash_alg: HashAlgorithm,
    ) -> Result<Self> {
        let component = key.signing_component().ok_or_else(|| Error::InvalidMessage {
            message: "key has no usable signing component".into(),
        })?;
        let secret = match &component.secret {
            None => {
                return Err(Error::InvalidMessage {
                    message: "key has no secret material".into(),
                })
            }
            Some(s) if !s.is_locked() => s.unlock("")?,
            Some(s) => match passphrase {
                None => return Err(Error::PassphraseRequired),
                Some(p) => s.unlock(p)?,
            },
        };

        let document = canonicalize(text);
        let signature = Signature::sign(
            &mut rng,
            &secret,
            &component.public.public_params,
            hash_alg,
            SignatureType::Text,
            component.key_id()?,
            chrono::Utc::now().timestamp() as u32,
            Vec::new(),
            &document,
        )?;

        Ok(CleartextSignedMessage {
            text: text.to_string(),
            signature,
        })
    }

    /// Render the full `-----BEGIN/END PGP SIGNED MESSAGE-----` block:
    /// a `Hash: <algorithm>` armor header, the dash-escaped text, and the
    /// armored detached signature.
    pub fn to_armored_string(&self) -> String {
        let hash_name = match self.signature.hash_algorithm {
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
            HashAlgorithm::Sha224 => "SHA224",
            HashAlgorithm::Sha1 => "SHA1",
            _ => "SHA512",
        };

        let mut out = String::new();
        out.push_str("-----BEGIN PGP SIGNED MESSAGE-----\r\n");
        out.push_str("Hash: ");
        out.push_str(hash_name);
        out.push_str("\r\n\r\n");
        out.push_str(&dash_escape(&self.text));
        if !self.text.ends_with('\n') {
            out.push_str("\r\n");
        }

        let sig_bytes = Packet::Signature(self.signature.clone())
            .to_bytes()
            .expect("serializing a signature never fails");
        out.push_str(&armor::wrap(ArmorKind::Signature, &sig_bytes));
        out
    }

    /// Parse a `-----BEGIN PGP SIGNED MESSAGE-----` block back into its
    /// text and signature, without checking the signature.
    pub fn from_armored_string(input: &str) -> Result<Self> {
        let start = input
            .find("-----BEGIN PGP SIGNED MESSAGE-----")
            .ok_or_else(|| Error::InvalidMessage {
                message: "missing cleartext signature header".into(),
            })?;
        let after_header = &input[start..];
        let blank_line_at = after_header
            .find("\r\n\r\n")
            .map(|i| (i, 4))
            .or_else(|| after_header.find("\n\n").map(|i| (i, 2)))
            .ok_or_else(|| Error::InvalidMessage {
                message: "missing blank line after cleartext armor headers".into(),
            })?;
        let body_start = start + blank_line_at.0 + blank_line_at.1;

        // Anchor on a line-start occurrence: a dash-escaped body line that
        // happened to look like this marker has a leading "- " escape
        // prefix, so a bare line-start match only ever fires on the real
        // trailing signature armor.
        let body = &input[body_start..];
        let marker = "-----BEGIN PGP SIGNATURE-----";
        let sig_start = if body.starts_with(marker) {
            0
        } else {
            body.find(&format!("\n{marker}"))
                .map(|i| i + 1)
                .ok_or(Error::NotSigned)?
        } + body_start;

        let escaped_text = &input[body_start..sig_start];
        let text = dash_unescape(escaped_text.trim_end_matches(['\r', '\n']));

        let blocks = armor::extract_blocks(input[sig_start..].as_bytes())?;
        let sig_packets = packet::parse_packets(&blocks[0]);
        let signature = sig_packets
            .into_iter()
            .find_map(|p| match p {
                Packet::Signature(s) => Some(s),
                _ => None,
            })
            .ok_or(Error::NotSigned)?;

        Ok(CleartextSignedMessage { text, signature })
    }

    /// Verify this message's signature against `keys`.
    pub fn verify(&self, keys: &[Key]) -> Result<bool> {
        let issuer = self.signature.issuer_key_id().ok_or_else(|| Error::InvalidSignature {
            message: "signature carries no issuer key ID".into(),
        })?;
        let key = Key::find_key(&issuer, keys).ok_or_else(|| Error::InvalidSignature {
            message: "issuer key not found".into(),
        })?;
        let public_params = key.public_params_for(&issuer).ok_or_else(|| Error::InvalidSignature {
            message: "issuer key not found".into(),
        })?;

        let document = canonicalize(&self.text);
        Ok(self.signature.verify(public_params, &document).is_ok())
    }
}

/// Re-exported so callers that never touch signing callbacks don't need
/// to name [`PassphraseFn`] from the message module directly.
pub type CleartextPassphraseFn<'a> = PassphraseFn<'a>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key::{PublicKeyAlgorithm, PublicParams};
    use crate::key::KeyComponent;
    use crate::packet::key::{PublicKeyPacket, SecretKeyMaterial, SecretKeyPacket};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn signing_key(rng: &mut ChaCha8Rng) -> Key {
        let sk = ed25519_dalek::SigningKey::generate(rng);
        let public = PublicKeyPacket::new(
            false,
            chrono::Utc::now(),
            PublicKeyAlgorithm::Ed25519,
            PublicParams::Ed25519 {
                point: sk.verifying_key().to_bytes(),
            },
        );
        let secret = SecretKeyPacket {
            is_subkey: false,
            public: public.clone(),
            material: SecretKeyMaterial::Plain(crate::packet::key::PlainSecretParamsBytes(
                sk.to_bytes().to_vec(),
            )),
        };
        Key {
            primary: KeyComponent {
                public,
                secret: Some(secret),
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        }
    }

    #[test]
    fn sign_render_parse_verify_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let key = signing_key(&mut rng);
        let public_only = Key {
            primary: KeyComponent {
                public: key.primary.public.clone(),
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };

        let msg = CleartextSignedMessage::sign(
            &mut rng,
            "- this line needs escaping\nplain line  ",
            &key,
            None,
            HashAlgorithm::Sha256,
        )
        .unwrap();

        let rendered = msg.to_armored_string();
        assert!(rendered.contains("- - this line needs escaping"));
        assert!(rendered.contains("-----BEGIN PGP SIGNATURE-----"));

        let parsed = CleartextSignedMessage::from_armored_string(&rendered).unwrap();
        assert_eq!(parsed.text, "- this line needs escaping\nplain line  ");
        assert!(parsed.verify(&[public_only]).unwrap());
    }
}
