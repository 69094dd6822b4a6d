//! `SymmetricallyEncryptedIntegrityProtectedData` packet, tag 18, RFC 4880
//! §5.13: `version=1 | CFB(randomPrefix(blockSize) | repeat2 | inner |
//! MDC packet)`. The MDC packet (tag 19) carries SHA-1 over the prefix
//! and inner-packet bytes, not including the MDC packet's own header.
//!
//! This is the recommended ciphertext envelope (spec.md §1): the message
//! pipeline always emits this, never the legacy SED packet.

use std::io;

use bytes::Buf;
use byteorder::WriteBytesExt;
use digest::Digest;
use rand::{CryptoRng, RngCore};
use sha1_checked::Sha1;

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{ensure, ensure_eq, Result};
use crate::packet::mod_detection_code::ModDetectionCode;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// The 3-octet MDC packet header (tag 19, new-format, fixed 20-byte
/// body), fixed because the MDC body length never varies.
const MDC_HEADER: [u8; 2] = [0xD3, 0x14];

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SymEncryptedProtectedData {
    pub encrypted_data: Vec<u8>,
}

impl SymEncryptedProtectedData {
    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        let version = buf.read_u8()?;
        ensure_eq!(version, 1, "only V1 SEIPD packets are supported");
        Ok(SymEncryptedProtectedData {
            encrypted_data: buf.rest().to_vec(),
        })
    }

    /// Encrypt `inner_packets` (the already-serialized inner packet
    /// stream: one-pass-sig/literal/signature, or compressed data) under
    /// `key`, appending a fresh MDC packet before sealing the envelope.
    pub fn encrypt<R: CryptoRng + RngCore>(
        mut rng: R,
        sym_alg: SymmetricKeyAlgorithm,
        key: &[u8],
        inner_packets: &[u8],
    ) -> Result<Self> {
        let bs = sym_alg.block_size()?;
        let mut prefix = vec![0u8; bs];
        rng.fill_bytes(&mut prefix);

        let mut plain = Vec::with_capacity(bs + 2 + inner_packets.len() + 22);
        plain.extend_from_slice(&prefix);
        plain.extend_from_slice(&prefix[bs - 2..]);
        plain.extend_from_slice(inner_packets);

        let mdc_hash = mdc_digest(&plain);
        plain.extend_from_slice(&MDC_HEADER);
        plain.extend_from_slice(&mdc_hash);

        let iv = vec![0u8; bs];
        let mut ciphertext = plain;
        sym_alg.cfb_encrypt(key, &iv, &mut ciphertext)?;

        Ok(SymEncryptedProtectedData {
            encrypted_data: ciphertext,
        })
    }

    /// Decrypt and validate the MDC, returning the inner packet stream
    /// bytes. A mismatched or absent MDC is a fatal, non-retryable error
    /// (spec.md §3 invariant 2, §7): the pipeline must never return
    /// partial plaintext on failure.
    pub fn decrypt(&self, sym_alg: SymmetricKeyAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
        let bs = sym_alg.block_size()?;
        ensure!(
            self.encrypted_data.len() >= bs + 2 + 22,
            "SEIPD packet too short to contain prefix and MDC"
        );

        let iv = vec![0u8; bs];
        let mut plain = self.encrypted_data.clone();
        sym_alg.cfb_decrypt(key, &iv, &mut plain)?;

        ensure_eq!(
            plain[bs - 2..bs],
            plain[bs..bs + 2],
            "CFB quick-check failed"
        );

        let (content, mdc_packet) = plain.split_at(plain.len() - 22);
        ensure_eq!(
            mdc_packet[..2],
            MDC_HEADER,
            "missing or malformed MDC packet header"
        );
        let mdc = ModDetectionCode::from_buf(&mdc_packet[2..])?;

        let expected = mdc_digest(content);
        if expected != mdc.hash {
            return Err(crate::errors::Error::IntegrityCheckFailed);
        }

        Ok(content[bs + 2..].to_vec())
    }
}

fn mdc_digest(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::<sha1_checked::DetectionOnly>::new();
    hasher.update(data);
    hasher.update([0xD3, 0x14]);
    let digest = hasher.finalize();
    digest.as_ref().try_into().expect("SHA-1 is 20 bytes")
}

impl Serialize for SymEncryptedProtectedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(1)?;
        writer.write_all(&self.encrypted_data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.encrypted_data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seipd_roundtrip() {
        let alg = SymmetricKeyAlgorithm::AES128;
        let key = alg.sample_key(rand::thread_rng()).unwrap();
        let inner = b"one-pass|literal|signature bytes go here";

        let seipd = SymEncryptedProtectedData::encrypt(rand::thread_rng(), alg, &key, inner).unwrap();
        let decrypted = seipd.decrypt(alg, &key).unwrap();
        assert_eq!(decrypted, inner);
    }

    #[test]
    fn tampered_ciphertext_fails_integrity_check() {
        let alg = SymmetricKeyAlgorithm::AES128;
        let key = alg.sample_key(rand::thread_rng()).unwrap();
        let inner = b"content";

        let mut seipd = SymEncryptedProtectedData::encrypt(rand::thread_rng(), alg, &key, inner).unwrap();
        let last = seipd.encrypted_data.len() - 1;
        seipd.encrypted_data[last] ^= 0xFF;

        let err = seipd.decrypt(alg, &key).unwrap_err();
        assert!(matches!(err, crate::errors::Error::IntegrityCheckFailed));
    }
}
