//! `SymmetricallyEncryptedData` packet, tag 9, RFC 4880 §5.7: legacy CFB
//! ciphertext with no MDC. Accepted on decrypt, never emitted by choice —
//! the pipeline always prefers SEIPD (tag 18) when building a message.

use std::io;

use bytes::Buf;
use rand::{CryptoRng, RngCore};

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::ser::Serialize;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SymEncryptedData {
    pub encrypted_data: Vec<u8>,
}

impl SymEncryptedData {
    pub fn from_buf<B: Buf>(buf: B) -> Result<Self> {
        Ok(SymEncryptedData {
            encrypted_data: buf.chunk().to_vec(),
        })
    }

    pub fn encrypt<R: CryptoRng + RngCore>(
        rng: R,
        sym_alg: SymmetricKeyAlgorithm,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Self> {
        Ok(SymEncryptedData {
            encrypted_data: sym_alg.encrypt_with_prefix(rng, key, plaintext)?,
        })
    }

    pub fn decrypt(&self, sym_alg: SymmetricKeyAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
        sym_alg.decrypt_with_prefix(key, &self.encrypted_data)
    }
}

impl Serialize for SymEncryptedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encrypted_data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.encrypted_data.len()
    }
}
