//! `SymmetricKeyEncryptedSessionKey` packet, tag 3, RFC 4880 §5.3:
//! `version(4) | symAlg | s2k | [encryptedSessionKey]`.
//!
//! When the optional trailing field is absent, the S2K-derived key
//! itself *is* the session key (a passphrase-only message with no
//! separate random session key).

use std::io;

use bytes::Buf;
use byteorder::WriteBytesExt;

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{ensure_eq, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::StringToKey;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SymKeyEncryptedSessionKey {
    pub version: u8,
    pub sym_algorithm: SymmetricKeyAlgorithm,
    pub s2k: StringToKey,
    /// `symAlg(1) || sessionKey`, encrypted under the S2K-derived key with
    /// CFB and a zero IV. Absent when the S2K-derived key is used directly.
    pub encrypted_session_key: Option<Vec<u8>>,
}

impl SymKeyEncryptedSessionKey {
    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        let version = buf.read_u8()?;
        ensure_eq!(version, 4, "only V4 SKESK packets are supported");
        let sym_algorithm = SymmetricKeyAlgorithm::from(buf.read_u8()?);
        let s2k = StringToKey::from_buf(&mut buf)?;
        let rest = buf.rest();
        let encrypted_session_key = if rest.is_empty() {
            None
        } else {
            Some(rest.to_vec())
        };

        Ok(SymKeyEncryptedSessionKey {
            version,
            sym_algorithm,
            s2k,
            encrypted_session_key,
        })
    }

    /// Derive the S2K key from `passphrase` and recover the session key
    /// and its symmetric algorithm, decrypting the wrapped field if present.
    pub fn decrypt_session_key(
        &self,
        passphrase: &[u8],
    ) -> Result<(SymmetricKeyAlgorithm, Vec<u8>)> {
        let derived = self.s2k.derive_key(passphrase, self.sym_algorithm.key_size()?)?;
        match &self.encrypted_session_key {
            None => Ok((self.sym_algorithm, derived)),
            Some(wrapped) => {
                let iv = vec![0u8; self.sym_algorithm.block_size()?];
                let mut plain = wrapped.clone();
                self.sym_algorithm.cfb_decrypt(&derived, &iv, &mut plain)?;
                let alg = SymmetricKeyAlgorithm::from(plain[0]);
                Ok((alg, plain[1..].to_vec()))
            }
        }
    }

    /// Encrypt `session_key` under `passphrase`, building a fresh S2K
    /// specifier. `session_sym_algorithm` is the algorithm the wrapped
    /// session key is meant to be used with.
    pub fn encrypt_session_key(
        s2k: StringToKey,
        passphrase: &[u8],
        wrap_algorithm: SymmetricKeyAlgorithm,
        session_sym_algorithm: SymmetricKeyAlgorithm,
        session_key: &[u8],
    ) -> Result<Self> {
        let derived = s2k.derive_key(passphrase, wrap_algorithm.key_size()?)?;
        let iv = vec![0u8; wrap_algorithm.block_size()?];
        let mut plain = Vec::with_capacity(1 + session_key.len());
        plain.push(session_sym_algorithm.into());
        plain.extend_from_slice(session_key);
        wrap_algorithm.cfb_encrypt(&derived, &iv, &mut plain)?;

        Ok(SymKeyEncryptedSessionKey {
            version: 4,
            sym_algorithm: wrap_algorithm,
            s2k,
            encrypted_session_key: Some(plain),
        })
    }
}

impl Serialize for SymKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version)?;
        writer.write_u8(self.sym_algorithm.into())?;
        self.s2k.to_writer(writer)?;
        if let Some(esk) = &self.encrypted_session_key {
            writer.write_all(esk)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 1
            + self.s2k.write_len()
            + self.encrypted_session_key.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    #[test]
    fn skesk_passphrase_only_roundtrip() {
        let s2k = StringToKey::Salted {
            hash_alg: HashAlgorithm::Sha256,
            salt: [1; 8],
        };
        let skesk = SymKeyEncryptedSessionKey {
            version: 4,
            sym_algorithm: SymmetricKeyAlgorithm::AES128,
            s2k,
            encrypted_session_key: None,
        };
        let bytes = skesk.to_bytes().unwrap();
        let parsed = SymKeyEncryptedSessionKey::from_buf(&bytes[..]).unwrap();
        assert_eq!(skesk, parsed);

        let (alg, key) = parsed.decrypt_session_key(b"hunter2").unwrap();
        assert_eq!(alg, SymmetricKeyAlgorithm::AES128);
        assert_eq!(key.len(), 16);
    }

    #[test]
    fn skesk_wrapped_session_key_roundtrip() {
        let s2k = StringToKey::Salted {
            hash_alg: HashAlgorithm::Sha256,
            salt: [2; 8],
        };
        let session_key = vec![7u8; 32];
        let skesk = SymKeyEncryptedSessionKey::encrypt_session_key(
            s2k,
            b"hunter2",
            SymmetricKeyAlgorithm::AES128,
            SymmetricKeyAlgorithm::AES256,
            &session_key,
        )
        .unwrap();

        let bytes = skesk.to_bytes().unwrap();
        let parsed = SymKeyEncryptedSessionKey::from_buf(&bytes[..]).unwrap();
        let (alg, key) = parsed.decrypt_session_key(b"hunter2").unwrap();
        assert_eq!(alg, SymmetricKeyAlgorithm::AES256);
        assert_eq!(key, session_key);
    }
}
