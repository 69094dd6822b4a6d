//! Symmetric block-cipher facade: algorithm identifiers, key sizes, and the
//! OpenPGP variant of CFB mode (RFC 4880 §13.9) used by SED/SEIPD packets
//! and by PKESK/SKESK session-key wrapping.

use aes::{Aes128, Aes192, Aes256};
use cast5::Cast5;
use cfb_mode::{BufDecryptor, BufEncryptor};
use cipher::{BlockCipherDecrypt, BlockCipherEncrypt, KeyInit, KeyIvInit};
use des::TdesEde3;
use num_enum::{IntoPrimitive, TryFromPrimitiveError};
use rand::{CryptoRng, RngCore};
use twofish::Twofish;

use crate::errors::{unsupported_err, Result};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, IntoPrimitive)]
#[repr(u8)]
pub enum SymmetricKeyAlgorithm {
    Plaintext = 0,
    IDEA = 1,
    TripleDES = 2,
    CAST5 = 3,
    Blowfish = 4,
    AES128 = 7,
    AES192 = 8,
    AES256 = 9,
    Twofish = 10,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl From<u8> for SymmetricKeyAlgorithm {
    fn from(v: u8) -> Self {
        match SymmetricKeyAlgorithmKnown::try_from(v) {
            Ok(alg) => alg.into(),
            Err(TryFromPrimitiveError { number }) => SymmetricKeyAlgorithm::Unknown(number),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
enum SymmetricKeyAlgorithmKnown {
    Plaintext = 0,
    IDEA = 1,
    TripleDES = 2,
    CAST5 = 3,
    Blowfish = 4,
    AES128 = 7,
    AES192 = 8,
    AES256 = 9,
    Twofish = 10,
}

impl From<SymmetricKeyAlgorithmKnown> for SymmetricKeyAlgorithm {
    fn from(v: SymmetricKeyAlgorithmKnown) -> Self {
        use SymmetricKeyAlgorithmKnown as K;
        match v {
            K::Plaintext => SymmetricKeyAlgorithm::Plaintext,
            K::IDEA => SymmetricKeyAlgorithm::IDEA,
            K::TripleDES => SymmetricKeyAlgorithm::TripleDES,
            K::CAST5 => SymmetricKeyAlgorithm::CAST5,
            K::Blowfish => SymmetricKeyAlgorithm::Blowfish,
            K::AES128 => SymmetricKeyAlgorithm::AES128,
            K::AES192 => SymmetricKeyAlgorithm::AES192,
            K::AES256 => SymmetricKeyAlgorithm::AES256,
            K::Twofish => SymmetricKeyAlgorithm::Twofish,
        }
    }
}

impl SymmetricKeyAlgorithm {
    /// Session-key length in bytes, per RFC 4880 §9.2.
    pub fn key_size(&self) -> Result<usize> {
        Ok(match self {
            SymmetricKeyAlgorithm::TripleDES => 24,
            SymmetricKeyAlgorithm::CAST5 => 16,
            SymmetricKeyAlgorithm::Blowfish => 16,
            SymmetricKeyAlgorithm::AES128 => 16,
            SymmetricKeyAlgorithm::AES192 => 24,
            SymmetricKeyAlgorithm::AES256 => 32,
            SymmetricKeyAlgorithm::Twofish => 32,
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::IDEA => unsupported_err!("IDEA"),
            SymmetricKeyAlgorithm::Unknown(n) => unsupported_err!("symmetric algorithm {}", n),
        })
    }

    pub fn block_size(&self) -> Result<usize> {
        Ok(match self {
            SymmetricKeyAlgorithm::TripleDES
            | SymmetricKeyAlgorithm::CAST5
            | SymmetricKeyAlgorithm::Blowfish => 8,
            SymmetricKeyAlgorithm::AES128
            | SymmetricKeyAlgorithm::AES192
            | SymmetricKeyAlgorithm::AES256
            | SymmetricKeyAlgorithm::Twofish => 16,
            SymmetricKeyAlgorithm::Plaintext => 1,
            SymmetricKeyAlgorithm::IDEA => unsupported_err!("IDEA"),
            SymmetricKeyAlgorithm::Unknown(n) => unsupported_err!("symmetric algorithm {}", n),
        })
    }

    pub fn sample_key<R: CryptoRng + RngCore>(&self, mut rng: R) -> Result<Vec<u8>> {
        let mut key = vec![0u8; self.key_size()?];
        rng.fill_bytes(&mut key);
        Ok(key)
    }

    /// Plain (IV=0) CFB, used to wrap SEIPD/SED content: `iv` is the
    /// block-size-length initialization vector (all zero for SEIPD per
    /// RFC 4880 §5.13, since the packet prepends its own random prefix).
    pub fn cfb_encrypt(&self, key: &[u8], iv: &[u8], plaintext: &mut [u8]) -> Result<()> {
        macro_rules! run {
            ($cipher:ty) => {{
                let mut enc = BufEncryptor::<$cipher>::new_from_slices(key, iv)
                    .map_err(|e| crate::errors::Error::CryptoFailure {
                        message: e.to_string(),
                    })?;
                enc.encrypt(plaintext);
            }};
        }
        match self {
            SymmetricKeyAlgorithm::AES128 => run!(Aes128),
            SymmetricKeyAlgorithm::AES192 => run!(Aes192),
            SymmetricKeyAlgorithm::AES256 => run!(Aes256),
            SymmetricKeyAlgorithm::TripleDES => run!(TdesEde3),
            SymmetricKeyAlgorithm::CAST5 => run!(Cast5),
            SymmetricKeyAlgorithm::Twofish => run!(Twofish),
            SymmetricKeyAlgorithm::Blowfish => {
                use blowfish::Blowfish;
                run!(Blowfish)
            }
            alg => unsupported_err!("cfb encrypt for {:?}", alg),
        }
        Ok(())
    }

    pub fn cfb_decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &mut [u8]) -> Result<()> {
        macro_rules! run {
            ($cipher:ty) => {{
                let mut dec = BufDecryptor::<$cipher>::new_from_slices(key, iv)
                    .map_err(|e| crate::errors::Error::CryptoFailure {
                        message: e.to_string(),
                    })?;
                dec.decrypt(ciphertext);
            }};
        }
        match self {
            SymmetricKeyAlgorithm::AES128 => run!(Aes128),
            SymmetricKeyAlgorithm::AES192 => run!(Aes192),
            SymmetricKeyAlgorithm::AES256 => run!(Aes256),
            SymmetricKeyAlgorithm::TripleDES => run!(TdesEde3),
            SymmetricKeyAlgorithm::CAST5 => run!(Cast5),
            SymmetricKeyAlgorithm::Twofish => run!(Twofish),
            SymmetricKeyAlgorithm::Blowfish => {
                use blowfish::Blowfish;
                run!(Blowfish)
            }
            alg => unsupported_err!("cfb decrypt for {:?}", alg),
        }
        Ok(())
    }

    /// RFC 4880 §9.2 "quick check" prefix-repeat CFB used directly by SED
    /// and by the SEIPD/MDC envelope: `random(block_size) || last 2 bytes
    /// of that prefix repeated`, then the payload, all under CFB with
    /// IV = 0.
    pub fn encrypt_with_prefix<R: CryptoRng + RngCore>(
        &self,
        mut rng: R,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let bs = self.block_size()?;
        let mut prefix = vec![0u8; bs];
        rng.fill_bytes(&mut prefix);

        let mut buf = Vec::with_capacity(bs + 2 + plaintext.len());
        buf.extend_from_slice(&prefix);
        buf.extend_from_slice(&prefix[bs - 2..]);
        buf.extend_from_slice(plaintext);

        let iv = vec![0u8; bs];
        self.cfb_encrypt(key, &iv, &mut buf)?;
        Ok(buf)
    }

    /// Inverse of [`Self::encrypt_with_prefix`]; validates the 2-byte
    /// repeat "quick check" and strips the prefix, returning the payload.
    pub fn decrypt_with_prefix(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let bs = self.block_size()?;
        crate::errors::ensure!(
            ciphertext.len() >= bs + 2,
            "ciphertext shorter than prefix"
        );

        let mut buf = ciphertext.to_vec();
        let iv = vec![0u8; bs];
        self.cfb_decrypt(key, &iv, &mut buf)?;

        crate::errors::ensure_eq!(
            buf[bs - 2..bs],
            buf[bs..bs + 2],
            "CFB quick-check failed"
        );
        Ok(buf[bs + 2..].to_vec())
    }
}

/// Sum-mod-65536 checksum over session-key octets, used both by the PKESK
/// plaintext (`symAlg | sessionKey | checksum`) and by plaintext secret-key
/// MPI material (S2K usage 0).
pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, &b| acc.wrapping_add(b as u16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfb_roundtrip() {
        let alg = SymmetricKeyAlgorithm::AES128;
        let key = vec![1u8; 16];
        let iv = vec![0u8; 16];
        let mut data = b"hello world12345".to_vec();
        let orig = data.clone();
        alg.cfb_encrypt(&key, &iv, &mut data).unwrap();
        assert_ne!(data, orig);
        alg.cfb_decrypt(&key, &iv, &mut data).unwrap();
        assert_eq!(data, orig);
    }

    #[test]
    fn prefix_roundtrip() {
        let alg = SymmetricKeyAlgorithm::AES256;
        let key = alg.sample_key(rand::thread_rng()).unwrap();
        let plaintext = b"some message contents";
        let ct = alg
            .encrypt_with_prefix(rand::thread_rng(), &key, plaintext)
            .unwrap();
        let pt = alg.decrypt_with_prefix(&key, &ct).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn checksum_matches_sum_mod_65536() {
        let data = [1u8, 2, 3, 255, 255];
        let expected = (1u32 + 2 + 3 + 255 + 255) % 65536;
        assert_eq!(checksum(&data) as u32, expected);
    }
}
