//! String-to-Key specifiers, RFC 4880 §3.7: derive a symmetric key from a
//! passphrase.

use std::io;

use bytes::Buf;
use rand::{CryptoRng, RngCore};

use crate::crypto::hash::HashAlgorithm;
use crate::errors::{unsupported_err, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum StringToKey {
    Simple {
        hash_alg: HashAlgorithm,
    },
    Salted {
        hash_alg: HashAlgorithm,
        salt: [u8; 8],
    },
    IteratedAndSalted {
        hash_alg: HashAlgorithm,
        salt: [u8; 8],
        /// Already expanded from the one-octet "coded count" per §3.7.1.3.
        count: u32,
    },
}

/// Expand an RFC 4880 "coded count" byte into an octet count.
fn expand_count(c: u8) -> u32 {
    (16u32 + (c as u32 & 15)) << ((c as u32 >> 4) + 6)
}

fn compress_count(count: u32) -> u8 {
    // Smallest coded count whose expansion is >= count.
    for c in 0u8..=255 {
        if expand_count(c) >= count {
            return c;
        }
    }
    255
}

impl StringToKey {
    pub fn new_iterated<R: CryptoRng + RngCore>(
        mut rng: R,
        hash_alg: HashAlgorithm,
        count: u32,
    ) -> Self {
        let mut salt = [0u8; 8];
        rng.fill_bytes(&mut salt);
        StringToKey::IteratedAndSalted {
            hash_alg,
            salt,
            count: expand_count(compress_count(count)),
        }
    }

    pub fn from_buf<B: Buf>(buf: &mut B) -> Result<Self> {
        let typ = buf.read_u8()?;
        match typ {
            0 => {
                let hash_alg = HashAlgorithm::from(buf.read_u8()?);
                Ok(StringToKey::Simple { hash_alg })
            }
            1 => {
                let hash_alg = HashAlgorithm::from(buf.read_u8()?);
                let salt = buf.read_array::<8>()?;
                Ok(StringToKey::Salted { hash_alg, salt })
            }
            3 => {
                let hash_alg = HashAlgorithm::from(buf.read_u8()?);
                let salt = buf.read_array::<8>()?;
                let count = expand_count(buf.read_u8()?);
                Ok(StringToKey::IteratedAndSalted {
                    hash_alg,
                    salt,
                    count,
                })
            }
            n => unsupported_err!("S2K specifier type {}", n),
        }
    }

    /// Derive `key_size` bytes of key material from `passphrase`.
    ///
    /// RFC 4880 §3.7.1.1-3: repeatedly hash `salt || passphrase` (for the
    /// salted variants) while incrementing a leading octet count, slicing
    /// successive digests together until enough key material accumulates.
    pub fn derive_key(&self, passphrase: &[u8], key_size: usize) -> Result<Vec<u8>> {
        let hash_alg = match self {
            StringToKey::Simple { hash_alg }
            | StringToKey::Salted { hash_alg, .. }
            | StringToKey::IteratedAndSalted { hash_alg, .. } => *hash_alg,
        };

        let mut out = Vec::with_capacity(key_size);
        let mut context_octets: u8 = 0;
        while out.len() < key_size {
            let prefix = vec![0u8; context_octets as usize];
            let digest = match self {
                StringToKey::Simple { .. } => {
                    let mut input = prefix;
                    input.extend_from_slice(passphrase);
                    hash_alg.hash(&input)?
                }
                StringToKey::Salted { salt, .. } => {
                    let mut input = prefix;
                    input.extend_from_slice(salt);
                    input.extend_from_slice(passphrase);
                    hash_alg.hash(&input)?
                }
                StringToKey::IteratedAndSalted { salt, count, .. } => {
                    let mut unit = Vec::with_capacity(salt.len() + passphrase.len());
                    unit.extend_from_slice(salt);
                    unit.extend_from_slice(passphrase);

                    let mut input = prefix;
                    let target = (*count as usize).max(unit.len());
                    while input.len() < target + context_octets as usize {
                        let room = target + context_octets as usize - input.len();
                        input.extend_from_slice(&unit[..unit.len().min(room)]);
                    }
                    hash_alg.hash(&input)?
                }
            };
            out.extend_from_slice(&digest);
            context_octets += 1;
        }
        out.truncate(key_size);
        Ok(out)
    }
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        use byteorder::WriteBytesExt;
        match self {
            StringToKey::Simple { hash_alg } => {
                writer.write_u8(0)?;
                writer.write_u8((*hash_alg).into())?;
            }
            StringToKey::Salted { hash_alg, salt } => {
                writer.write_u8(1)?;
                writer.write_u8((*hash_alg).into())?;
                writer.write_all(salt)?;
            }
            StringToKey::IteratedAndSalted {
                hash_alg,
                salt,
                count,
            } => {
                writer.write_u8(3)?;
                writer.write_u8((*hash_alg).into())?;
                writer.write_all(salt)?;
                writer.write_u8(compress_count(*count))?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            StringToKey::Simple { .. } => 2,
            StringToKey::Salted { .. } => 10,
            StringToKey::IteratedAndSalted { .. } => 11,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_s2k_roundtrip() {
        let s2k = StringToKey::Simple {
            hash_alg: HashAlgorithm::Sha256,
        };
        let bytes = s2k.to_bytes().unwrap();
        let mut slice = &bytes[..];
        assert_eq!(StringToKey::from_buf(&mut slice).unwrap(), s2k);
    }

    #[test]
    fn iterated_salted_s2k_roundtrip() {
        let mut rng = rand::thread_rng();
        let s2k = StringToKey::new_iterated(&mut rng, HashAlgorithm::Sha1, 65536);
        let bytes = s2k.to_bytes().unwrap();
        let mut slice = &bytes[..];
        assert_eq!(StringToKey::from_buf(&mut slice).unwrap(), s2k);
    }

    #[test]
    fn derive_key_is_deterministic() {
        let s2k = StringToKey::Salted {
            hash_alg: HashAlgorithm::Sha256,
            salt: [1, 2, 3, 4, 5, 6, 7, 8],
        };
        let a = s2k.derive_key(b"hunter2", 16).unwrap();
        let b = s2k.derive_key(b"hunter2", 16).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);

        let c = s2k.derive_key(b"wrong", 16).unwrap();
        assert_ne!(a, c);
    }
}
