//! The encrypted-session-key payload carried inside a PKESK packet body,
//! RFC 4880 §5.1 — shaped by the recipient's public-key algorithm.

use bytes::Buf;

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{unsupported_err, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

use super::Mpi;

/// Values comprising a Public-Key Encrypted Session Key, keyed by the
/// recipient's public-key algorithm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PkeskBytes {
    Rsa {
        mpi: Mpi,
    },
    Elgamal {
        first: Mpi,
        second: Mpi,
    },
    Ecdh {
        public_point: Mpi,
        encrypted_session_key: Vec<u8>,
    },
    X25519 {
        /// Ephemeral X25519 public key (32 bytes).
        ephemeral: [u8; 32],
        /// Session key wrapped under the ECDH shared secret; the
        /// unwrapped plaintext carries `symAlg | sessionKey | checksum`
        /// inline, so no separate algorithm octet travels alongside it.
        session_key: Vec<u8>,
    },
    /// Recognized algorithm identifier this crate's crypto facade does
    /// not implement (Elgamal's math, generic NIST-curve ECDH): the
    /// packet still round-trips, `pkDecrypt` on it reports
    /// `CryptoUnavailable`.
    Other {
        data: Vec<u8>,
    },
}

impl PkeskBytes {
    pub fn from_buf<B: Buf>(alg: PublicKeyAlgorithm, mut i: B) -> Result<Self> {
        match alg {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSASign | PublicKeyAlgorithm::RSAEncrypt => {
                let mpi = crate::types::mpi(&mut i)?;
                Ok(PkeskBytes::Rsa { mpi })
            }
            PublicKeyAlgorithm::Elgamal => {
                let first = crate::types::mpi(&mut i)?;
                let second = crate::types::mpi(&mut i)?;
                Ok(PkeskBytes::Elgamal { first, second })
            }
            PublicKeyAlgorithm::ECDH => {
                let public_point = crate::types::mpi(&mut i)?;
                let session_key_len = i.read_u8()?;
                let encrypted_session_key = i.read_take(session_key_len.into())?.to_vec();
                Ok(PkeskBytes::Ecdh {
                    public_point,
                    encrypted_session_key,
                })
            }
            PublicKeyAlgorithm::X25519 => {
                let ephemeral = i.read_array::<32>()?;
                let len = i.read_u8()?;
                let session_key = i.read_take(len.into())?.to_vec();
                Ok(PkeskBytes::X25519 {
                    ephemeral,
                    session_key,
                })
            }
            PublicKeyAlgorithm::Unknown(_) | PublicKeyAlgorithm::DSA | PublicKeyAlgorithm::ECDSA => {
                Ok(PkeskBytes::Other { data: i.rest().to_vec() })
            }
            other => unsupported_err!("PKESK for algorithm {:?}", other),
        }
    }
}

impl Serialize for PkeskBytes {
    fn to_writer<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PkeskBytes::Rsa { mpi } => mpi.to_writer(writer),
            PkeskBytes::Elgamal { first, second } => {
                first.to_writer(writer)?;
                second.to_writer(writer)
            }
            PkeskBytes::Ecdh {
                public_point,
                encrypted_session_key,
            } => {
                public_point.to_writer(writer)?;
                writer.write_all(&[encrypted_session_key.len() as u8])?;
                writer.write_all(encrypted_session_key)?;
                Ok(())
            }
            PkeskBytes::X25519 {
                ephemeral,
                session_key,
            } => {
                writer.write_all(ephemeral)?;
                writer.write_all(&[session_key.len() as u8])?;
                writer.write_all(session_key)?;
                Ok(())
            }
            PkeskBytes::Other { data } => writer.write_all(data).map_err(Into::into),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            PkeskBytes::Rsa { mpi } => mpi.write_len(),
            PkeskBytes::Elgamal { first, second } => first.write_len() + second.write_len(),
            PkeskBytes::Ecdh {
                public_point,
                encrypted_session_key,
            } => public_point.write_len() + 1 + encrypted_session_key.len(),
            PkeskBytes::X25519 { session_key, .. } => 32 + 1 + session_key.len(),
            PkeskBytes::Other { data } => data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_pkesk_bytes_roundtrip() {
        let orig = PkeskBytes::Rsa {
            mpi: Mpi::from_slice(&[1, 2, 3, 4]),
        };
        let bytes = orig.to_bytes().unwrap();
        let mut slice = &bytes[..];
        let parsed = PkeskBytes::from_buf(PublicKeyAlgorithm::RSA, &mut slice).unwrap();
        assert_eq!(orig, parsed);
    }

    #[test]
    fn x25519_pkesk_bytes_roundtrip_v3() {
        let orig = PkeskBytes::X25519 {
            ephemeral: [7u8; 32],
            session_key: vec![1, 2, 3, 4, 5],
        };
        let bytes = orig.to_bytes().unwrap();
        let mut slice = &bytes[..];
        let parsed = PkeskBytes::from_buf(PublicKeyAlgorithm::X25519, &mut slice).unwrap();
        assert_eq!(orig, parsed);
    }
}
