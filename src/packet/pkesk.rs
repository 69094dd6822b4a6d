//! `PublicKeyEncryptedSessionKey` packet, tag 1, RFC 4880 §5.1:
//! `version(3) | keyID(8) | pkAlg | encryptedSessionKeyBytes`.

use std::io;

use bytes::Buf;
use byteorder::WriteBytesExt;

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{ensure_eq, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, PkeskBytes};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublicKeyEncryptedSessionKey {
    pub version: u8,
    pub recipient: KeyId,
    pub algorithm: PublicKeyAlgorithm,
    pub esk: PkeskBytes,
}

impl PublicKeyEncryptedSessionKey {
    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        let version = buf.read_u8()?;
        ensure_eq!(version, 3, "only V3 PKESK packets are supported");
        let recipient = KeyId::from(buf.read_array::<8>()?);
        let algorithm = PublicKeyAlgorithm::from(buf.read_u8()?);
        let esk = PkeskBytes::from_buf(algorithm, &mut buf)?;

        Ok(PublicKeyEncryptedSessionKey {
            version,
            recipient,
            algorithm,
            esk,
        })
    }
}

impl Serialize for PublicKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version)?;
        writer.write_all(self.recipient.as_bytes())?;
        writer.write_u8(self.algorithm.into())?;
        self.esk.to_writer(writer)
    }

    fn write_len(&self) -> usize {
        1 + 8 + 1 + self.esk.write_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mpi;

    #[test]
    fn pkesk_roundtrip() {
        let pkesk = PublicKeyEncryptedSessionKey {
            version: 3,
            recipient: KeyId::from([1, 2, 3, 4, 5, 6, 7, 8]),
            algorithm: PublicKeyAlgorithm::RSA,
            esk: PkeskBytes::Rsa {
                mpi: Mpi::from_slice(&[9, 9, 9]),
            },
        };
        let bytes = pkesk.to_bytes().unwrap();
        let parsed = PublicKeyEncryptedSessionKey::from_buf(&bytes[..]).unwrap();
        assert_eq!(pkesk, parsed);
    }
}
