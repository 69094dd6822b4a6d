//! `OnePassSignature` packet, tag 4, RFC 4880 §5.4:
//! `version | sigType | hashAlg | pkAlg | keyID(8) | nested(1)`.
//!
//! A signed message brackets its literal content with a one-pass-sig
//! sequence and a trailing signature sequence (LIFO): `isNested` is false
//! only on the innermost one-pass packet, the one emitted last and
//! consumed first.

use std::io;

use bytes::Buf;
use byteorder::WriteBytesExt;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::{ensure_eq, Result};
use crate::parsing::BufParsing;
use crate::packet::signature::SignatureType;
use crate::ser::Serialize;
use crate::types::KeyId;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OnePassSignature {
    pub sig_type: SignatureType,
    pub hash_algorithm: HashAlgorithm,
    pub pk_algorithm: PublicKeyAlgorithm,
    pub issuer: KeyId,
    pub is_nested: bool,
}

impl OnePassSignature {
    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        let version = buf.read_u8()?;
        ensure_eq!(version, 3, "only V3 one-pass-signature packets are supported");
        let sig_type = SignatureType::from(buf.read_u8()?);
        let hash_algorithm = HashAlgorithm::from(buf.read_u8()?);
        let pk_algorithm = PublicKeyAlgorithm::from(buf.read_u8()?);
        let issuer = KeyId::from(buf.read_array::<8>()?);
        let nested = buf.read_u8()?;

        Ok(OnePassSignature {
            sig_type,
            hash_algorithm,
            pk_algorithm,
            issuer,
            // RFC 4880 encodes "is this the last one-pass packet before the
            // literal" as a zero octet; that packet is also the *first*
            // whose matching Signature is consumed, i.e. not nested.
            is_nested: nested == 0,
        })
    }
}

impl Serialize for OnePassSignature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(3)?;
        writer.write_u8(self.sig_type.into())?;
        writer.write_u8(self.hash_algorithm.into())?;
        writer.write_u8(self.pk_algorithm.into())?;
        writer.write_all(self.issuer.as_bytes())?;
        writer.write_u8(if self.is_nested { 0 } else { 1 })?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 1 + 1 + 1 + 8 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_pass_signature_roundtrip() {
        let ops = OnePassSignature {
            sig_type: SignatureType::Binary,
            hash_algorithm: HashAlgorithm::Sha512,
            pk_algorithm: PublicKeyAlgorithm::Ed25519,
            issuer: KeyId::from([1, 2, 3, 4, 5, 6, 7, 8]),
            is_nested: false,
        };
        let bytes = ops.to_bytes().unwrap();
        let parsed = OnePassSignature::from_buf(&bytes[..]).unwrap();
        assert_eq!(ops, parsed);
    }
}
