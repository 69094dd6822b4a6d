//! `Signature` packet, tag 2, RFC 4880 §5.2: V4 layout with hashed and
//! unhashed subpacket areas. The signed octet stream is the caller's
//! document bytes followed by the hashed-subpacket trailer and a final
//! 6-octet trailer `0x04 | 0xFF | len32`.

use std::io;

use bytes::Buf;
use byteorder::WriteBytesExt;
use num_enum::{IntoPrimitive, TryFromPrimitiveError};
use rand::{CryptoRng, RngCore};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::{self, PublicKeyAlgorithm, PublicParams};
use crate::crypto::secret_key::PlainSecretParams;
use crate::errors::{ensure, ensure_eq, Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{
    KeyId, SignatureBytes, Subpacket, SubpacketData, SubpacketPlacement,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, IntoPrimitive)]
#[repr(u8)]
pub enum SignatureType {
    Binary = 0x00,
    Text = 0x01,
    Standalone = 0x02,
    CertGeneric = 0x10,
    CertPersona = 0x11,
    CertCasual = 0x12,
    CertPositive = 0x13,
    SubkeyBinding = 0x18,
    PrimaryKeyBinding = 0x19,
    DirectKey = 0x1F,
    KeyRevocation = 0x20,
    SubkeyRevocation = 0x28,
    CertRevocation = 0x30,
    Timestamp = 0x40,
    ThirdParty = 0x50,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl From<u8> for SignatureType {
    fn from(v: u8) -> Self {
        match SignatureTypeKnown::try_from(v) {
            Ok(t) => t.into(),
            Err(TryFromPrimitiveError { number }) => SignatureType::Unknown(number),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
enum SignatureTypeKnown {
    Binary = 0x00,
    Text = 0x01,
    Standalone = 0x02,
    CertGeneric = 0x10,
    CertPersona = 0x11,
    CertCasual = 0x12,
    CertPositive = 0x13,
    SubkeyBinding = 0x18,
    PrimaryKeyBinding = 0x19,
    DirectKey = 0x1F,
    KeyRevocation = 0x20,
    SubkeyRevocation = 0x28,
    CertRevocation = 0x30,
    Timestamp = 0x40,
    ThirdParty = 0x50,
}

impl From<SignatureTypeKnown> for SignatureType {
    fn from(v: SignatureTypeKnown) -> Self {
        use SignatureTypeKnown as K;
        match v {
            K::Binary => SignatureType::Binary,
            K::Text => SignatureType::Text,
            K::Standalone => SignatureType::Standalone,
            K::CertGeneric => SignatureType::CertGeneric,
            K::CertPersona => SignatureType::CertPersona,
            K::CertCasual => SignatureType::CertCasual,
            K::CertPositive => SignatureType::CertPositive,
            K::SubkeyBinding => SignatureType::SubkeyBinding,
            K::PrimaryKeyBinding => SignatureType::PrimaryKeyBinding,
            K::DirectKey => SignatureType::DirectKey,
            K::KeyRevocation => SignatureType::KeyRevocation,
            K::SubkeyRevocation => SignatureType::SubkeyRevocation,
            K::CertRevocation => SignatureType::CertRevocation,
            K::Timestamp => SignatureType::Timestamp,
            K::ThirdParty => SignatureType::ThirdParty,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Signature {
    pub sig_type: SignatureType,
    pub pk_algorithm: PublicKeyAlgorithm,
    pub hash_algorithm: HashAlgorithm,
    pub hashed_subpackets: Vec<Subpacket>,
    pub unhashed_subpackets: Vec<Subpacket>,
    pub hash_left16: [u8; 2],
    pub signature: SignatureBytes,
}

impl Signature {
    pub fn issuer_key_id(&self) -> Option<KeyId> {
        self.hashed_subpackets
            .iter()
            .chain(self.unhashed_subpackets.iter())
            .find_map(|sp| match &sp.data {
                SubpacketData::IssuerKeyId(id) => Some(*id),
                _ => None,
            })
    }

    /// The hashed-area trailer appended after the document octets:
    /// `version(1)=4 | sigType | pkAlg | hashAlg | hashedLen(2) |
    /// hashedSubpackets`.
    fn hashed_area_trailer(&self) -> Vec<u8> {
        let mut hashed = Vec::new();
        for sp in &self.hashed_subpackets {
            sp.to_writer(&mut hashed).expect("writing to Vec never fails");
        }

        let mut out = Vec::with_capacity(6 + hashed.len());
        out.push(4);
        out.push(self.sig_type.into());
        out.push(self.pk_algorithm.into());
        out.push(self.hash_algorithm.into());
        out.extend_from_slice(&(hashed.len() as u16).to_be_bytes());
        out.extend_from_slice(&hashed);
        out
    }

    /// Assemble the full signed octet stream and hash it:
    /// `document | hashedAreaTrailer | 0x04 0xFF len32(hashedAreaTrailer)`.
    pub fn compute_digest(
        hash_algorithm: HashAlgorithm,
        sig_type: SignatureType,
        pk_algorithm: PublicKeyAlgorithm,
        hashed_subpackets: &[Subpacket],
        document: &[u8],
    ) -> Result<Vec<u8>> {
        let tmp = Signature {
            sig_type,
            pk_algorithm,
            hash_algorithm,
            hashed_subpackets: hashed_subpackets.to_vec(),
            unhashed_subpackets: Vec::new(),
            hash_left16: [0; 2],
            signature: SignatureBytes::Native(Vec::new()),
        };
        let trailer = tmp.hashed_area_trailer();

        let mut input = Vec::with_capacity(document.len() + trailer.len() + 6);
        input.extend_from_slice(document);
        input.extend_from_slice(&trailer);
        input.push(0x04);
        input.push(0xFF);
        input.extend_from_slice(&(trailer.len() as u32).to_be_bytes());

        hash_algorithm.hash(&input)
    }

    fn digest(&self, document: &[u8]) -> Result<Vec<u8>> {
        Self::compute_digest(
            self.hash_algorithm,
            self.sig_type,
            self.pk_algorithm,
            &self.hashed_subpackets,
            document,
        )
    }

    /// `sign`: hash `document` under this configuration and sign the
    /// digest with `secret`, producing a complete `Signature` packet.
    #[allow(clippy::too_many_arguments)]
    pub fn sign<R: CryptoRng + RngCore>(
        rng: R,
        secret: &PlainSecretParams,
        public: &PublicParams,
        hash_algorithm: HashAlgorithm,
        sig_type: SignatureType,
        issuer: KeyId,
        created_at: u32,
        mut hashed_subpackets: Vec<Subpacket>,
        document: &[u8],
    ) -> Result<Signature> {
        hashed_subpackets.insert(
            0,
            Subpacket::new(
                SubpacketPlacement::Hashed,
                false,
                SubpacketData::SignatureCreationTime(created_at),
            ),
        );
        hashed_subpackets.push(Subpacket::new(
            SubpacketPlacement::Hashed,
            false,
            SubpacketData::IssuerKeyId(issuer),
        ));

        let pk_algorithm = public.algorithm();
        let digest = Self::compute_digest(hash_algorithm, sig_type, pk_algorithm, &hashed_subpackets, document)?;
        let signature = crate::crypto::secret_key::sign(rng, secret, public, hash_algorithm, &digest)?;

        Ok(Signature {
            sig_type,
            pk_algorithm,
            hash_algorithm,
            hashed_subpackets,
            unhashed_subpackets: Vec::new(),
            hash_left16: [digest[0], digest[1]],
            signature,
        })
    }

    /// `pkVerify`: recompute the digest over `document` under this
    /// signature's own configuration and check it against the embedded
    /// signature, using `public`.
    pub fn verify(&self, public: &PublicParams, document: &[u8]) -> Result<()> {
        let digest = self.digest(document)?;
        ensure_eq!(
            &digest[..2],
            &self.hash_left16[..],
            "signature hash quick-check failed"
        );

        let sig_bytes: std::borrow::Cow<'_, [u8]> = match &self.signature {
            SignatureBytes::Native(b) => std::borrow::Cow::Borrowed(b),
            SignatureBytes::Mpis(mpis) => {
                let mut out = Vec::new();
                for m in mpis {
                    out.extend_from_slice(m.as_ref());
                }
                std::borrow::Cow::Owned(out)
            }
        };

        // DSA/ECDSA pack two MPIs (r, s); re-derive a fixed-width
        // concatenation for the crypto facade's DER/`(r,s)` expectations.
        match public {
            PublicParams::Dsa { .. } | PublicParams::Ecdsa { .. } => {
                let SignatureBytes::Mpis(mpis) = &self.signature else {
                    return Err(Error::InvalidSignature {
                        message: "expected MPI-encoded signature".into(),
                    });
                };
                ensure!(mpis.len() == 2, "expected exactly two signature MPIs");
                let mut packed = Vec::new();
                packed.extend_from_slice(mpis[0].as_ref());
                packed.extend_from_slice(mpis[1].as_ref());
                public_key::verify(public, self.hash_algorithm, &digest, &packed)
            }
            _ => public_key::verify(public, self.hash_algorithm, &digest, &sig_bytes),
        }
    }

    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        let version = buf.read_u8()?;
        ensure_eq!(version, 4, "only V4 signatures are supported");
        let sig_type = SignatureType::from(buf.read_u8()?);
        let pk_algorithm = PublicKeyAlgorithm::from(buf.read_u8()?);
        let hash_algorithm = HashAlgorithm::from(buf.read_u8()?);

        let hashed_len = buf.read_u16()?;
        let hashed_bytes = buf.read_take(hashed_len.into())?;
        let hashed_subpackets =
            crate::types::parse_subpackets(SubpacketPlacement::Hashed, hashed_bytes)?;

        let unhashed_len = buf.read_u16()?;
        let unhashed_bytes = buf.read_take(unhashed_len.into())?;
        let unhashed_subpackets =
            crate::types::parse_subpackets(SubpacketPlacement::Unhashed, unhashed_bytes)?;

        let hash_left16 = buf.read_array::<2>()?;

        let signature = match pk_algorithm {
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSASign | PublicKeyAlgorithm::RSAEncrypt => {
                SignatureBytes::Native(buf.rest().to_vec())
            }
            PublicKeyAlgorithm::DSA | PublicKeyAlgorithm::ECDSA => {
                let r = crate::types::mpi(&mut buf)?;
                let s = crate::types::mpi(&mut buf)?;
                SignatureBytes::Mpis(vec![r, s])
            }
            PublicKeyAlgorithm::EdDSALegacy => {
                let r = crate::types::mpi(&mut buf)?;
                let s = crate::types::mpi(&mut buf)?;
                SignatureBytes::Mpis(vec![r, s])
            }
            PublicKeyAlgorithm::Ed25519 => SignatureBytes::Native(buf.rest().to_vec()),
            other => {
                return Err(Error::Unsupported {
                    message: format!("signature algorithm {other:?}"),
                })
            }
        };

        Ok(Signature {
            sig_type,
            pk_algorithm,
            hash_algorithm,
            hashed_subpackets,
            unhashed_subpackets,
            hash_left16,
            signature,
        })
    }
}

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let mut hashed = Vec::new();
        for sp in &self.hashed_subpackets {
            sp.to_writer(&mut hashed)?;
        }
        let mut unhashed = Vec::new();
        for sp in &self.unhashed_subpackets {
            sp.to_writer(&mut unhashed)?;
        }

        writer.write_u8(4)?;
        writer.write_u8(self.sig_type.into())?;
        writer.write_u8(self.pk_algorithm.into())?;
        writer.write_u8(self.hash_algorithm.into())?;
        writer.write_all(&(hashed.len() as u16).to_be_bytes())?;
        writer.write_all(&hashed)?;
        writer.write_all(&(unhashed.len() as u16).to_be_bytes())?;
        writer.write_all(&unhashed)?;
        writer.write_all(&self.hash_left16)?;
        self.signature.to_writer(writer)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        let hashed_len: usize = self.hashed_subpackets.iter().map(|s| s.write_len()).sum();
        let unhashed_len: usize = self.unhashed_subpackets.iter().map(|s| s.write_len()).sum();
        1 + 1 + 1 + 1 + 2 + hashed_len + 2 + unhashed_len + 2 + self.signature.write_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key::EccCurve;

    #[test]
    fn ed25519_sign_and_verify_roundtrip() {
        let sk = ed25519_dalek::SigningKey::generate(&mut rand::thread_rng());
        let vk = sk.verifying_key();
        let secret = PlainSecretParams::Ed25519 {
            key: sk.to_bytes(),
        };
        let public = PublicParams::Ed25519 {
            point: vk.to_bytes(),
        };

        let document = b"hello signed world";
        let sig = Signature::sign(
            rand::thread_rng(),
            &secret,
            &public,
            HashAlgorithm::Sha512,
            SignatureType::Binary,
            KeyId::from([1, 2, 3, 4, 5, 6, 7, 8]),
            1_700_000_000,
            Vec::new(),
            document,
        )
        .unwrap();

        sig.verify(&public, document).unwrap();
        assert!(sig.verify(&public, b"tampered").is_err());

        let _ = EccCurve::Ed25519;
    }
}
