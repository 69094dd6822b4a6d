//! Public-key facade: algorithm identifiers, public parameter storage, and
//! the `pkEncrypt`/`pkVerify` half of RFC 4880 §4.A. The matching secret
//! half (`pkDecrypt`/`pkSign`) lives in [`crate::crypto::secret_key`].

use ecdsa::signature::{Signer, Verifier};
use num_enum::{IntoPrimitive, TryFromPrimitiveError};
use rand::{CryptoRng, RngCore};
use rsa::traits::PublicKeyParts;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::{checksum, SymmetricKeyAlgorithm};
use crate::errors::{bail, ensure, unsupported_err, Result};
use crate::types::{Mpi, PkeskBytes};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, IntoPrimitive)]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    RSA = 1,
    RSAEncrypt = 2,
    RSASign = 3,
    Elgamal = 16,
    DSA = 17,
    ECDH = 18,
    ECDSA = 19,
    EdDSALegacy = 22,
    X25519 = 25,
    Ed25519 = 27,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl From<u8> for PublicKeyAlgorithm {
    fn from(v: u8) -> Self {
        match PublicKeyAlgorithmKnown::try_from(v) {
            Ok(alg) => alg.into(),
            Err(TryFromPrimitiveError { number }) => PublicKeyAlgorithm::Unknown(number),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
enum PublicKeyAlgorithmKnown {
    RSA = 1,
    RSAEncrypt = 2,
    RSASign = 3,
    Elgamal = 16,
    DSA = 17,
    ECDH = 18,
    ECDSA = 19,
    EdDSALegacy = 22,
    X25519 = 25,
    Ed25519 = 27,
}

impl From<PublicKeyAlgorithmKnown> for PublicKeyAlgorithm {
    fn from(v: PublicKeyAlgorithmKnown) -> Self {
        use PublicKeyAlgorithmKnown as K;
        match v {
            K::RSA => PublicKeyAlgorithm::RSA,
            K::RSAEncrypt => PublicKeyAlgorithm::RSAEncrypt,
            K::RSASign => PublicKeyAlgorithm::RSASign,
            K::Elgamal => PublicKeyAlgorithm::Elgamal,
            K::DSA => PublicKeyAlgorithm::DSA,
            K::ECDH => PublicKeyAlgorithm::ECDH,
            K::ECDSA => PublicKeyAlgorithm::ECDSA,
            K::EdDSALegacy => PublicKeyAlgorithm::EdDSALegacy,
            K::X25519 => PublicKeyAlgorithm::X25519,
            K::Ed25519 => PublicKeyAlgorithm::Ed25519,
        }
    }
}

impl PublicKeyAlgorithm {
    pub fn can_encrypt(&self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA
                | PublicKeyAlgorithm::RSAEncrypt
                | PublicKeyAlgorithm::Elgamal
                | PublicKeyAlgorithm::ECDH
                | PublicKeyAlgorithm::X25519
        )
    }

    pub fn can_sign(&self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA
                | PublicKeyAlgorithm::RSASign
                | PublicKeyAlgorithm::DSA
                | PublicKeyAlgorithm::ECDSA
                | PublicKeyAlgorithm::EdDSALegacy
                | PublicKeyAlgorithm::Ed25519
        )
    }
}

/// The named curve backing an ECDSA/EdDSA/ECDH key. RFC 4880 §9.2 (as
/// amended by the ECC extensions) identifies a curve by OID; this crate
/// only ever constructs or consumes the three curves its crypto facade
/// actually backs with real code.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EccCurve {
    NistP256,
    Ed25519,
    Curve25519,
}

impl EccCurve {
    /// RFC 4880 §9.2 curve OIDs, DER-encoded (without the 0x06 tag/length
    /// that the MPI-style "OID octet string" framing of the public-key
    /// body adds around them).
    pub fn oid(&self) -> &'static [u8] {
        match self {
            EccCurve::NistP256 => &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07],
            EccCurve::Ed25519 => &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01],
            EccCurve::Curve25519 => &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01],
        }
    }

    pub fn from_oid(oid: &[u8]) -> Result<Self> {
        for c in [EccCurve::NistP256, EccCurve::Ed25519, EccCurve::Curve25519] {
            if c.oid() == oid {
                return Ok(c);
            }
        }
        unsupported_err!("unknown curve OID {}", hex::encode(oid))
    }
}

/// Public key material, keyed by algorithm. Everything a signature
/// verification or an encryption-to-this-key needs, and nothing more.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PublicParams {
    Rsa {
        n: Mpi,
        e: Mpi,
    },
    Dsa {
        p: Mpi,
        q: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Elgamal {
        p: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Ecdsa {
        curve: EccCurve,
        point: Mpi,
    },
    EdDsaLegacy {
        curve: EccCurve,
        point: Mpi,
    },
    Ed25519 {
        point: [u8; 32],
    },
    Ecdh {
        curve: EccCurve,
        point: Mpi,
        hash: HashAlgorithm,
        sym: SymmetricKeyAlgorithm,
    },
    X25519 {
        point: [u8; 32],
    },
}

impl PublicParams {
    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        match self {
            PublicParams::Rsa { .. } => PublicKeyAlgorithm::RSA,
            PublicParams::Dsa { .. } => PublicKeyAlgorithm::DSA,
            PublicParams::Elgamal { .. } => PublicKeyAlgorithm::Elgamal,
            PublicParams::Ecdsa { .. } => PublicKeyAlgorithm::ECDSA,
            PublicParams::EdDsaLegacy { .. } => PublicKeyAlgorithm::EdDSALegacy,
            PublicParams::Ed25519 { .. } => PublicKeyAlgorithm::Ed25519,
            PublicParams::Ecdh { .. } => PublicKeyAlgorithm::ECDH,
            PublicParams::X25519 { .. } => PublicKeyAlgorithm::X25519,
        }
    }
}

/// `pkEncrypt`: wrap `plain` (the `symAlg | sessionKey | checksum` octets,
/// already assembled by the caller) under this recipient's public key,
/// producing the ESK payload a PKESK packet carries.
pub fn encrypt<R: CryptoRng + RngCore>(
    mut rng: R,
    params: &PublicParams,
    plain: &[u8],
) -> Result<PkeskBytes> {
    match params {
        PublicParams::Rsa { n, e } => {
            let key = rsa_public_key(n, e)?;
            let ct = key
                .encrypt(&mut rng, rsa::Pkcs1v15Encrypt, plain)
                .map_err(|e| crate::errors::Error::CryptoFailure {
                    message: e.to_string(),
                })?;
            Ok(PkeskBytes::Rsa {
                mpi: Mpi::from_slice(&ct),
            })
        }
        PublicParams::X25519 { point } => {
            let eph = x25519_dalek::EphemeralSecret::random_from_rng(&mut rng);
            let eph_pub = x25519_dalek::PublicKey::from(&eph);
            let shared = eph.diffie_hellman(&x25519_dalek::PublicKey::from(*point));
            let wrap_key = HashAlgorithm::Sha256.hash(shared.as_bytes())?;
            let sym = SymmetricKeyAlgorithm::AES128;
            let iv = vec![0u8; sym.block_size()?];
            let mut wrapped = plain.to_vec();
            sym.cfb_encrypt(&wrap_key, &iv, &mut wrapped)?;
            Ok(PkeskBytes::X25519 {
                ephemeral: *eph_pub.as_bytes(),
                session_key: wrapped,
            })
        }
        PublicParams::Ecdh { .. } => {
            unsupported_err!("ECDH over NIST curves is not implemented")
        }
        PublicParams::Elgamal { .. } => {
            unsupported_err!("Elgamal encryption is not implemented")
        }
        params => bail!("{:?} cannot encrypt", params.algorithm()),
    }
}

/// `pkVerify`: check `sig` against `digest` (the already-hashed document)
/// using this public key.
pub fn verify(params: &PublicParams, hash_alg: HashAlgorithm, digest: &[u8], sig: &[u8]) -> Result<()> {
    match params {
        PublicParams::Rsa { n, e } => {
            let key = rsa_public_key(n, e)?;
            rsa_pkcs1v15_verify(&key, hash_alg, digest, sig)
        }
        PublicParams::Dsa { p, q, g, y } => {
            let vk = dsa_verifying_key(p, q, g, y)?;
            let signature = dsa::Signature::try_from(sig).map_err(|e| {
                crate::errors::Error::InvalidSignature {
                    message: e.to_string(),
                }
            })?;
            vk.verify(digest, &signature)
                .map_err(|_| crate::errors::Error::InvalidSignature {
                    message: "DSA signature did not verify".into(),
                })
        }
        PublicParams::Ecdsa {
            curve: EccCurve::NistP256,
            point,
        } => {
            let vk = p256::ecdsa::VerifyingKey::from_sec1_bytes(point.as_ref()).map_err(|e| {
                crate::errors::Error::InvalidSignature {
                    message: e.to_string(),
                }
            })?;
            let signature = p256::ecdsa::Signature::from_der(sig)
                .or_else(|_| p256::ecdsa::Signature::try_from(sig))
                .map_err(|e| crate::errors::Error::InvalidSignature {
                    message: e.to_string(),
                })?;
            vk.verify(digest, &signature)
                .map_err(|_| crate::errors::Error::InvalidSignature {
                    message: "ECDSA signature did not verify".into(),
                })
        }
        PublicParams::Ed25519 { point } => {
            let vk = ed25519_dalek::VerifyingKey::from_bytes(point).map_err(|e| {
                crate::errors::Error::InvalidSignature {
                    message: e.to_string(),
                }
            })?;
            let signature = ed25519_dalek::Signature::from_slice(sig).map_err(|e| {
                crate::errors::Error::InvalidSignature {
                    message: e.to_string(),
                }
            })?;
            vk.verify(digest, &signature)
                .map_err(|_| crate::errors::Error::InvalidSignature {
                    message: "Ed25519 signature did not verify".into(),
                })
        }
        params => bail!("{:?} cannot verify", params.algorithm()),
    }
}

pub(crate) fn rsa_public_key(n: &Mpi, e: &Mpi) -> Result<rsa::RsaPublicKey> {
    let n = rsa::BigUint::from_bytes_be(n.as_ref());
    let e = rsa::BigUint::from_bytes_be(e.as_ref());
    rsa::RsaPublicKey::new(n, e).map_err(|e| crate::errors::Error::CryptoFailure {
        message: e.to_string(),
    })
}

pub(crate) fn dsa_verifying_key(p: &Mpi, q: &Mpi, g: &Mpi, y: &Mpi) -> Result<dsa::VerifyingKey> {
    let components = dsa::Components::from_components(
        rsa::BigUint::from_bytes_be(p.as_ref()),
        rsa::BigUint::from_bytes_be(q.as_ref()),
        rsa::BigUint::from_bytes_be(g.as_ref()),
    )
    .map_err(|e| crate::errors::Error::CryptoFailure {
        message: e.to_string(),
    })?;
    dsa::VerifyingKey::from_components(components, rsa::BigUint::from_bytes_be(y.as_ref()))
        .map_err(|e| crate::errors::Error::CryptoFailure {
            message: e.to_string(),
        })
}

/// RSA signature verification uses `EMSA-PKCS1-v1_5` directly over the
/// document digest (classic PGP RSA signing, RFC 4880 §5.2.2), so we build
/// the padding manually per hash algorithm rather than going through
/// `rsa`'s `pkcs1v15::VerifyingKey<D>` (which expects to hash the message
/// itself).
fn rsa_pkcs1v15_verify(
    key: &rsa::RsaPublicKey,
    hash_alg: HashAlgorithm,
    digest: &[u8],
    sig: &[u8],
) -> Result<()> {
    ensure!(sig.len() == key.size(), "RSA signature length mismatch");
    let scheme = rsa_pkcs1v15_scheme(hash_alg)?;
    key.verify(scheme, digest, sig)
        .map_err(|_| crate::errors::Error::InvalidSignature {
            message: "RSA signature did not verify".into(),
        })
}

pub(crate) fn rsa_pkcs1v15_scheme(hash_alg: HashAlgorithm) -> Result<rsa::Pkcs1v15Sign> {
    Ok(match hash_alg {
        HashAlgorithm::Sha1 => rsa::Pkcs1v15Sign::new::<sha1::Sha1>(),
        HashAlgorithm::Sha256 => rsa::Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => rsa::Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => rsa::Pkcs1v15Sign::new::<sha2::Sha512>(),
        HashAlgorithm::Sha224 => rsa::Pkcs1v15Sign::new::<sha2::Sha224>(),
        alg => unsupported_err!("RSA signatures with {:?}", alg),
    })
}

/// Recover the shared secret side of an X25519 PKESK: given the sender's
/// ephemeral public point and our secret scalar, derive the wrap key and
/// unwrap the `symAlg | sessionKey | checksum` plaintext.
pub(crate) fn x25519_unwrap(
    secret: &x25519_dalek::StaticSecret,
    ephemeral: &[u8; 32],
    wrapped: &[u8],
) -> Result<Vec<u8>> {
    let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(*ephemeral));
    let wrap_key = HashAlgorithm::Sha256.hash(shared.as_bytes())?;
    let sym = SymmetricKeyAlgorithm::AES128;
    let iv = vec![0u8; sym.block_size()?];
    let mut plain = wrapped.to_vec();
    sym.cfb_decrypt(&wrap_key, &iv, &mut plain)?;
    Ok(plain)
}

/// Recompute and check the session-key checksum embedded in a PKESK
/// plaintext, splitting it into `(symAlg, sessionKey)`.
pub fn split_session_key(plain: &[u8]) -> Result<(SymmetricKeyAlgorithm, Vec<u8>)> {
    ensure!(plain.len() >= 3, "PKESK plaintext too short");
    let sym_alg = SymmetricKeyAlgorithm::from(plain[0]);
    let key = &plain[1..plain.len() - 2];
    let expected = u16::from_be_bytes([plain[plain.len() - 2], plain[plain.len() - 1]]);
    ensure!(
        checksum(key) == expected,
        "PKESK session-key checksum mismatch"
    );
    Ok((sym_alg, key.to_vec()))
}
