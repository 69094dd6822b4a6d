//! Secret-key facade: `pkDecrypt`/`pkSign`, the half of RFC 4880 §4.A that
//! needs unlocked private parameters. Kept separate from
//! [`crate::crypto::public_key`] so the zeroizing secret material never
//! has to travel through a module whose job is verifying other people's
//! signatures.

use ecdsa::signature::{Signer as _, Verifier as _};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::{self, EccCurve, PublicParams};
use crate::errors::{bail, unsupported_err, Result};
use crate::types::{Mpi, PkeskBytes, SignatureBytes};

/// Unlocked secret key material, one variant per [`PublicParams`] shape.
/// Zeroized on drop; never cloned into a longer-lived value than the
/// decrypt/sign call that needs it.
#[derive(Debug, zeroize::ZeroizeOnDrop)]
pub enum PlainSecretParams {
    Rsa {
        #[zeroize(skip)]
        d: Mpi,
        #[zeroize(skip)]
        p: Mpi,
        #[zeroize(skip)]
        q: Mpi,
    },
    Dsa {
        #[zeroize(skip)]
        x: Mpi,
    },
    Elgamal {
        #[zeroize(skip)]
        x: Mpi,
    },
    Ecdsa {
        #[zeroize(skip)]
        x: Mpi,
    },
    EdDsaLegacy {
        #[zeroize(skip)]
        x: Mpi,
    },
    Ed25519 {
        key: [u8; 32],
    },
    Ecdh {
        #[zeroize(skip)]
        x: Mpi,
    },
    X25519 {
        key: [u8; 32],
    },
}

/// `pkDecrypt`: recover the `symAlg | sessionKey | checksum` plaintext
/// that a PKESK addressed to this key carries.
pub fn decrypt(secret: &PlainSecretParams, esk: &PkeskBytes) -> Result<Vec<u8>> {
    match (secret, esk) {
        (PlainSecretParams::Rsa { d, p, q }, PkeskBytes::Rsa { mpi }) => {
            let key = rsa_private_key(d, p, q)?;
            let plain = key
                .decrypt(rsa::Pkcs1v15Encrypt, mpi.as_ref())
                .map_err(|e| crate::errors::Error::CryptoFailure {
                    message: e.to_string(),
                })?;
            Ok(plain)
        }
        (
            PlainSecretParams::X25519 { key },
            PkeskBytes::X25519 {
                ephemeral,
                session_key,
                ..
            },
        ) => {
            let secret = x25519_dalek::StaticSecret::from(*key);
            public_key::x25519_unwrap(&secret, ephemeral, session_key)
        }
        (PlainSecretParams::Ecdh { .. }, PkeskBytes::Ecdh { .. }) => {
            unsupported_err!("ECDH over NIST curves is not implemented")
        }
        (PlainSecretParams::Elgamal { .. }, PkeskBytes::Elgamal { .. }) => {
            unsupported_err!("Elgamal decryption is not implemented")
        }
        _ => bail!("PKESK algorithm does not match secret key"),
    }
}

/// `pkSign`: sign `digest` (the already-hashed document, per `hash_alg`)
/// with this secret key, returning the raw signature octets ready to be
/// packed into a `Signature` packet's MPI or native sig field.
pub fn sign<R: CryptoRng + RngCore>(
    mut rng: R,
    secret: &PlainSecretParams,
    public: &PublicParams,
    hash_alg: HashAlgorithm,
    digest: &[u8],
) -> Result<SignatureBytes> {
    match (secret, public) {
        (PlainSecretParams::Rsa { d, p, q }, PublicParams::Rsa { n, e }) => {
            let key = rsa_private_key_with_public(d, p, q, n, e)?;
            let scheme = public_key::rsa_pkcs1v15_scheme(hash_alg)?;
            let sig = key
                .sign(scheme, digest)
                .map_err(|e| crate::errors::Error::CryptoFailure {
                    message: e.to_string(),
                })?;
            Ok(SignatureBytes::Native(sig))
        }
        (PlainSecretParams::Dsa { x }, PublicParams::Dsa { p, q, g, y }) => {
            let sk = dsa_signing_key(p, q, g, y, x)?;
            let sig: dsa::Signature = sk
                .try_sign(digest)
                .map_err(|e| crate::errors::Error::CryptoFailure {
                    message: e.to_string(),
                })?;
            Ok(SignatureBytes::Mpis(vec![
                Mpi::from_slice(&sig.r().to_bytes_be()),
                Mpi::from_slice(&sig.s().to_bytes_be()),
            ]))
        }
        (
            PlainSecretParams::Ecdsa { x },
            PublicParams::Ecdsa {
                curve: EccCurve::NistP256,
                ..
            },
        ) => {
            let bytes: [u8; 32] = x
                .as_ref()
                .try_into()
                .map_err(|_| crate::errors::Error::CryptoFailure {
                    message: "malformed P-256 scalar".into(),
                })?;
            let sk = p256::ecdsa::SigningKey::from_bytes((&bytes).into()).map_err(|e| {
                crate::errors::Error::CryptoFailure {
                    message: e.to_string(),
                }
            })?;
            let sig: p256::ecdsa::Signature = sk.sign(digest);
            let (r, s) = sig.split_bytes();
            Ok(SignatureBytes::Mpis(vec![
                Mpi::from_slice(&r),
                Mpi::from_slice(&s),
            ]))
        }
        (PlainSecretParams::Ed25519 { key }, PublicParams::Ed25519 { .. }) => {
            let sk = ed25519_dalek::SigningKey::from_bytes(key);
            let sig = sk.sign(digest);
            Ok(SignatureBytes::Native(sig.to_bytes().to_vec()))
        }
        _ => {
            let _ = &mut rng;
            bail!("secret/public key shape mismatch for signing")
        }
    }
}

fn rsa_private_key(d: &Mpi, p: &Mpi, q: &Mpi) -> Result<rsa::RsaPrivateKey> {
    let d = rsa::BigUint::from_bytes_be(d.as_ref());
    let p = rsa::BigUint::from_bytes_be(p.as_ref());
    let q = rsa::BigUint::from_bytes_be(q.as_ref());
    let n = &p * &q;
    rsa::RsaPrivateKey::from_components(n, rsa::BigUint::from(65537u32), d, vec![p, q]).map_err(
        |e| crate::errors::Error::CryptoFailure {
            message: e.to_string(),
        },
    )
}

fn rsa_private_key_with_public(
    d: &Mpi,
    p: &Mpi,
    q: &Mpi,
    n: &Mpi,
    e: &Mpi,
) -> Result<rsa::RsaPrivateKey> {
    let d = rsa::BigUint::from_bytes_be(d.as_ref());
    let p = rsa::BigUint::from_bytes_be(p.as_ref());
    let q = rsa::BigUint::from_bytes_be(q.as_ref());
    let n = rsa::BigUint::from_bytes_be(n.as_ref());
    let e = rsa::BigUint::from_bytes_be(e.as_ref());
    rsa::RsaPrivateKey::from_components(n, e, d, vec![p, q]).map_err(|e| {
        crate::errors::Error::CryptoFailure {
            message: e.to_string(),
        }
    })
}

fn dsa_signing_key(p: &Mpi, q: &Mpi, g: &Mpi, y: &Mpi, x: &Mpi) -> Result<dsa::SigningKey> {
    let vk = public_key::dsa_verifying_key(p, q, g, y)?;
    dsa::SigningKey::from_components(vk, rsa::BigUint::from_bytes_be(x.as_ref())).map_err(|e| {
        crate::errors::Error::CryptoFailure {
            message: e.to_string(),
        }
    })
}

/// Zero a freshly-decrypted S2K-wrapped secret key buffer as soon as the
/// caller is done with it; the wrapper exists so call sites don't have to
/// remember to call `.zeroize()` on a bare `Vec<u8>`.
pub type SecretKeyBuf = Zeroizing<Vec<u8>>;
