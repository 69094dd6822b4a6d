//! Public-key and secret-key packets, RFC 4880 §5.5: tags 5/6/7/14.
//!
//! A primary key and a subkey share an identical body grammar; only the
//! packet tag distinguishes them. This module keeps that symmetry by
//! carrying `is_subkey` as a field rather than duplicating the struct.

use std::io;

use bytes::Buf;
use byteorder::WriteBytesExt;
use chrono::{DateTime, TimeZone, Utc};
use digest::Digest;
use rand::{CryptoRng, RngCore};
use sha1_checked::Sha1;

use crate::crypto::public_key::{EccCurve, PublicKeyAlgorithm, PublicParams};
use crate::crypto::secret_key::PlainSecretParams;
use crate::crypto::sym::{checksum, SymmetricKeyAlgorithm};
use crate::errors::{bail, ensure, ensure_eq, unsupported_err, Error, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{mpi, Fingerprint, KeyId, KeyVersion, Mpi, StringToKey, Tag};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublicKeyPacket {
    pub is_subkey: bool,
    pub version: KeyVersion,
    pub created_at: DateTime<Utc>,
    pub algorithm: PublicKeyAlgorithm,
    pub public_params: PublicParams,
}

impl PublicKeyPacket {
    pub fn new(
        is_subkey: bool,
        created_at: DateTime<Utc>,
        algorithm: PublicKeyAlgorithm,
        public_params: PublicParams,
    ) -> Self {
        PublicKeyPacket {
            is_subkey,
            version: KeyVersion::V4,
            created_at,
            algorithm,
            public_params,
        }
    }

    pub fn tag(&self) -> Tag {
        if self.is_subkey {
            Tag::PublicSubkey
        } else {
            Tag::PublicKey
        }
    }

    /// The bytes a V4 fingerprint (and thus `KeyId`) is computed over:
    /// `0x99 | len(2, BE) | version | created(4) | algorithm | params`.
    fn imprint(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        self.write_body(&mut body)?;

        let mut out = Vec::with_capacity(3 + body.len());
        out.push(0x99);
        out.extend_from_slice(&(body.len() as u16).to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// The bytes a binding `Signature` over this key hashes as part of its
    /// signed document (RFC 4880 §5.2.4): the same `0x99 | len | body`
    /// imprint used for the fingerprint, exposed for subkey-binding and
    /// user-ID certification signatures to build on.
    pub fn signable_bytes(&self) -> Result<Vec<u8>> {
        self.imprint()
    }

    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let imprint = self.imprint()?;
        let mut hasher = Sha1::<sha1_checked::DetectionOnly>::new();
        hasher.update(&imprint);
        let digest = hasher.finalize();
        let bytes: [u8; 20] = digest.as_ref().try_into().expect("SHA-1 is 20 bytes");
        Ok(Fingerprint::new(bytes))
    }

    pub fn key_id(&self) -> Result<KeyId> {
        Ok(self.fingerprint()?.key_id())
    }

    fn write_body<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version.into())?;
        writer.write_all(&(self.created_at.timestamp() as u32).to_be_bytes())?;
        writer.write_u8(self.algorithm.into())?;
        write_public_params(writer, &self.public_params)
    }

    fn body_len(&self) -> usize {
        5 + public_params_len(&self.public_params)
    }

    pub fn from_buf<B: Buf>(is_subkey: bool, mut buf: B) -> Result<Self> {
        let version = buf.read_u8()?;
        ensure_eq!(version, 4, "only V4 keys are supported");
        let created = buf.read_u32()?;
        let created_at = Utc
            .timestamp_opt(created as i64, 0)
            .single()
            .ok_or_else(|| Error::Message {
                message: "invalid key creation time".into(),
            })?;
        let algorithm = PublicKeyAlgorithm::from(buf.read_u8()?);
        let public_params = read_public_params(algorithm, &mut buf)?;

        Ok(PublicKeyPacket {
            is_subkey,
            version: KeyVersion::V4,
            created_at,
            algorithm,
            public_params,
        })
    }
}

impl Serialize for PublicKeyPacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.write_body(writer)
    }

    fn write_len(&self) -> usize {
        self.body_len()
    }
}

fn public_params_len(params: &PublicParams) -> usize {
    let mut buf = Vec::new();
    write_public_params(&mut buf, params).expect("writing to a Vec never fails");
    buf.len()
}

fn write_public_params<W: io::Write>(writer: &mut W, params: &PublicParams) -> Result<()> {
    match params {
        PublicParams::Rsa { n, e } => {
            n.to_writer(writer)?;
            e.to_writer(writer)?;
        }
        PublicParams::Dsa { p, q, g, y } => {
            p.to_writer(writer)?;
            q.to_writer(writer)?;
            g.to_writer(writer)?;
            y.to_writer(writer)?;
        }
        PublicParams::Elgamal { p, g, y } => {
            p.to_writer(writer)?;
            g.to_writer(writer)?;
            y.to_writer(writer)?;
        }
        PublicParams::Ecdsa { curve, point } => {
            write_curve_oid(writer, *curve)?;
            point.to_writer(writer)?;
        }
        PublicParams::EdDsaLegacy { curve, point } => {
            write_curve_oid(writer, *curve)?;
            point.to_writer(writer)?;
        }
        PublicParams::Ed25519 { point } => {
            writer.write_all(point)?;
        }
        PublicParams::Ecdh {
            curve,
            point,
            hash,
            sym,
        } => {
            write_curve_oid(writer, *curve)?;
            point.to_writer(writer)?;
            // KDF parameters: length(1)=3, reserved(1)=1, hash(1), sym(1).
            writer.write_all(&[3, 1, (*hash).into(), (*sym).into()])?;
        }
        PublicParams::X25519 { point } => {
            writer.write_all(point)?;
        }
    }
    Ok(())
}

fn write_curve_oid<W: io::Write>(writer: &mut W, curve: EccCurve) -> Result<()> {
    let oid = curve.oid();
    writer.write_u8(oid.len() as u8)?;
    writer.write_all(oid)?;
    Ok(())
}

fn read_public_params<B: Buf>(alg: PublicKeyAlgorithm, buf: &mut B) -> Result<PublicParams> {
    Ok(match alg {
        PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
            PublicParams::Rsa {
                n: mpi(buf)?,
                e: mpi(buf)?,
            }
        }
        PublicKeyAlgorithm::DSA => PublicParams::Dsa {
            p: mpi(buf)?,
            q: mpi(buf)?,
            g: mpi(buf)?,
            y: mpi(buf)?,
        },
        PublicKeyAlgorithm::Elgamal => PublicParams::Elgamal {
            p: mpi(buf)?,
            g: mpi(buf)?,
            y: mpi(buf)?,
        },
        PublicKeyAlgorithm::ECDSA => {
            let curve = read_curve_oid(buf)?;
            PublicParams::Ecdsa {
                curve,
                point: mpi(buf)?,
            }
        }
        PublicKeyAlgorithm::EdDSALegacy => {
            let curve = read_curve_oid(buf)?;
            PublicParams::EdDsaLegacy {
                curve,
                point: mpi(buf)?,
            }
        }
        PublicKeyAlgorithm::Ed25519 => PublicParams::Ed25519 {
            point: buf.read_array::<32>()?,
        },
        PublicKeyAlgorithm::X25519 => PublicParams::X25519 {
            point: buf.read_array::<32>()?,
        },
        PublicKeyAlgorithm::ECDH => {
            let curve = read_curve_oid(buf)?;
            let point = mpi(buf)?;
            let kdf_len = buf.read_u8()?;
            let kdf = buf.read_take(kdf_len.into())?;
            ensure!(kdf.len() >= 3, "truncated ECDH KDF parameters");
            let hash = crate::crypto::hash::HashAlgorithm::from(kdf[1]);
            let sym = SymmetricKeyAlgorithm::from(kdf[2]);
            PublicParams::Ecdh {
                curve,
                point,
                hash,
                sym,
            }
        }
        other => unsupported_err!("public key algorithm {:?}", other),
    })
}

fn read_curve_oid<B: Buf>(buf: &mut B) -> Result<EccCurve> {
    let len = buf.read_u8()?;
    let oid = buf.read_take(len.into())?;
    EccCurve::from_oid(&oid)
}

/// Where a secret key's private parameters live: plaintext, checksummed
/// plaintext, or passphrase-encrypted behind an S2K specifier.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SecretKeyMaterial {
    Plain(PlainSecretParamsBytes),
    Encrypted {
        sym_alg: SymmetricKeyAlgorithm,
        s2k: StringToKey,
        iv: Vec<u8>,
        /// S2K usage octet: 254 wraps the plaintext in an appended SHA-1
        /// digest instead of the legacy 2-octet checksum.
        sha1_integrity: bool,
        ciphertext: Vec<u8>,
    },
}

/// The serialized form of plaintext secret MPI material, kept around
/// uninterpreted until `unlock` (or direct use, for an already-plaintext
/// key) parses it against the owning public algorithm.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PlainSecretParamsBytes(pub Vec<u8>);

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecretKeyPacket {
    pub is_subkey: bool,
    pub public: PublicKeyPacket,
    pub material: SecretKeyMaterial,
}

impl SecretKeyPacket {
    pub fn tag(&self) -> Tag {
        if self.is_subkey {
            Tag::SecretSubkey
        } else {
            Tag::SecretKey
        }
    }

    pub fn key_id(&self) -> Result<KeyId> {
        self.public.key_id()
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.material, SecretKeyMaterial::Encrypted { .. })
    }

    pub fn from_buf<B: Buf>(is_subkey: bool, mut buf: B) -> Result<Self> {
        let public = PublicKeyPacket::from_buf(is_subkey, &mut buf)?;
        let usage = buf.read_u8()?;

        let material = match usage {
            0 => {
                let bytes = read_plain_params(public.algorithm, &mut buf)?;
                let stored_checksum = buf.read_u16()?;
                ensure_eq!(
                    checksum(&bytes),
                    stored_checksum,
                    "secret key checksum mismatch"
                );
                SecretKeyMaterial::Plain(PlainSecretParamsBytes(bytes))
            }
            254 | 255 => {
                let sym_alg = SymmetricKeyAlgorithm::from(buf.read_u8()?);
                let s2k = StringToKey::from_buf(&mut buf)?;
                let iv_len = sym_alg.block_size()?;
                let iv = buf.read_take(iv_len)?.to_vec();
                let ciphertext = buf.rest().to_vec();
                SecretKeyMaterial::Encrypted {
                    sym_alg,
                    s2k,
                    iv,
                    sha1_integrity: usage == 254,
                    ciphertext,
                }
            }
            alg if alg >= 100 => unsupported_err!("unknown S2K usage octet {}", alg),
            sym_alg_id => {
                let sym_alg = SymmetricKeyAlgorithm::from(sym_alg_id);
                let s2k = StringToKey::from_buf(&mut buf)?;
                let iv_len = sym_alg.block_size()?;
                let iv = buf.read_take(iv_len)?.to_vec();
                let ciphertext = buf.rest().to_vec();
                SecretKeyMaterial::Encrypted {
                    sym_alg,
                    s2k,
                    iv,
                    sha1_integrity: false,
                    ciphertext,
                }
            }
        };

        Ok(SecretKeyPacket {
            is_subkey,
            public,
            material,
        })
    }

    /// Passphrase-unlock (a no-op for an already-plaintext key): derive
    /// the S2K key, CFB-decrypt the secret material, and verify its
    /// integrity check before handing back parsed [`PlainSecretParams`].
    pub fn unlock(&self, passphrase: &str) -> Result<PlainSecretParams> {
        let bytes = match &self.material {
            SecretKeyMaterial::Plain(bytes) => bytes.0.clone(),
            SecretKeyMaterial::Encrypted {
                sym_alg,
                s2k,
                iv,
                sha1_integrity,
                ciphertext,
            } => {
                let key = s2k.derive_key(passphrase.as_bytes(), sym_alg.key_size()?)?;
                let mut plain = ciphertext.clone();
                sym_alg.cfb_decrypt(&key, iv, &mut plain)?;

                if *sha1_integrity {
                    ensure!(plain.len() >= 20, "truncated encrypted secret key");
                    let (body, digest) = plain.split_at(plain.len() - 20);
                    let mut hasher = Sha1::<sha1_checked::DetectionOnly>::new();
                    hasher.update(body);
                    let computed = hasher.finalize();
                    if computed.as_ref() != digest {
                        return Err(Error::PassphraseIncorrect);
                    }
                    body.to_vec()
                } else {
                    ensure!(plain.len() >= 2, "truncated encrypted secret key");
                    let (body, stored) = plain.split_at(plain.len() - 2);
                    let want = u16::from_be_bytes([stored[0], stored[1]]);
                    if checksum(body) != want {
                        return Err(Error::PassphraseIncorrect);
                    }
                    body.to_vec()
                }
            }
        };

        parse_plain_secret_params(self.public.algorithm, &bytes)
    }

    /// Build a fresh, passphrase-encrypted `SecretKeyPacket` from unlocked
    /// parameters, mirroring [`Self::unlock`].
    pub fn encrypt<R: CryptoRng + RngCore>(
        is_subkey: bool,
        public: PublicKeyPacket,
        secret: &PlainSecretParams,
        passphrase: &str,
        mut rng: R,
    ) -> Result<Self> {
        let bytes = serialize_plain_secret_params(secret);
        let mut hasher = Sha1::<sha1_checked::DetectionOnly>::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();

        let mut plain = bytes;
        plain.extend_from_slice(digest.as_ref());

        let sym_alg = SymmetricKeyAlgorithm::AES256;
        let s2k = StringToKey::new_iterated(&mut rng, crate::crypto::hash::HashAlgorithm::Sha256, 65536);
        let key = s2k.derive_key(passphrase.as_bytes(), sym_alg.key_size()?)?;
        let mut iv = vec![0u8; sym_alg.block_size()?];
        rng.fill_bytes(&mut iv);

        sym_alg.cfb_encrypt(&key, &iv, &mut plain)?;

        Ok(SecretKeyPacket {
            is_subkey,
            public,
            material: SecretKeyMaterial::Encrypted {
                sym_alg,
                s2k,
                iv,
                sha1_integrity: true,
                ciphertext: plain,
            },
        })
    }
}

impl Serialize for SecretKeyPacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.public.write_body(writer)?;
        match &self.material {
            SecretKeyMaterial::Plain(bytes) => {
                writer.write_u8(0)?;
                writer.write_all(&bytes.0)?;
                writer.write_all(&checksum(&bytes.0).to_be_bytes())?;
            }
            SecretKeyMaterial::Encrypted {
                sym_alg,
                s2k,
                iv,
                sha1_integrity,
                ciphertext,
            } => {
                writer.write_u8(if *sha1_integrity { 254 } else { 255 })?;
                writer.write_u8((*sym_alg).into())?;
                s2k.to_writer(writer)?;
                writer.write_all(iv)?;
                writer.write_all(ciphertext)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut buf = Vec::new();
        self.to_writer(&mut buf).expect("writing to a Vec never fails");
        buf.len()
    }
}

fn read_plain_params<B: Buf>(alg: PublicKeyAlgorithm, buf: &mut B) -> Result<Vec<u8>> {
    // Read the natural MPI/native count for this algorithm, but keep the
    // wire bytes uninterpreted until `unlock`/direct-use time: the
    // S2K-encrypted variant can only be parsed into params after
    // decryption, so both paths share one "collect N components" helper.
    let n = match alg {
        PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => 4,
        PublicKeyAlgorithm::DSA | PublicKeyAlgorithm::Elgamal => 1,
        PublicKeyAlgorithm::ECDSA | PublicKeyAlgorithm::EdDSALegacy | PublicKeyAlgorithm::ECDH => 1,
        PublicKeyAlgorithm::Ed25519 | PublicKeyAlgorithm::X25519 => 0,
        other => unsupported_err!("secret key material for {:?}", other),
    };

    let mut out = Vec::new();
    if matches!(alg, PublicKeyAlgorithm::Ed25519 | PublicKeyAlgorithm::X25519) {
        let key = buf.read_array::<32>()?;
        out.extend_from_slice(&key);
        return Ok(out);
    }
    for _ in 0..n {
        let m = mpi(buf)?;
        // Preserve the on-wire MPI framing (bit-count prefix) so the
        // plaintext byte count used by the trailing checksum matches
        // what was actually read.
        m.to_writer(&mut out)?;
    }
    Ok(out)
}

fn parse_plain_secret_params(alg: PublicKeyAlgorithm, bytes: &[u8]) -> Result<PlainSecretParams> {
    let mut buf = bytes;
    Ok(match alg {
        PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::RSASign => {
            let d = mpi(&mut buf)?;
            let p = mpi(&mut buf)?;
            let q = mpi(&mut buf)?;
            PlainSecretParams::Rsa { d, p, q }
        }
        PublicKeyAlgorithm::DSA => PlainSecretParams::Dsa { x: mpi(&mut buf)? },
        PublicKeyAlgorithm::Elgamal => PlainSecretParams::Elgamal { x: mpi(&mut buf)? },
        PublicKeyAlgorithm::ECDSA => PlainSecretParams::Ecdsa { x: mpi(&mut buf)? },
        PublicKeyAlgorithm::EdDSALegacy => PlainSecretParams::EdDsaLegacy { x: mpi(&mut buf)? },
        PublicKeyAlgorithm::ECDH => PlainSecretParams::Ecdh { x: mpi(&mut buf)? },
        PublicKeyAlgorithm::Ed25519 => {
            ensure_eq!(bytes.len(), 32, "Ed25519 secret key must be 32 bytes");
            let mut key = [0u8; 32];
            key.copy_from_slice(bytes);
            PlainSecretParams::Ed25519 { key }
        }
        PublicKeyAlgorithm::X25519 => {
            ensure_eq!(bytes.len(), 32, "X25519 secret key must be 32 bytes");
            let mut key = [0u8; 32];
            key.copy_from_slice(bytes);
            PlainSecretParams::X25519 { key }
        }
        other => bail!("unsupported secret key algorithm {:?}", other),
    })
}

fn serialize_plain_secret_params(secret: &PlainSecretParams) -> Vec<u8> {
    let mut out = Vec::new();
    match secret {
        PlainSecretParams::Rsa { d, p, q } => {
            d.to_writer(&mut out).unwrap();
            p.to_writer(&mut out).unwrap();
            q.to_writer(&mut out).unwrap();
        }
        PlainSecretParams::Dsa { x }
        | PlainSecretParams::Elgamal { x }
        | PlainSecretParams::Ecdsa { x }
        | PlainSecretParams::EdDsaLegacy { x }
        | PlainSecretParams::Ecdh { x } => {
            x.to_writer(&mut out).unwrap();
        }
        PlainSecretParams::Ed25519 { key } | PlainSecretParams::X25519 { key } => {
            out.extend_from_slice(key);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::SubsecRound;

    use super::*;

    fn sample_public() -> PublicKeyPacket {
        PublicKeyPacket::new(
            false,
            Utc::now().round_subsecs(0),
            PublicKeyAlgorithm::X25519,
            PublicParams::X25519 { point: [9u8; 32] },
        )
    }

    #[test]
    fn public_key_roundtrip() {
        let key = sample_public();
        let bytes = key.to_bytes().unwrap();
        let parsed = PublicKeyPacket::from_buf(false, &bytes[..]).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn fingerprint_is_stable() {
        let key = sample_public();
        assert_eq!(key.fingerprint().unwrap(), key.fingerprint().unwrap());
        assert_eq!(key.key_id().unwrap(), key.fingerprint().unwrap().key_id());
    }

    #[test]
    fn secret_key_lock_unlock_roundtrip() {
        let public = sample_public();
        let secret = PlainSecretParams::X25519 { key: [3u8; 32] };
        let locked = SecretKeyPacket::encrypt(false, public, &secret, "hunter2", rand::thread_rng())
            .unwrap();
        assert!(locked.is_locked());

        let unlocked = locked.unlock("hunter2").unwrap();
        match unlocked {
            PlainSecretParams::X25519 { key } => assert_eq!(key, [3u8; 32]),
            _ => panic!("wrong variant"),
        }

        assert!(matches!(
            locked.unlock("wrong"),
            Err(Error::PassphraseIncorrect)
        ));
    }
}
