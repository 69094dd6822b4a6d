//! The OpenPGP message pipeline, spec.md §4.E: assemble and disassemble
//! well-formed messages from the packet codec, driving the
//! ESK → session-key → SEIPD → literal/signature flow in both directions.
//!
//! This module owns the orchestration; it calls into
//! [`crate::crypto`], [`crate::key`], [`crate::packet`] and
//! [`crate::armor`] rather than duplicating any of their logic.

pub mod builder;

use chrono::Utc;
use rand::{CryptoRng, RngCore};

use crate::armor::{self, Kind as ArmorKind};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key as pk;
use crate::crypto::secret_key::{self, PlainSecretParams};
use crate::crypto::sym::{checksum, SymmetricKeyAlgorithm};
use crate::errors::{Error, Result};
use crate::key::{preferred_symmetric_algorithm, Key, KeyComponent};
use crate::packet::literal_data::{LiteralData, LiteralDataFormat};
use crate::packet::one_pass_signature::OnePassSignature;
use crate::packet::signature::{Signature, SignatureType};
use crate::packet::sym_encrypted_data::SymEncryptedData;
use crate::packet::sym_encrypted_protected_data::SymEncryptedProtectedData;
use crate::packet::{self, CompressedData, Packet, PublicKeyEncryptedSessionKey};
use crate::ser::Serialize;
use crate::types::CompressionAlgorithm;

/// Called synchronously on the processing thread when a locked secret key
/// is needed; returns `None` for "no passphrase available" (spec.md §5).
pub type PassphraseFn<'a> = &'a mut dyn FnMut() -> Option<String>;

/// Unlock `component`'s secret key, consulting `passphrase_cb` only if it
/// is actually locked.
fn unlock(component: &KeyComponent, passphrase_cb: &mut Option<PassphraseFn<'_>>) -> Result<PlainSecretParams> {
    let secret = component
        .secret
        .as_ref()
        .ok_or_else(|| Error::InvalidMessage {
            message: "key has no secret material".into(),
        })?;

    if !secret.is_locked() {
        return secret.unlock("");
    }

    let passphrase = passphrase_cb
        .as_mut()
        .and_then(|cb| cb())
        .ok_or(Error::PassphraseRequired)?;
    secret.unlock(&passphrase)
}

/// spec.md §4.D `encryptionPacket` + §4.E step 2: wrap `plain` under one
/// recipient key, producing its `PublicKeyEncryptedSessionKey` packet.
fn build_pkesk<R: CryptoRng + RngCore>(mut rng: R, recipient: &Key, plain: &[u8]) -> Result<Packet> {
    let public = recipient.encryption_packet().ok_or_else(|| Error::InvalidMessage {
        message: "no usable encryption key".into(),
    })?;
    let esk = pk::encrypt(&mut rng, &public.public_params, plain)?;

    Ok(Packet::PublicKeyEncryptedSessionKey(
        PublicKeyEncryptedSessionKey {
            version: 3,
            recipient: public.key_id()?,
            algorithm: public.algorithm,
            esk,
        },
    ))
}

/// spec.md §4.E Encrypt, steps 1-5. `sign_key`, if given, produces an
/// embedded `OnePassSignature | LiteralData | Signature` inner content
/// instead of a bare compressed literal.
#[allow(clippy::too_many_arguments)]
pub fn encrypt<R: CryptoRng + RngCore>(
    mut rng: R,
    data: &[u8],
    recipients: &[Key],
    sign_key: Option<&Key>,
    mut passphrase_cb: Option<PassphraseFn<'_>>,
    armored: bool,
) -> Result<Vec<u8>> {
    if recipients.is_empty() {
        return Err(Error::InvalidMessage {
            message: "no usable encryption key".into(),
        });
    }

    let sym_alg = preferred_symmetric_algorithm(&recipients.iter().collect::<Vec<_>>());
    log::debug!("encrypting to {} recipient(s) with {sym_alg:?}", recipients.len());
    let session_key = sym_alg.sample_key(&mut rng)?;

    let mut plain_esk = Vec::with_capacity(1 + session_key.len() + 2);
    plain_esk.push(sym_alg.into());
    plain_esk.extend_from_slice(&session_key);
    plain_esk.extend_from_slice(&checksum(&session_key).to_be_bytes());

    let mut packets = Vec::with_capacity(recipients.len() + 1);
    for recipient in recipients {
        packets.push(build_pkesk(&mut rng, recipient, &plain_esk)?);
    }

    let now = Utc::now();
    let literal = LiteralData::new(LiteralDataFormat::Binary, data.to_vec(), now);

    let inner_packets = match sign_key {
        Some(signer) => {
            let component = signer.signing_component().ok_or_else(|| Error::InvalidMessage {
                message: "signing key has no usable signing component".into(),
            })?;
            let secret = unlock(component, &mut passphrase_cb)?;
            let issuer = component.key_id()?;

            let signed_data = literal.signed_data();
            let sig = Signature::sign(
                &mut rng,
                &secret,
                &component.public.public_params,
                HashAlgorithm::Sha512,
                SignatureType::Binary,
                issuer,
                now.timestamp() as u32,
                Vec::new(),
                &signed_data,
            )?;
            let ops = OnePassSignature {
                sig_type: SignatureType::Binary,
                hash_algorithm: HashAlgorithm::Sha512,
                pk_algorithm: component.public.algorithm,
                issuer,
                is_nested: false,
            };

            packet::write_packets(&[
                Packet::OnePassSignature(ops),
                Packet::LiteralData(literal),
                Packet::Signature(sig),
            ])?
        }
        None => {
            let framed = Packet::LiteralData(literal).to_bytes()?;
            let compressed = CompressedData::compress(CompressionAlgorithm::ZLIB, &framed)?;
            Packet::CompressedData(compressed).to_bytes()?
        }
    };

    let seipd = SymEncryptedProtectedData::encrypt(&mut rng, sym_alg, &session_key, &inner_packets)?;
    packets.push(Packet::SymEncryptedProtectedData(seipd));

    let bytes = packet::write_packets(&packets)?;
    if armored {
        Ok(armor::wrap(ArmorKind::Message, &bytes).into_bytes())
    } else {
        Ok(bytes)
    }
}

/// Replace every `CompressedData` packet in `packets` with its decompressed
/// contents, recursively, so the caller sees one flat packet sequence
/// regardless of how many compression layers the message used. Parses the
/// outer stream and each decompressed stream separately rather than
/// mutating a list while iterating it (spec.md §9).
fn flatten_compressed(packets: Vec<Packet>) -> Result<Vec<Packet>> {
    let mut out = Vec::with_capacity(packets.len());
    for packet in packets {
        match packet {
            Packet::CompressedData(compressed) => {
                let inner = compressed.decompress()?;
                out.extend(flatten_compressed(packet::parse_packets(&inner))?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// True if `packets` carries any encrypted-content envelope.
fn is_encrypted(packets: &[Packet]) -> bool {
    packets.iter().any(|p| {
        matches!(
            p,
            Packet::PublicKeyEncryptedSessionKey(_)
                | Packet::SymKeyEncryptedSessionKey(_)
                | Packet::SymEncryptedProtectedData(_)
                | Packet::SymEncryptedData(_)
        )
    })
}

/// Parse the first binary (post-dearmor) block of `data` into packets,
/// per spec.md §4.E Decrypt step 1.
fn parse_message(data: &[u8]) -> Result<Vec<Packet>> {
    let blocks = armor::extract_blocks(data)?;
    let first = blocks.first().ok_or_else(|| Error::InvalidMessage {
        message: "armored input has no blocks".into(),
    })?;
    Ok(packet::parse_packets(first))
}

/// Recover `(symAlg, sessionKey)` from the first PKESK (or, failing that,
/// SKESK) packet this caller can unlock.
fn recover_session_key(
    packets: &[Packet],
    keys: &[Key],
    passphrase_cb: &mut Option<PassphraseFn<'_>>,
) -> Result<(SymmetricKeyAlgorithm, Vec<u8>)> {
    let mut passphrase_was_required = false;

    for packet in packets {
        if let Packet::PublicKeyEncryptedSessionKey(pkesk) = packet {
            let Some(key) = Key::find_key(&pkesk.recipient, keys) else {
                continue;
            };
            let Some(secret) = key.decryption_packet(&pkesk.recipient) else {
                continue;
            };
            if secret.is_locked() {
                passphrase_was_required = true;
            }
            let component = KeyComponent {
                public: secret.public.clone(),
                secret: Some(secret.clone()),
                binding_signatures: Vec::new(),
            };
            let unlocked = match unlock(&component, passphrase_cb) {
                Ok(u) => u,
                Err(Error::PassphraseRequired) => return Err(Error::PassphraseRequired),
                Err(Error::PassphraseIncorrect) => return Err(Error::PassphraseIncorrect),
                Err(_) => continue,
            };
            let plain = secret_key::decrypt(&unlocked, &pkesk.esk)?;
            if let Ok(split) = pk::split_session_key(&plain) {
                return Ok(split);
            }
        }
    }

    for packet in packets {
        if let Packet::SymKeyEncryptedSessionKey(skesk) = packet {
            passphrase_was_required = true;
            let Some(cb) = passphrase_cb.as_mut() else {
                continue;
            };
            let Some(passphrase) = cb() else {
                return Err(Error::PassphraseRequired);
            };
            log::debug!("no PKESK matched a known key, trying SKESK with the supplied passphrase");
            if let Ok(split) = skesk.decrypt_session_key(passphrase.as_bytes()) {
                return Ok(split);
            }
        }
    }

    if passphrase_was_required {
        Err(Error::PassphraseRequired)
    } else {
        Err(Error::InvalidMessage {
            message: "no usable decryption key".into(),
        })
    }
}

/// spec.md §4.E Decrypt steps 2-5: turn a parsed outer packet stream into
/// the flat, decompressed inner packet sequence carrying the literal data
/// (and, for a signed message, its one-pass/signature bracket).
fn decrypt_to_inner_packets(
    packets: &[Packet],
    keys: &[Key],
    mut passphrase_cb: Option<PassphraseFn<'_>>,
) -> Result<Vec<Packet>> {
    if !is_encrypted(packets) {
        return flatten_compressed(packets.to_vec());
    }

    let (sym_alg, session_key) = recover_session_key(packets, keys, &mut passphrase_cb)?;

    let content = packets
        .iter()
        .find_map(|p| match p {
            Packet::SymEncryptedProtectedData(seipd) => Some(seipd.decrypt(sym_alg, &session_key)),
            _ => None,
        })
        .or_else(|| {
            packets.iter().find_map(|p| match p {
                Packet::SymEncryptedData(sed) => Some(sed.decrypt(sym_alg, &session_key)),
                _ => None,
            })
        })
        .ok_or_else(|| Error::InvalidMessage {
            message: "no encrypted data packet in message".into(),
        })?
        .inspect_err(|e| log::warn!("encrypted data packet failed to decrypt: {e}"))?;

    flatten_compressed(packet::parse_packets(&content))
}

fn find_literal(packets: &[Packet]) -> Option<&LiteralData> {
    packets.iter().find_map(|p| match p {
        Packet::LiteralData(lit) => Some(lit),
        _ => None,
    })
}

fn find_signature(packets: &[Packet]) -> Option<&Signature> {
    packets.iter().rev().find_map(|p| match p {
        Packet::Signature(sig) => Some(sig),
        _ => None,
    })
}

/// Verify `sig` over `document`, resolving the issuer's public key from
/// `keys`. A present-but-non-matching signature reports `Ok(false)`; a
/// missing issuer key is the harder `InvalidSignature` error spec.md §7
/// distinguishes it as.
fn verify_signature(sig: &Signature, document: &[u8], keys: &[Key]) -> Result<bool> {
    let issuer = sig.issuer_key_id().ok_or_else(|| Error::InvalidSignature {
        message: "signature carries no issuer key ID".into(),
    })?;
    let key = Key::find_key(&issuer, keys).ok_or_else(|| Error::InvalidSignature {
        message: "issuer key not found".into(),
    })?;
    let public_params = key.public_params_for(&issuer).ok_or_else(|| Error::InvalidSignature {
        message: "issuer key not found".into(),
    })?;

    let ok = sig.verify(public_params, document).is_ok();
    if !ok {
        log::warn!("signature from issuer {issuer:?} did not verify");
    }
    Ok(ok)
}

/// spec.md §4.E Decrypt. Returns the recovered `LiteralData` body.
/// `verify_signature` additionally requires an embedded signature to
/// check out, surfacing `InvalidSignature`/`NotSigned` rather than
/// silently accepting unauthenticated content.
pub fn decrypt(
    data: &[u8],
    keys: &[Key],
    passphrase_cb: Option<PassphraseFn<'_>>,
    verify: bool,
) -> Result<Vec<u8>> {
    let outer = parse_message(data)?;
    let inner = decrypt_to_inner_packets(&outer, keys, passphrase_cb)?;

    let literal = find_literal(&inner).ok_or_else(|| Error::InvalidMessage {
        message: "no literal data in message".into(),
    })?;

    if verify {
        let sig = find_signature(&inner).ok_or(Error::NotSigned)?;
        if !verify_signature(sig, &literal.signed_data(), keys)? {
            return Err(Error::InvalidSignature {
                message: "embedded signature did not verify".into(),
            });
        }
    }

    Ok(literal.data.clone())
}

/// spec.md §4.E Sign. `detached` emits a bare `Signature` packet over the
/// raw input bytes; otherwise emits `OnePassSignature | LiteralData |
/// Signature` over the canonicalized literal body.
pub fn sign<R: CryptoRng + RngCore>(
    mut rng: R,
    data: &[u8],
    key: &Key,
    passphrase: Option<&str>,
    hash_alg: HashAlgorithm,
    detached: bool,
) -> Result<Vec<u8>> {
    let component = key.signing_component().ok_or_else(|| Error::InvalidMessage {
        message: "key has no usable signing component".into(),
    })?;
    let secret = match &component.secret {
        None => {
            return Err(Error::InvalidMessage {
                message: "key has no secret material".into(),
            })
        }
        Some(s) if !s.is_locked() => s.unlock("")?,
        Some(s) => match passphrase {
            None => return Err(Error::PassphraseRequired),
            Some(p) => s.unlock(p)?,
        },
    };

    let issuer = component.key_id()?;
    let now = Utc::now().timestamp() as u32;

    if detached {
        let sig = Signature::sign(
            &mut rng,
            &secret,
            &component.public.public_params,
            hash_alg,
            SignatureType::Binary,
            issuer,
            now,
            Vec::new(),
            data,
        )?;
        return Packet::Signature(sig).to_bytes();
    }

    let literal = LiteralData::new(LiteralDataFormat::Binary, data.to_vec(), Utc::now());
    let signed_data = literal.signed_data();
    let sig = Signature::sign(
        &mut rng,
        &secret,
        &component.public.public_params,
        hash_alg,
        SignatureType::Binary,
        issuer,
        now,
        Vec::new(),
        &signed_data,
    )?;
    let ops = OnePassSignature {
        sig_type: SignatureType::Binary,
        hash_algorithm: hash_alg,
        pk_algorithm: component.public.algorithm,
        issuer,
        is_nested: false,
    };

    packet::write_packets(&[
        Packet::OnePassSignature(ops),
        Packet::LiteralData(literal),
        Packet::Signature(sig),
    ])
}

/// spec.md §4.E Verify. With `detached_sig`, checks it against the raw
/// `data` bytes; otherwise parses `data` as a (possibly encrypted, possibly
/// armored) message and checks its embedded signature against the
/// recovered literal body.
pub fn verify(
    data: &[u8],
    detached_sig: Option<&[u8]>,
    keys: &[Key],
    passphrase_cb: Option<PassphraseFn<'_>>,
) -> Result<bool> {
    match detached_sig {
        Some(sig_bytes) => {
            let blocks = armor::extract_blocks(sig_bytes)?;
            let sig_packets = packet::parse_packets(blocks.first().map(Vec::as_slice).unwrap_or(sig_bytes));
            let sig = find_signature(&sig_packets).ok_or(Error::NotSigned)?;
            verify_signature(sig, data, keys)
        }
        None => {
            let outer = parse_message(data)?;
            let inner = decrypt_to_inner_packets(&outer, keys, passphrase_cb)?;
            let literal = find_literal(&inner).ok_or(Error::NotSigned)?;
            let sig = find_signature(&inner).ok_or(Error::NotSigned)?;
            verify_signature(sig, &literal.signed_data(), keys)
        }
    }
}

/// spec.md §6 `readKeys`: parse a binary or armored keyring into its
/// constituent keys.
pub fn read_keys(data: &[u8]) -> Result<Vec<Key>> {
    let blocks = armor::extract_blocks(data)?;
    let mut keys = Vec::new();
    for block in blocks {
        let packets = packet::parse_packets(&block);
        keys.extend(Key::from_packets(&packets));
    }
    Ok(keys)
}

/// spec.md §6 file convention: `readKeysFromFile(path)` expands a leading
/// `~`, refuses directories, and never throws on an empty or malformed
/// file — it answers with an empty key list instead.
pub fn read_keys_from_file(path: impl AsRef<std::path::Path>) -> Result<Vec<Key>> {
    let path = path.as_ref();
    let expanded;
    let path = if let Ok(rest) = path.strip_prefix("~") {
        let home = std::env::var_os("HOME").map(std::path::PathBuf::from).unwrap_or_default();
        expanded = home.join(rest);
        expanded.as_path()
    } else {
        path
    };

    if path.is_dir() {
        return Err(Error::InvalidMessage {
            message: "refusing to read keys from a directory".into(),
        });
    }

    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("could not read key file {}: {e}", path.display());
            return Ok(Vec::new());
        }
    };
    if data.is_empty() {
        return Ok(Vec::new());
    }

    Ok(read_keys(&data).unwrap_or_else(|e| {
        log::warn!("malformed key file {}: {e}", path.display());
        Vec::new()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key::{PublicKeyAlgorithm, PublicParams};
    use crate::packet::key::{PublicKeyPacket, SecretKeyMaterial, SecretKeyPacket};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn x25519_key_pair(rng: &mut ChaCha8Rng, can_encrypt: bool) -> Key {
        use x25519_dalek::{PublicKey, StaticSecret};

        let secret_scalar = StaticSecret::random_from_rng(&mut *rng);
        let public_point = PublicKey::from(&secret_scalar);

        let algorithm = if can_encrypt {
            PublicKeyAlgorithm::X25519
        } else {
            PublicKeyAlgorithm::Ed25519
        };
        let public_params = if can_encrypt {
            PublicParams::X25519 {
                point: *public_point.as_bytes(),
            }
        } else {
            let sk = ed25519_dalek::SigningKey::generate(rng);
            PublicParams::Ed25519 {
                point: sk.verifying_key().to_bytes(),
            }
        };

        let public = PublicKeyPacket::new(false, Utc::now(), algorithm, public_params);
        let material = if can_encrypt {
            SecretKeyMaterial::Plain(crate::packet::key::PlainSecretParamsBytes({
                let mut out = Vec::new();
                out.extend_from_slice(secret_scalar.to_bytes().as_ref());
                out
            }))
        } else {
            unreachable!("this helper only builds encryption keys")
        };

        let secret = SecretKeyPacket {
            is_subkey: false,
            public: public.clone(),
            material,
        };

        Key {
            primary: KeyComponent {
                public,
                secret: Some(secret),
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        }
    }

    fn ed25519_signing_key(rng: &mut ChaCha8Rng) -> Key {
        let sk = ed25519_dalek::SigningKey::generate(rng);
        let public = PublicKeyPacket::new(
            false,
            Utc::now(),
            PublicKeyAlgorithm::Ed25519,
            PublicParams::Ed25519 {
                point: sk.verifying_key().to_bytes(),
            },
        );
        let secret = SecretKeyPacket {
            is_subkey: false,
            public: public.clone(),
            material: SecretKeyMaterial::Plain(crate::packet::key::PlainSecretParamsBytes(
                sk.to_bytes().to_vec(),
            )),
        };

        Key {
            primary: KeyComponent {
                public,
                secret: Some(secret),
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        }
    }

    #[test]
    fn encrypt_then_decrypt_roundtrips() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let recipient = x25519_key_pair(&mut rng, true);
        let recipient_pub = Key {
            primary: KeyComponent {
                public: recipient.primary.public.clone(),
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };

        let ciphertext = encrypt(
            &mut rng,
            b"Hello, World!",
            &[recipient_pub],
            None,
            None,
            false,
        )
        .unwrap();
        assert_eq!(ciphertext[0] & 0b1100_0000, 0b1100_0000);

        let plaintext = decrypt(&ciphertext, &[recipient], None, false).unwrap();
        assert_eq!(plaintext, b"Hello, World!");
    }

    #[test]
    fn armored_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let recipient = x25519_key_pair(&mut rng, true);

        let armored = encrypt(&mut rng, b"Hello, World!", &[recipient.clone()], None, None, true).unwrap();
        let text = String::from_utf8(armored.clone()).unwrap();
        assert!(text.starts_with("-----BEGIN PGP MESSAGE-----\r\n"));
        assert!(text.ends_with("-----END PGP MESSAGE-----\r\n"));

        let plaintext = decrypt(&armored, &[recipient], None, false).unwrap();
        assert_eq!(plaintext, b"Hello, World!");
    }

    #[test]
    fn detached_sign_and_verify() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let signer = ed25519_signing_key(&mut rng);
        let signer_pub = Key {
            primary: KeyComponent {
                public: signer.primary.public.clone(),
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };

        let data = vec![0u8; 1024 * 1024];
        let sig = sign(&mut rng, &data, &signer, None, HashAlgorithm::Sha256, true).unwrap();

        assert!(verify(&data, Some(&sig), &[signer_pub.clone()], None).unwrap());

        let mut tampered = data.clone();
        tampered[0] ^= 1;
        assert!(!verify(&tampered, Some(&sig), &[signer_pub], None).unwrap());
    }

    #[test]
    fn embedded_sign_and_encrypt_then_decrypt_and_verify() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let signer = ed25519_signing_key(&mut rng);
        let signer_pub = Key {
            primary: KeyComponent {
                public: signer.primary.public.clone(),
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };
        let recipient = x25519_key_pair(&mut rng, true);
        let recipient_pub = Key {
            primary: KeyComponent {
                public: recipient.primary.public.clone(),
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };

        let ciphertext = encrypt(
            &mut rng,
            b"signed and sealed",
            &[recipient_pub],
            Some(&signer),
            None,
            false,
        )
        .unwrap();

        let plaintext = decrypt(&ciphertext, &[recipient], None, true).unwrap();
        assert_eq!(plaintext, b"signed and sealed");

        assert!(verify(&ciphertext, None, &[signer_pub], None).unwrap());
    }

    #[test]
    fn no_recipients_is_invalid_message() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let err = encrypt(&mut rng, b"hi", &[], None, None, false).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage { .. }));
    }

    #[test]
    fn mdc_strip_attack_fails_integrity_check() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let recipient = x25519_key_pair(&mut rng, true);
        let recipient_pub = Key {
            primary: KeyComponent {
                public: recipient.primary.public.clone(),
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };

        let mut ciphertext =
            encrypt(&mut rng, b"Hello, World!", &[recipient_pub], None, None, false).unwrap();
        let new_len = ciphertext.len() - 22;
        ciphertext.truncate(new_len);

        let err = decrypt(&ciphertext, &[recipient], None, false).unwrap_err();
        assert!(matches!(
            err,
            Error::IntegrityCheckFailed | Error::InvalidMessage { .. }
        ));
    }

    fn locked_x25519_key_pair(rng: &mut ChaCha8Rng, passphrase: &str) -> Key {
        let mut unlocked = x25519_key_pair(rng, true);
        let secret = unlocked.primary.secret.take().unwrap();
        let plain = secret.unlock("").unwrap();
        let locked = crate::packet::key::SecretKeyPacket::encrypt(
            false,
            secret.public.clone(),
            &plain,
            passphrase,
            &mut *rng,
        )
        .unwrap();

        Key {
            primary: KeyComponent {
                public: unlocked.primary.public,
                secret: Some(locked),
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        }
    }

    #[test]
    fn wrong_passphrase_on_locked_key_is_passphrase_incorrect() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let recipient = locked_x25519_key_pair(&mut rng, "correct horse battery staple");
        let recipient_pub = Key {
            primary: KeyComponent {
                public: recipient.primary.public.clone(),
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };

        let ciphertext =
            encrypt(&mut rng, b"Hello, World!", &[recipient_pub], None, None, false).unwrap();

        let mut wrong_passphrase = || Some("wrong".to_string());
        let err = decrypt(&ciphertext, &[recipient], Some(&mut wrong_passphrase), false).unwrap_err();
        assert!(matches!(err, Error::PassphraseIncorrect));
    }

    #[test]
    fn multi_recipient_produces_two_pkesk_and_either_secret_decrypts() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let recipient_a = x25519_key_pair(&mut rng, true);
        let recipient_b = x25519_key_pair(&mut rng, true);
        let public_only = |k: &Key| Key {
            primary: KeyComponent {
                public: k.primary.public.clone(),
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };

        let ciphertext = encrypt(
            &mut rng,
            b"Hello, World!",
            &[public_only(&recipient_a), public_only(&recipient_b)],
            None,
            None,
            false,
        )
        .unwrap();

        let packets = packet::parse_packets(&ciphertext);
        let pkesk_count = packets
            .iter()
            .filter(|p| matches!(p, Packet::PublicKeyEncryptedSessionKey(_)))
            .count();
        assert_eq!(pkesk_count, 2);

        let plaintext_a = decrypt(&ciphertext, &[recipient_a], None, false).unwrap();
        assert_eq!(plaintext_a, b"Hello, World!");

        let plaintext_b = decrypt(&ciphertext, &[recipient_b], None, false).unwrap();
        assert_eq!(plaintext_b, b"Hello, World!");
    }
}
