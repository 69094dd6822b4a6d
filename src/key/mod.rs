//! Key selection, RFC 4880 §11.1/§5.2.4 and spec.md §4.D: group a flat
//! packet stream into primary-key + subkeys + user IDs, and answer the
//! message pipeline's two questions — "which packet do I encrypt to" and
//! "which packet decrypts this PKESK".

use crate::crypto::public_key::PublicParams;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::key::{PublicKeyPacket, SecretKeyPacket};
use crate::packet::signature::Signature;
use crate::packet::user::UserId;
use crate::packet::Packet;
use crate::types::{Fingerprint, KeyFlags, KeyId, SubpacketData};

/// A public/secret key pair sharing one RFC 4880 §5.5 body grammar: either
/// a primary key or one of its subkeys. `secret` is `None` for a
/// public-only keyring entry.
#[derive(Debug, Clone)]
pub struct KeyComponent {
    pub public: PublicKeyPacket,
    pub secret: Option<SecretKeyPacket>,
    /// Self-signatures binding this component: a direct-key or subkey
    /// binding signature for a subkey, a certification for the primary.
    pub binding_signatures: Vec<Signature>,
}

impl KeyComponent {
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        self.public.fingerprint()
    }

    pub fn key_id(&self) -> Result<KeyId> {
        self.public.key_id()
    }

    fn has_key_id(&self, key_id: &KeyId) -> bool {
        matches!(self.key_id(), Ok(id) if id == *key_id)
    }

    /// Key-usage flags declared by the most recent binding signature that
    /// carries a `KeyFlags` subpacket, falling back to what the algorithm
    /// itself is capable of when no self-signature declares flags (common
    /// for older or minimal keys).
    pub fn key_flags(&self) -> KeyFlags {
        for sig in &self.binding_signatures {
            for sp in sig.hashed_subpackets.iter().chain(sig.unhashed_subpackets.iter()) {
                if let SubpacketData::KeyFlags(flags) = &sp.data {
                    return *flags;
                }
            }
        }
        let mut bits = 0u8;
        if self.public.algorithm.can_encrypt() {
            bits |= KeyFlags::ENCRYPT_COMMS | KeyFlags::ENCRYPT_STORAGE;
        }
        if self.public.algorithm.can_sign() {
            bits |= KeyFlags::SIGN;
        }
        KeyFlags::from_bits_truncate(bits)
    }

    /// Verify a subkey-binding self-signature's cryptographic validity
    /// against the primary key's public parameters: the signed document is
    /// `primary.signable_bytes() ++ subkey.signable_bytes()` (RFC 4880
    /// §5.2.4). Does not check expiry or revocation — this crate's
    /// Non-goal on a full trust model stops at "the binding is
    /// cryptographically genuine".
    fn verify_binding(&self, sig: &Signature, primary: &PublicKeyPacket) -> bool {
        let (Ok(primary_bytes), Ok(sub_bytes)) =
            (primary.signable_bytes(), self.public.signable_bytes())
        else {
            return false;
        };
        let document = [primary_bytes, sub_bytes].concat();
        sig.verify(&primary.public_params, &document).is_ok()
    }

    /// True if at least one binding signature cryptographically verifies
    /// against `primary`.
    pub fn is_validly_bound(&self, primary: &PublicKeyPacket) -> bool {
        self.binding_signatures
            .iter()
            .any(|sig| self.verify_binding(sig, primary))
    }
}

/// A parsed OpenPGP key: one primary [`KeyComponent`], its subkeys, and
/// the user IDs/attributes certified under it.
#[derive(Debug, Clone)]
pub struct Key {
    pub primary: KeyComponent,
    pub user_ids: Vec<(UserId, Vec<Signature>)>,
    pub subkeys: Vec<KeyComponent>,
}

impl Key {
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        self.primary.fingerprint()
    }

    pub fn key_id(&self) -> Result<KeyId> {
        self.primary.key_id()
    }

    /// Declared preferred symmetric algorithms from the primary user ID's
    /// self-signature (subpacket type 11), in the key owner's ranked order.
    pub fn preferred_symmetric_algorithms(&self) -> Vec<SymmetricKeyAlgorithm> {
        for (_, sigs) in &self.user_ids {
            for sig in sigs {
                for sp in &sig.hashed_subpackets {
                    if let SubpacketData::PreferredSymmetricAlgorithms(algs) = &sp.data {
                        return algs.clone();
                    }
                }
            }
        }
        Vec::new()
    }

    /// spec.md §4.D `findKey`: linear scan matching the primary or any
    /// subkey key ID.
    pub fn find_key<'a>(key_id: &KeyId, keys: &'a [Key]) -> Option<&'a Key> {
        keys.iter().find(|k| {
            k.primary.has_key_id(key_id) || k.subkeys.iter().any(|s| s.has_key_id(key_id))
        })
    }

    /// spec.md §4.D `decryptionPacket`: the secret subkey whose declared
    /// use includes encryption and whose key ID matches, else the
    /// primary if it is itself encryption-capable.
    pub fn decryption_packet(&self, key_id: &KeyId) -> Option<&SecretKeyPacket> {
        for sub in &self.subkeys {
            if sub.key_flags().can_encrypt() && sub.has_key_id(key_id) {
                if let Some(secret) = &sub.secret {
                    return Some(secret);
                }
            }
        }
        if self.primary.key_flags().can_encrypt() && self.primary.has_key_id(key_id) {
            return self.primary.secret.as_ref();
        }
        None
    }

    /// spec.md §4.D `encryptionPacket`: prefer an encryption-flagged
    /// subkey bound by a valid self-signature, falling back to the
    /// primary only if no such subkey exists.
    pub fn encryption_packet(&self) -> Option<&PublicKeyPacket> {
        for sub in &self.subkeys {
            if sub.key_flags().can_encrypt() && sub.is_validly_bound(&self.primary.public) {
                return Some(&sub.public);
            }
        }
        if self.primary.public.algorithm.can_encrypt() {
            return Some(&self.primary.public);
        }
        None
    }

    /// The signing-capable packet to use for `sign`/`verify`: prefer a
    /// signing subkey, fall back to the primary.
    pub fn signing_component(&self) -> Option<&KeyComponent> {
        for sub in &self.subkeys {
            if sub.key_flags().can_sign() {
                return Some(sub);
            }
        }
        if self.primary.public.algorithm.can_sign() {
            return Some(&self.primary);
        }
        None
    }

    /// Public parameters for a given key ID within this key (primary or
    /// any subkey), used by `verify` to find the issuer's material.
    pub fn public_params_for(&self, key_id: &KeyId) -> Option<&PublicParams> {
        if self.primary.has_key_id(key_id) {
            return Some(&self.primary.public.public_params);
        }
        self.subkeys
            .iter()
            .find(|s| s.has_key_id(key_id))
            .map(|s| &s.public.public_params)
    }

    /// Group a flat packet stream (as produced by [`crate::packet::parse_packets`])
    /// into a sequence of [`Key`]s: each primary `PublicKey`/`SecretKey`
    /// packet starts a new key, consuming subsequent `UserId`,
    /// `UserAttribute`, `Signature`, and `Public/SecretSubkey` packets
    /// until the next primary key or end of stream.
    pub fn from_packets(packets: &[Packet]) -> Vec<Key> {
        let mut keys = Vec::new();
        let mut iter = packets.iter().peekable();

        while let Some(packet) = iter.next() {
            let (public, secret) = match packet {
                Packet::PublicKey(p) => (p.clone(), None),
                Packet::SecretKey(s) => (s.public.clone(), Some(s.clone())),
                _ => continue,
            };

            let mut primary = KeyComponent {
                public,
                secret,
                binding_signatures: Vec::new(),
            };
            let mut user_ids: Vec<(UserId, Vec<Signature>)> = Vec::new();
            let mut subkeys: Vec<KeyComponent> = Vec::new();

            while let Some(next) = iter.peek() {
                match next {
                    Packet::PublicKey(_) | Packet::SecretKey(_) => break,
                    Packet::Signature(sig) => {
                        if let Some((_, sigs)) = user_ids.last_mut() {
                            sigs.push(sig.clone());
                        } else if let Some(sub) = subkeys.last_mut() {
                            sub.binding_signatures.push(sig.clone());
                        } else {
                            primary.binding_signatures.push(sig.clone());
                        }
                        iter.next();
                    }
                    Packet::UserId(uid) => {
                        user_ids.push((uid.clone(), Vec::new()));
                        iter.next();
                    }
                    Packet::UserAttribute(_) => {
                        iter.next();
                    }
                    Packet::PublicSubkey(p) => {
                        subkeys.push(KeyComponent {
                            public: p.clone(),
                            secret: None,
                            binding_signatures: Vec::new(),
                        });
                        iter.next();
                    }
                    Packet::SecretSubkey(s) => {
                        subkeys.push(KeyComponent {
                            public: s.public.clone(),
                            secret: Some(s.clone()),
                            binding_signatures: Vec::new(),
                        });
                        iter.next();
                    }
                    _ => {
                        iter.next();
                    }
                }
            }

            keys.push(Key {
                primary,
                user_ids,
                subkeys,
            });
        }

        keys
    }
}

/// spec.md §4.D preferred-symmetric-algorithm resolution: intersect each
/// recipient key's declared preferences, pick the highest-ranked
/// algorithm common to all, default to AES-128 if the intersection (or
/// any key's declared list) is empty.
pub fn preferred_symmetric_algorithm(keys: &[&Key]) -> SymmetricKeyAlgorithm {
    let mut common: Option<Vec<SymmetricKeyAlgorithm>> = None;
    for key in keys {
        let prefs = key.preferred_symmetric_algorithms();
        common = Some(match common {
            None => prefs,
            Some(acc) => acc.into_iter().filter(|a| prefs.contains(a)).collect(),
        });
    }

    common
        .and_then(|algs| algs.into_iter().next())
        .unwrap_or(SymmetricKeyAlgorithm::AES128)
}
