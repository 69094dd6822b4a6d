//! Message-processing core of an OpenPGP implementation: parse, compose,
//! encrypt, decrypt, sign and verify RFC 4880 packet streams.
//!
//! The public surface is small on purpose — [`read_keys`]/
//! [`read_keys_from_file`] to load a keyring, [`encrypt`]/[`decrypt`] and
//! [`sign`]/[`verify`] to drive the message pipeline, [`MessageBuilder`]
//! as an ergonomic front end for `encrypt`, and [`CleartextSignedMessage`]
//! for the `-----BEGIN PGP SIGNED MESSAGE-----` framework. Everything
//! below `composed` — the packet codec, the crypto facade, key selection,
//! and the armor boundary — is reachable for callers who need to work a
//! layer down, but `composed` is where the spec's external interface
//! lives.
//!
//! Key generation and a keyring-persistence layer are out of scope: this
//! crate consumes `PublicKey`/`SecretKey` packets, it does not mint them.

pub mod armor;
pub mod composed;
pub mod crypto;
pub mod errors;
pub mod key;
pub mod packet;
pub mod parsing;
pub mod ser;
pub mod types;

pub use composed::{
    decrypt, encrypt, read_keys, read_keys_from_file, sign, verify, CleartextSignedMessage,
    MessageBuilder, PassphraseFn,
};
pub use errors::{Error, Result};
pub use key::Key;
pub use packet::Packet;
