//! Composed message handling, spec.md §4.E and §6: the public operations
//! built on top of the packet codec, crypto facade, and key selection —
//! `readKeys`, `encrypt`, `decrypt`, `sign`, `verify`, plus the cleartext
//! signature framework and an ergonomic message builder.

pub mod cleartext;
pub mod message;

pub use cleartext::CleartextSignedMessage;
pub use message::builder::MessageBuilder;
pub use message::{decrypt, encrypt, read_keys, read_keys_from_file, sign, verify, PassphraseFn};
