//! Capability interfaces to the algorithms RFC 4880 names, per §4.A of the
//! design: block ciphers, hashes, public-key encrypt/decrypt/sign/verify,
//! and the CSPRNG. Nothing above this module touches a concrete crypto
//! crate directly.

pub mod hash;
pub mod public_key;
pub mod secret_key;
pub mod sym;
