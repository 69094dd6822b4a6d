//! Ergonomic builder over [`super::encrypt`]: collect recipients, an
//! optional signer, and output options before driving the pipeline in one
//! call, instead of threading every positional argument by hand.

use rand::{CryptoRng, RngCore};

use crate::errors::Result;
use crate::key::Key;

use super::PassphraseFn;

/// Accumulates the inputs to [`super::encrypt`] and fires it on
/// [`MessageBuilder::build`]. Mirrors the shape of the message pipeline's
/// own parameter list; it does not change Encrypt's semantics, only how
/// a caller assembles the call.
#[derive(Default)]
pub struct MessageBuilder<'a> {
    recipients: Vec<Key>,
    sign_key: Option<&'a Key>,
    armored: bool,
}

impl<'a> MessageBuilder<'a> {
    pub fn new() -> Self {
        MessageBuilder {
            recipients: Vec::new(),
            sign_key: None,
            armored: false,
        }
    }

    /// Add one recipient; Encrypt produces one PKESK packet per recipient
    /// added this way.
    pub fn add_recipient(mut self, key: Key) -> Self {
        self.recipients.push(key);
        self
    }

    pub fn recipients(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.recipients.extend(keys);
        self
    }

    /// Sign the message with `key` before encrypting, embedding a
    /// one-pass-signature bracket instead of a bare compressed literal.
    pub fn sign_with(mut self, key: &'a Key) -> Self {
        self.sign_key = Some(key);
        self
    }

    /// Wrap the final ciphertext in ASCII armor (spec.md §4.C).
    pub fn armored(mut self, armored: bool) -> Self {
        self.armored = armored;
        self
    }

    pub fn build<R: CryptoRng + RngCore>(
        self,
        rng: R,
        data: &[u8],
        passphrase_cb: Option<PassphraseFn<'_>>,
    ) -> Result<Vec<u8>> {
        super::encrypt(
            rng,
            data,
            &self.recipients,
            self.sign_key,
            passphrase_cb,
            self.armored,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key::{PublicKeyAlgorithm, PublicParams};
    use crate::key::KeyComponent;
    use crate::packet::key::PublicKeyPacket;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn builder_with_no_recipients_errors() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let err = MessageBuilder::new()
            .armored(true)
            .build(&mut rng, b"hi", None)
            .unwrap_err();
        assert!(matches!(err, crate::errors::Error::InvalidMessage { .. }));
    }

    #[test]
    fn builder_armors_when_requested() {
        let mut rng = ChaCha8Rng::seed_from_u64(43);
        use x25519_dalek::{PublicKey, StaticSecret};
        let scalar = StaticSecret::random_from_rng(&mut rng);
        let public = PublicKeyPacket::new(
            false,
            Utc::now(),
            PublicKeyAlgorithm::X25519,
            PublicParams::X25519 {
                point: *PublicKey::from(&scalar).as_bytes(),
            },
        );
        let recipient = Key {
            primary: KeyComponent {
                public,
                secret: None,
                binding_signatures: Vec::new(),
            },
            user_ids: Vec::new(),
            subkeys: Vec::new(),
        };

        let out = MessageBuilder::new()
            .add_recipient(recipient)
            .armored(true)
            .build(&mut rng, b"hello", None)
            .unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("-----BEGIN PGP MESSAGE-----"));
    }
}
