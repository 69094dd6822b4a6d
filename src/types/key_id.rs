use std::fmt;

/// The last 8 octets of a V4 key's 20-octet SHA-1 fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 8]);

impl KeyId {
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let arr: [u8; 8] = data.try_into().ok()?;
        Some(KeyId(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == [0u8; 8]
    }
}

impl From<[u8; 8]> for KeyId {
    fn from(data: [u8; 8]) -> Self {
        KeyId(data)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.0))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}
