//! `Marker` packet, tag 10, RFC 4880 §5.8: a fixed 3-octet body (`"PGP"`)
//! some implementations emit at the start of a keyring; readers must
//! accept and ignore it.

use std::io;

use bytes::Buf;

use crate::errors::{ensure_eq, Result};
use crate::ser::Serialize;

const BODY: [u8; 3] = *b"PGP";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Marker;

impl Marker {
    pub fn from_buf<B: Buf>(buf: B) -> Result<Self> {
        ensure_eq!(buf.chunk(), &BODY[..], "malformed marker packet body");
        Ok(Marker)
    }
}

impl Serialize for Marker {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&BODY)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_roundtrip() {
        let bytes = Marker.to_bytes().unwrap();
        assert_eq!(Marker::from_buf(&bytes[..]).unwrap(), Marker);
    }
}
