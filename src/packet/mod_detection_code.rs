//! `ModificationDetectionCode` packet, tag 19, RFC 4880 §5.14: a fixed
//! 20-octet SHA-1 digest over the SEIPD prefix and inner packets, up to
//! (not including) this packet's own header.

use std::io;

use bytes::Buf;

use crate::errors::{ensure_eq, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ModDetectionCode {
    pub hash: [u8; 20],
}

impl ModDetectionCode {
    pub fn new(hash: [u8; 20]) -> Self {
        ModDetectionCode { hash }
    }

    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        ensure_eq!(buf.remaining(), 20, "MDC body must be exactly 20 bytes");
        Ok(ModDetectionCode {
            hash: buf.read_array::<20>()?,
        })
    }
}

impl Serialize for ModDetectionCode {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.hash)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        20
    }
}
