//! `Trust` packet, tag 12, RFC 4880 §5.10: implementation-specific trust
//! data, opaque to this crate. Preserved byte-for-byte on round-trip.

use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Trust {
    pub data: Vec<u8>,
}

impl Trust {
    pub fn from_buf<B: Buf>(mut buf: B) -> Result<Self> {
        Ok(Trust {
            data: buf.rest().to_vec(),
        })
    }
}

impl Serialize for Trust {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}
