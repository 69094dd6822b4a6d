//! Byte-exact serialization.
//!
//! Every packet body and every sub-structure that appears inside one
//! implements [`Serialize`]. `write_len` must always equal the number of
//! bytes `to_writer` actually emits — several proptests in this crate
//! check exactly that.

use std::io;

use crate::errors::Result;

pub trait Serialize {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()>;

    fn write_len(&self) -> usize;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.write_len());
        self.to_writer(&mut out)?;
        Ok(out)
    }
}

impl Serialize for [u8] {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.len()
    }
}

impl Serialize for Vec<u8> {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.len()
    }
}
