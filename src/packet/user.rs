//! `UserID` (tag 13) and `UserAttribute` (tag 17) packets, RFC 4880
//! §5.11-5.12. Both are opaque payloads from the codec's point of view;
//! their binding `Signature` packets (which the pipeline does interpret)
//! live alongside them in a [`crate::key::PartialKey`].

use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::ser::Serialize;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserId {
    pub id: String,
}

impl UserId {
    pub fn from_str(id: impl Into<String>) -> Self {
        UserId { id: id.into() }
    }

    pub fn from_buf<B: Buf>(buf: B) -> Result<Self> {
        let bytes = buf.chunk().to_vec();
        Ok(UserId {
            id: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

impl Serialize for UserId {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.id.as_bytes())?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.id.len()
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct UserAttribute {
    pub data: Vec<u8>,
}

impl UserAttribute {
    pub fn from_buf<B: Buf>(buf: B) -> Result<Self> {
        Ok(UserAttribute {
            data: buf.chunk().to_vec(),
        })
    }
}

impl Serialize for UserAttribute {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}
