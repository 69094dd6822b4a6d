//! Small helpers layered over [`bytes::Buf`] for parsing packet bodies that
//! don't need nom's combinator machinery (most of them: a handful of
//! fixed-width fields and a length-prefixed tail).

use bytes::{Buf, Bytes};

use crate::errors::{Error, Result};

pub trait BufParsing: Buf + Sized {
    fn read_u8(&mut self) -> Result<u8> {
        if self.remaining() < 1 {
            return Err(Error::InvalidMessage {
                message: "unexpected end of input".into(),
            });
        }
        Ok(Buf::get_u8(self))
    }

    fn read_u16(&mut self) -> Result<u16> {
        if self.remaining() < 2 {
            return Err(Error::InvalidMessage {
                message: "unexpected end of input".into(),
            });
        }
        Ok(Buf::get_u16(self))
    }

    fn read_u32(&mut self) -> Result<u32> {
        if self.remaining() < 4 {
            return Err(Error::InvalidMessage {
                message: "unexpected end of input".into(),
            });
        }
        Ok(Buf::get_u32(self))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(Error::InvalidMessage {
                message: "unexpected end of input".into(),
            });
        }
        let mut buf = [0u8; N];
        self.copy_to_slice(&mut buf);
        Ok(buf)
    }

    fn read_take(&mut self, len: usize) -> Result<Bytes> {
        if self.remaining() < len {
            return Err(Error::InvalidMessage {
                message: "unexpected end of input".into(),
            });
        }
        Ok(self.copy_to_bytes(len))
    }

    fn rest(&mut self) -> Bytes {
        let len = self.remaining();
        self.copy_to_bytes(len)
    }
}

impl<B: Buf> BufParsing for B {}
