//! Multi-Precision Integers, RFC 4880 §3.2: a two-octet scalar bit count
//! followed by that many bits, big-endian, with no leading zero byte.

use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Mpi(Vec<u8>);

impl Mpi {
    /// Build an `Mpi` from a big-endian byte slice, stripping leading
    /// zero bytes (but keeping at least one byte for the value zero).
    pub fn from_slice(data: &[u8]) -> Self {
        let mut start = 0;
        while start < data.len() - 1 && data[start] == 0 {
            start += 1;
        }
        Mpi(data[start..].to_vec())
    }

    pub fn as_ref(&self) -> MpiRef<'_> {
        MpiRef(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Mpi {
    fn from(data: Vec<u8>) -> Self {
        Mpi::from_slice(&data)
    }
}

/// A borrowed view over MPI bytes, as produced while parsing a buffer we
/// don't want to copy yet.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MpiRef<'a>(&'a [u8]);

impl<'a> MpiRef<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    pub fn to_owned(self) -> Mpi {
        Mpi(self.0.to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> AsRef<[u8]> for MpiRef<'a> {
    fn as_ref(&self) -> &[u8] {
        self.0
    }
}

fn bit_count(data: &[u8]) -> u16 {
    match data.first() {
        None => 0,
        Some(&first) => ((data.len() - 1) * 8 + (8 - first.leading_zeros() as usize)) as u16,
    }
}

impl Serialize for MpiRef<'_> {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let bits = bit_count(self.0);
        writer.write_all(&bits.to_be_bytes())?;
        writer.write_all(self.0)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.0.len()
    }
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.as_ref().to_writer(writer)
    }

    fn write_len(&self) -> usize {
        self.as_ref().write_len()
    }
}

/// Parse a single MPI from the front of `buf`.
pub fn mpi<B: Buf>(buf: &mut B) -> Result<Mpi> {
    let bits = buf.read_u16()?;
    let bytes = (bits as usize).div_ceil(8);
    let data = buf.read_take(bytes)?;
    Ok(Mpi::from_slice(&data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mpi_roundtrip() {
        let values: &[&[u8]] = &[&[0x01], &[0xFF, 0xFF], &[0x00, 0x01], &[0x00]];
        for v in values {
            let m = Mpi::from_slice(v);
            let bytes = m.to_bytes().unwrap();
            let mut slice = &bytes[..];
            let parsed = mpi(&mut slice).unwrap();
            assert_eq!(m, parsed);
        }
    }

    #[test]
    fn mpi_bit_count() {
        let m = Mpi::from_slice(&[0x01]);
        assert_eq!(m.to_bytes().unwrap()[..2], [0x00, 0x01]);

        let m = Mpi::from_slice(&[0xFF]);
        assert_eq!(m.to_bytes().unwrap()[..2], [0x00, 0x08]);
    }
}
