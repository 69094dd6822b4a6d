mod compression;
mod fingerprint;
mod key_id;
mod mpi;
mod packet;
mod pkesk;
mod s2k;
mod subpacket;

pub use self::compression::*;
pub use self::fingerprint::*;
pub use self::key_id::*;
pub use self::mpi::*;
pub use self::packet::*;
pub use self::pkesk::PkeskBytes;
pub use self::s2k::*;
pub use self::subpacket::*;

/// An OpenPGP cryptographic signature.
///
/// Historically, cryptographic signatures in OpenPGP were encoded as a
/// sequence of [`Mpi`]s; Ed25519 signatures use native fixed-width
/// encoding instead. This type represents both flavors.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SignatureBytes {
    Mpis(Vec<Mpi>),
    Native(Vec<u8>),
}

impl SignatureBytes {
    pub(crate) fn to_writer<W: std::io::Write>(&self, writer: &mut W) -> crate::errors::Result<()> {
        use crate::ser::Serialize;

        match self {
            SignatureBytes::Mpis(mpis) => {
                for val in mpis {
                    val.to_writer(writer)?;
                }
            }
            SignatureBytes::Native(sig) => {
                writer.write_all(sig)?;
            }
        }
        Ok(())
    }

    pub(crate) fn write_len(&self) -> usize {
        use crate::ser::Serialize;
        match self {
            SignatureBytes::Mpis(mpis) => mpis.iter().map(|m| m.write_len()).sum(),
            SignatureBytes::Native(sig) => sig.len(),
        }
    }
}

impl From<Vec<Mpi>> for SignatureBytes {
    fn from(value: Vec<Mpi>) -> Self {
        SignatureBytes::Mpis(value)
    }
}

impl From<Vec<u8>> for SignatureBytes {
    fn from(value: Vec<u8>) -> Self {
        SignatureBytes::Native(value)
    }
}
