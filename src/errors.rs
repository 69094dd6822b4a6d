//! Error taxonomy surfaced across the public boundary.
//!
//! Every public operation in [`crate::composed`] reports failures through
//! [`Error`] rather than panicking; the pipeline short-circuits on the
//! first error it meets instead of returning partial plaintext.

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type IResult<I, O, E = Error> = nom::IResult<I, O, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Structural parse failure, or a message with no usable content.
    #[snafu(display("invalid message: {message}"))]
    InvalidMessage { message: String },

    /// A signature is present but does not verify, or the issuer key is missing.
    #[snafu(display("invalid signature: {message}"))]
    InvalidSignature { message: String },

    /// Verification was requested but the message carries no signature.
    #[snafu(display("message is not signed"))]
    NotSigned,

    /// A locked secret key was needed and the passphrase callback returned nothing.
    #[snafu(display("passphrase required"))]
    PassphraseRequired,

    /// The supplied passphrase failed the S2K integrity check.
    #[snafu(display("incorrect passphrase"))]
    PassphraseIncorrect,

    /// MDC mismatch (or absence) on a SEIPD packet.
    #[snafu(display("integrity check failed"))]
    IntegrityCheckFailed,

    /// The crypto facade does not know the requested algorithm.
    #[snafu(display("crypto primitive unavailable: {message}"))]
    CryptoUnavailable { message: String },

    /// The crypto facade rejected the operation.
    #[snafu(display("crypto operation failed: {message}"))]
    CryptoFailure { message: String },

    /// A recognized-but-unimplemented algorithm identifier.
    #[snafu(display("unsupported: {message}"))]
    Unsupported { message: String },

    /// Recognized-but-unimplemented feature, distinct from an algorithm gap.
    #[snafu(display("not implemented: {message}"))]
    Unimplemented { message: String },

    #[snafu(display("io error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("utf8 error: {source}"))]
    Utf8 { source: std::str::Utf8Error },

    #[snafu(display("integer conversion error: {source}"))]
    TryFromInt { source: std::num::TryFromIntError },

    #[snafu(display("{message}"))]
    Message { message: String },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(source: std::str::Utf8Error) -> Self {
        Error::Utf8 { source }
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(source: std::num::TryFromIntError) -> Self {
        Error::TryFromInt { source }
    }
}

impl nom::error::ParseError<&[u8]> for Error {
    fn from_error_kind(_input: &[u8], kind: nom::error::ErrorKind) -> Self {
        Error::Message {
            message: format!("parse error: {kind:?}"),
        }
    }

    fn append(_input: &[u8], _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

/// Construct and return an [`Error::Message`].
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::errors::Error::Message { message: format!($($arg)*) })
    };
}

/// Return early with an error unless the condition holds.
macro_rules! ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::errors::bail!($($arg)*);
        }
    };
}

/// Return early with an error unless the two values are equal.
macro_rules! ensure_eq {
    ($a:expr, $b:expr, $($arg:tt)*) => {
        if $a != $b {
            $crate::errors::bail!($($arg)*);
        }
    };
    ($a:expr, $b:expr) => {
        if $a != $b {
            $crate::errors::bail!("{} != {}: {:?} != {:?}", stringify!($a), stringify!($b), $a, $b);
        }
    };
}

macro_rules! unsupported_err {
    ($($arg:tt)*) => {
        return Err($crate::errors::Error::Unsupported { message: format!($($arg)*) })
    };
}

macro_rules! unimplemented_err {
    ($($arg:tt)*) => {
        return Err($crate::errors::Error::Unimplemented { message: format!($($arg)*) })
    };
}

pub(crate) use bail;
pub(crate) use ensure;
pub(crate) use ensure_eq;
pub(crate) use unimplemented_err;
pub(crate) use unsupported_err;
