//! RFC 4880 §9.3 compression algorithm identifiers.

use num_enum::{IntoPrimitive, TryFromPrimitiveError};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, IntoPrimitive, Default)]
#[repr(u8)]
pub enum CompressionAlgorithm {
    #[default]
    Uncompressed = 0,
    ZIP = 1,
    ZLIB = 2,
    BZip2 = 3,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl From<u8> for CompressionAlgorithm {
    fn from(v: u8) -> Self {
        match CompressionAlgorithmKnown::try_from(v) {
            Ok(alg) => alg.into(),
            Err(TryFromPrimitiveError { number }) => CompressionAlgorithm::Unknown(number),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
enum CompressionAlgorithmKnown {
    Uncompressed = 0,
    ZIP = 1,
    ZLIB = 2,
    BZip2 = 3,
}

impl From<CompressionAlgorithmKnown> for CompressionAlgorithm {
    fn from(v: CompressionAlgorithmKnown) -> Self {
        match v {
            CompressionAlgorithmKnown::Uncompressed => CompressionAlgorithm::Uncompressed,
            CompressionAlgorithmKnown::ZIP => CompressionAlgorithm::ZIP,
            CompressionAlgorithmKnown::ZLIB => CompressionAlgorithm::ZLIB,
            CompressionAlgorithmKnown::BZip2 => CompressionAlgorithm::BZip2,
        }
    }
}

/// Intersect each recipient's preferred-compression-algorithm list
/// (signature subpacket 34) and pick the highest-ranked common algorithm,
/// defaulting to ZLIB when the intersection is empty or no preferences
/// were declared at all — RFC 4880 doesn't rank compression algorithms,
/// so "highest-ranked" here just means earliest in this fixed preference
/// order, matching how `preferred_symmetric_algorithm` resolves §4.D.
pub fn preferred_compression_algorithm(preferences: &[Vec<CompressionAlgorithm>]) -> CompressionAlgorithm {
    const RANK: [CompressionAlgorithm; 3] = [
        CompressionAlgorithm::ZLIB,
        CompressionAlgorithm::BZip2,
        CompressionAlgorithm::ZIP,
    ];

    if preferences.is_empty() {
        return CompressionAlgorithm::ZLIB;
    }

    for candidate in RANK {
        if preferences.iter().all(|prefs| prefs.is_empty() || prefs.contains(&candidate)) {
            return candidate;
        }
    }
    CompressionAlgorithm::ZLIB
}
