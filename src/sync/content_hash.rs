use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;

use derive_more::{AsRef, From};
use metrohash::MetroHash128;
use snafu::{ResultExt, Snafu};

/// Number of bytes in a [`ContentHash`].
pub const CONTENT_HASH_LENGTH: usize = 16;

/// Identifies file content that has been materialized out-of-band.
///
/// The engine never looks at file bytes; it only compares digests. Digests are
/// MetroHash128 values rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, AsRef)]
pub struct ContentHash([u8; CONTENT_HASH_LENGTH]);

impl ContentHash {
    /// Computes the digest of the supplied content.
    pub fn of(content: impl AsRef<[u8]>) -> Self {
        let mut hasher = MetroHash128::default();
        hasher.write(content.as_ref());
        let (high, low) = hasher.finish128();

        let mut bytes = [0u8; CONTENT_HASH_LENGTH];
        bytes[..8].copy_from_slice(&high.to_be_bytes());
        bytes[8..].copy_from_slice(&low.to_be_bytes());
        ContentHash(bytes)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = ContentHashParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; CONTENT_HASH_LENGTH];
        hex::decode_to_slice(value, &mut bytes).context(InvalidHexSnafu { value })?;
        Ok(ContentHash(bytes))
    }
}

#[derive(Debug, Snafu)]
pub enum ContentHashParseError {
    #[snafu(display("'{}' is not a {}-byte hex digest", value, CONTENT_HASH_LENGTH))]
    InvalidHexError {
        value: String,
        source: hex::FromHexError,
    },
}
