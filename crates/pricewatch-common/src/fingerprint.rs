//! Content fingerprinting for deduplication
//!
//! A fingerprint is a SHA-256 digest over the fields that define identity for
//! an entity: title + price + source URL for a scraped record, the raw bytes
//! for a downloaded file. The field selection and ordering are part of the
//! identity contract; changing either changes what "the same record" means
//! and must be treated as a breaking schema change.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use thiserror::Error;

/// Separator written between identity fields so that adjacent fields cannot
/// collide by concatenation ("ab" + "c" vs "a" + "bc").
const FIELD_SEPARATOR: u8 = 0x1f;

/// Placeholder digested in place of a missing optional field. A `None` must
/// still contribute to the digest, otherwise two records differing only by a
/// missing field would collide.
const NONE_PLACEHOLDER: &[u8] = b"\x00<none>\x00";

/// Errors from the streaming hash path
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("IO error while hashing: {0}")]
    Io(#[from] std::io::Error),
}

/// A stable content fingerprint: lowercase hex SHA-256, 64 characters.
///
/// Used as the durable unique key for scraped records and downloaded files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of a raw byte blob (file identity).
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hex::encode(hasher.finalize()))
    }

    /// Fingerprint of any readable source, hashed in chunks.
    pub fn of_reader<R: Read>(reader: &mut R) -> Result<Self, FingerprintError> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Wrap a fingerprint the extractor already computed. Returns `None`
    /// unless the value looks like a lowercase hex SHA-256 digest.
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(value.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// For values read back from the store. Assumes the string was originally
/// produced by this module; no re-validation.
impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental builder over an ordered sequence of identity fields.
///
/// The caller decides which fields participate and in what order; the builder
/// guarantees that missing values and field boundaries are encoded stably.
///
/// # Example
///
/// ```
/// use pricewatch_common::fingerprint::FingerprintBuilder;
///
/// let fp = FingerprintBuilder::new()
///     .field("Gaming Laptop")
///     .optional_field(Some("1299.99"))
///     .field("https://example.com/item/42")
///     .finish();
/// assert_eq!(fp.as_str().len(), 64);
/// ```
#[derive(Debug, Default)]
pub struct FingerprintBuilder {
    hasher: Sha256,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a required identity field.
    pub fn field(mut self, value: &str) -> Self {
        self.hasher.update(value.as_bytes());
        self.hasher.update([FIELD_SEPARATOR]);
        self
    }

    /// Append an optional identity field. `None` digests a fixed placeholder
    /// rather than being skipped.
    pub fn optional_field(self, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.field(v),
            None => {
                let mut this = self;
                this.hasher.update(NONE_PLACEHOLDER);
                this.hasher.update([FIELD_SEPARATOR]);
                this
            }
        }
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint(hex::encode(self.hasher.finalize()))
    }
}

/// Identity contract for scraped records: title + price + source URL.
///
/// Deliberately excludes fields that legitimately drift between sightings
/// (quantity, discount, timestamps).
pub fn record_fingerprint(title: &str, price: Option<&str>, source_url: &str) -> Fingerprint {
    FingerprintBuilder::new()
        .field(title)
        .optional_field(price)
        .field(source_url)
        .finish()
}
