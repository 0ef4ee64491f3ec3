//! Pricewatch Common Library
//!
//! Shared building blocks for the pricewatch workspace:
//!
//! - **Fingerprinting**: content-addressed identity hashing for scraped
//!   records and downloaded files
//! - **Logging**: centralized tracing configuration
//! - **Types**: the raw extraction-batch contract consumed by the pipeline
//!
//! # Example
//!
//! ```
//! use pricewatch_common::fingerprint::Fingerprint;
//!
//! let fp = Fingerprint::of_bytes(b"hello world");
//! assert_eq!(fp.as_str().len(), 64);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod fingerprint;
pub mod logging;
pub mod types;

pub use fingerprint::{Fingerprint, FingerprintBuilder, FingerprintError};
pub use types::{ExtractionBatch, RawFile, RawRecord};
