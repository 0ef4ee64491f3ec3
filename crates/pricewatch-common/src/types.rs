//! The extraction-collaborator contract
//!
//! The page-extraction layer (browser automation, static scrapers) is an
//! external collaborator: it hands the pipeline one finite batch of raw
//! records and file blobs per run. The ad-hoc dictionaries the extractors
//! produce become these fixed-shape types with explicit optional fields; the
//! pipeline validates them at the ingestion boundary instead of trusting
//! them implicitly.

use serde::{Deserialize, Serialize};

/// One raw listing as produced by the extraction layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub title: String,

    /// Listing price. Missing when the page showed no price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,

    /// Percentage 0..=100 when the listing advertised a discount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<i32>,

    /// Units observed; extractors that don't track quantity omit it.
    #[serde(default = "default_quantity")]
    pub quantity: i32,

    /// 1-based results page the listing was found on.
    #[serde(default = "default_page_number")]
    pub page_number: i32,

    /// Listing URL; part of the identity contract.
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: String,

    /// Fingerprint precomputed by the extractor, when present. The pipeline
    /// recomputes it from the identity fields otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

fn default_page_number() -> i32 {
    1
}

/// One downloaded file blob plus its bookkeeping metadata.
///
/// Identity is the hash of `bytes`, never the URL: two URLs serving identical
/// content collapse to one stored row.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub source_url: String,
    pub bytes: Vec<u8>,
}

/// The unit of work for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionBatch {
    pub records: Vec<RawRecord>,
    pub files: Vec<RawFile>,
}

impl ExtractionBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len() + self.files.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_defaults() {
        let record: RawRecord = serde_json::from_str(
            r#"{"title": "Laptop", "url": "https://e.com/1"}"#,
        )
        .unwrap();

        assert_eq!(record.quantity, 1);
        assert_eq!(record.page_number, 1);
        assert!(record.price.is_none());
        assert!(record.fingerprint.is_none());
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_raw_record_full_shape() {
        let record: RawRecord = serde_json::from_str(
            r#"{
                "title": "Laptop",
                "price": 999.99,
                "original_price": 1299.99,
                "discount_percent": 23,
                "quantity": 3,
                "page_number": 2,
                "url": "https://e.com/1",
                "image_url": "https://e.com/1.jpg",
                "description": "A laptop",
                "category": "computers"
            }"#,
        )
        .unwrap();

        assert_eq!(record.price, Some(999.99));
        assert_eq!(record.discount_percent, Some(23));
        assert_eq!(record.page_number, 2);
    }

    #[test]
    fn test_batch_emptiness() {
        let batch = ExtractionBatch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
