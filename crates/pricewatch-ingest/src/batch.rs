//! Batch file loading
//!
//! The extraction layer writes one JSON manifest per scrape run: the raw
//! records inline, the downloaded files as metadata entries pointing at blobs
//! on disk. This module turns that manifest into an in-memory
//! `ExtractionBatch` ready for the pipeline.

use anyhow::{Context, Result};
use pricewatch_common::{ExtractionBatch, RawFile, RawRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk manifest shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchManifest {
    #[serde(default)]
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

/// One downloaded-file entry in the manifest. `storage_path` is relative to
/// the downloads directory.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub source_url: String,
}

/// Load a manifest and resolve its file entries against `downloads_dir`.
///
/// A missing or unreadable blob fails the load: a batch that references
/// bytes we cannot hash has no usable file identity.
pub fn load_batch(manifest_path: &Path, downloads_dir: &Path) -> Result<ExtractionBatch> {
    let raw = std::fs::read_to_string(manifest_path)
        .with_context(|| format!("Failed to read batch manifest {}", manifest_path.display()))?;
    let manifest: BatchManifest = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid batch manifest {}", manifest_path.display()))?;

    let mut files = Vec::with_capacity(manifest.files.len());
    for entry in manifest.files {
        let blob_path = downloads_dir.join(&entry.storage_path);
        let bytes = std::fs::read(&blob_path)
            .with_context(|| format!("Failed to read downloaded file {}", blob_path.display()))?;
        files.push(RawFile {
            filename: entry.filename,
            storage_path: entry.storage_path,
            mime_type: entry.mime_type,
            source_url: entry.source_url,
            bytes,
        });
    }

    tracing::debug!(
        manifest = %manifest_path.display(),
        records = manifest.records.len(),
        files = files.len(),
        "Loaded extraction batch"
    );

    Ok(ExtractionBatch {
        records: manifest.records,
        files,
    })
}
