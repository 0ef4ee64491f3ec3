//! Runtime configuration
//!
//! Everything comes from environment variables, with `.env` loaded first if
//! present. Database settings are delegated to the store crate.

use anyhow::Result;
use pricewatch_store::DbConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub db: DbConfig,
    /// Directory the extraction layer saves file blobs into; manifest
    /// `storage_path` entries are resolved against it.
    pub downloads_dir: PathBuf,
}

impl Config {
    /// Load from the environment. Fails when `DATABASE_URL` is unset.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let db = DbConfig::from_env()?;
        let downloads_dir = std::env::var("DOWNLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./downloads"));

        Ok(Self { db, downloads_dir })
    }
}
