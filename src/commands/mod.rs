pub mod knowledge;
pub mod model;
pub mod shell;

use anyhow::{Context, Result};
use kbase::{Settings, VectorStore};
use std::path::Path;

/// Load settings (explicit path or default location) and open a store
pub fn open_store(config: Option<&Path>) -> Result<VectorStore> {
    let settings = match config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    VectorStore::open(&settings).context("Failed to open knowledge store")
}
