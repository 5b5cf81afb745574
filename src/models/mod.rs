//! Model file management
//!
//! Resolves ONNX model files from the cache (`~/.kbase/cache/models/`),
//! downloads them on request and records provenance in `~/.kbase/models.lock`.
//!
//! ```text
//! registry.toml (in binary)  →  What models exist + where to fetch them
//!      ↓
//! models.lock                →  What's downloaded + checksums
//!      ↓
//! config.toml                →  What model the store uses
//!      ↓
//! this module                →  Path to the actual files
//! ```

mod download;
mod internal;

pub use download::{download_and_verify, download_file, sha256_file, verify_file};
pub use internal::{LockedModel, ModelLock};

use crate::embeddings::{EngineKind, ModelRegistry};
use crate::paths;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Valid = tokenizer.json + (model.onnx OR model_quantized.onnx)
pub fn has_valid_model_files(dir: &Path) -> bool {
    if !dir.join("tokenizer.json").exists() {
        return false;
    }
    dir.join("model.onnx").exists() || dir.join("model_quantized.onnx").exists()
}

/// Cached model directory, if its files are present
pub fn cached_model_path(name: &str) -> Option<PathBuf> {
    let dir = paths::models::model_dir(name);
    has_valid_model_files(&dir).then_some(dir)
}

/// Resolve the directory holding a model's files.
///
/// Resolution order:
/// 1. Cache (`~/.kbase/cache/models/{name}/`)
/// 2. Local project path (`resources/models/{name}/`)
pub fn resolve_model_path(name: &str) -> Result<PathBuf> {
    if let Some(path) = cached_model_path(name) {
        return Ok(path);
    }

    let local_path = PathBuf::from("resources/models").join(name);
    if has_valid_model_files(&local_path) {
        return Ok(local_path);
    }

    anyhow::bail!(
        "Model '{}' not found. Run `kbase model add {}` to download it.",
        name,
        name
    )
}

/// Where a model is available and where it came from
#[derive(Debug)]
pub struct ModelStatus {
    pub name: String,
    pub engine: EngineKind,
    pub dimensions: usize,
    /// Hashing models have no files and are always available
    pub available: bool,
    pub location: Option<PathBuf>,
    pub provenance: Option<LockedModel>,
}

pub fn model_status(name: &str) -> Result<ModelStatus> {
    let registry = ModelRegistry::builtin()?;
    let def = registry.get(name)?;
    let lock = ModelLock::load(&paths::models::lock_path())?;

    let location = match def.engine {
        EngineKind::Hashing => None,
        EngineKind::Onnx => resolve_model_path(name).ok(),
    };

    Ok(ModelStatus {
        name: name.to_string(),
        engine: def.engine,
        dimensions: def.dimensions,
        available: def.engine == EngineKind::Hashing || location.is_some(),
        location,
        provenance: lock.get(name).cloned(),
    })
}

/// Download a registry model into the cache.
///
/// 1. Gets download URLs from the registry
/// 2. Downloads model_quantized.onnx and tokenizer.json
/// 3. Records checksums and provenance in the lock file
pub fn add_model(name: &str) -> Result<PathBuf> {
    let registry = ModelRegistry::builtin()?;
    let def = registry.get(name)?;

    if def.engine == EngineKind::Hashing {
        anyhow::bail!("Model '{}' is computed in-process and has nothing to download", name);
    }

    let model_url = def
        .download_quantized
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No download URL for model '{}'", name))?;
    let tokenizer_url = def
        .download_tokenizer
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("No tokenizer URL for model '{}'", name))?;

    let lock_path = paths::models::lock_path();
    let mut lock = ModelLock::load(&lock_path)?;
    let known = lock.get(name).cloned();

    println!("Downloading {}...", name);
    let model_path = paths::models::model_quantized(name);
    println!("  Model:");
    let sha256_model = download_and_verify(
        model_url,
        &model_path,
        known.as_ref().map(|m| m.sha256_model.as_str()),
    )?;

    let tokenizer_path = paths::models::model_tokenizer(name);
    println!("  Tokenizer:");
    let sha256_tokenizer = download_and_verify(
        tokenizer_url,
        &tokenizer_path,
        known.as_ref().map(|m| m.sha256_tokenizer.as_str()),
    )?;

    let size_bytes =
        std::fs::metadata(&model_path)?.len() + std::fs::metadata(&tokenizer_path)?.len();

    lock.insert(
        name,
        LockedModel {
            downloaded: chrono::Utc::now().to_rfc3339(),
            source_model: model_url.clone(),
            source_tokenizer: tokenizer_url.clone(),
            sha256_model,
            sha256_tokenizer,
            size_bytes,
            dimensions: def.dimensions,
        },
    );
    lock.save(&lock_path)?;

    tracing::info!(model = name, bytes = size_bytes, "model cached");
    Ok(paths::models::model_dir(name))
}
