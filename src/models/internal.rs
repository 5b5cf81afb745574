//! Lock file format and parsing. Not exposed beyond the models module.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A downloaded model with its provenance and checksums
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedModel {
    /// When this model was downloaded (RFC 3339)
    pub downloaded: String,
    pub source_model: String,
    pub source_tokenizer: String,
    pub sha256_model: String,
    pub sha256_tokenizer: String,
    pub size_bytes: u64,
    pub dimensions: usize,
}

/// The models.lock file, one TOML table per model:
///
/// ```toml
/// [all-minilm-l6-v2]
/// downloaded = "2026-01-12T09:14:00Z"
/// source_model = "https://huggingface.co/..."
/// sha256_model = "abc123..."
/// dimensions = 384
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelLock {
    #[serde(flatten)]
    models: BTreeMap<String, LockedModel>,
}

impl ModelLock {
    /// Load the lock file, or return empty if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read lock file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = "# kbase model lock file\n\
                      # Auto-generated - do not edit manually\n\
                      # Re-download with: kbase model add <name>\n\n";
        let content = toml::to_string_pretty(&self)?;

        fs::write(path, format!("{}{}", header, content))
            .with_context(|| format!("Failed to write lock file: {:?}", path))
    }

    pub fn get(&self, name: &str) -> Option<&LockedModel> {
        self.models.get(name)
    }

    pub fn insert(&mut self, name: &str, model: LockedModel) {
        self.models.insert(name.to_string(), model);
    }

    pub fn remove(&mut self, name: &str) -> Option<LockedModel> {
        self.models.remove(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> LockedModel {
        LockedModel {
            downloaded: "2026-01-12T09:14:00Z".to_string(),
            source_model: "https://huggingface.co/model_quantized.onnx".to_string(),
            source_tokenizer: "https://huggingface.co/tokenizer.json".to_string(),
            sha256_model: "abc123def456".to_string(),
            sha256_tokenizer: "789abc012def".to_string(),
            size_bytes: 23_000_000,
            dimensions: 384,
        }
    }

    #[test]
    fn test_missing_lock_is_empty() {
        let temp = TempDir::new().unwrap();
        let lock = ModelLock::load(&temp.path().join("models.lock")).unwrap();
        assert!(lock.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("models.lock");

        let mut lock = ModelLock::default();
        lock.insert("all-minilm-l6-v2", sample());
        lock.save(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# kbase model lock file"));
        assert!(written.contains("[all-minilm-l6-v2]"));

        let reloaded = ModelLock::load(&path).unwrap();
        assert_eq!(reloaded.get("all-minilm-l6-v2"), Some(&sample()));
        assert_eq!(reloaded.names(), vec!["all-minilm-l6-v2"]);
    }

    #[test]
    fn test_insert_remove() {
        let mut lock = ModelLock::default();
        lock.insert("a", sample());
        assert!(lock.get("a").is_some());
        assert!(lock.remove("a").is_some());
        assert!(lock.remove("a").is_none());
        assert!(lock.is_empty());
    }
}
