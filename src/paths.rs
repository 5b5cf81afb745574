//! Single source of truth for the kbase filesystem layout.
//!
//! This module defines WHERE data lives. It has no I/O and no validation.
//! The knowledge records themselves are never written to disk: only
//! configuration and downloaded model files live here.
//!
//! ```text
//! ~/.kbase/                    # or $KBASE_HOME
//! ├── config.toml              # User settings
//! ├── models.lock              # Download provenance
//! └── cache/
//!     └── models/{name}/       # model.onnx / model_quantized.onnx + tokenizer.json
//! ```

use std::path::PathBuf;

/// Environment variable that relocates the kbase home directory
pub const ENV_HOME: &str = "KBASE_HOME";

/// kbase home directory: `$KBASE_HOME` or `~/.kbase/`
pub fn kbase_home() -> PathBuf {
    if let Ok(home) = std::env::var(ENV_HOME) {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kbase")
}

/// Rebuildable data: `~/.kbase/cache/`
pub fn kbase_cache() -> PathBuf {
    kbase_home().join("cache")
}

/// User config file: `~/.kbase/config.toml`
pub fn config_path() -> PathBuf {
    kbase_home().join("config.toml")
}

/// Embedding model files
pub mod models {
    use super::*;

    /// Model cache directory: `~/.kbase/cache/models/`
    pub fn cache_dir() -> PathBuf {
        kbase_cache().join("models")
    }

    /// Specific model directory: `~/.kbase/cache/models/{name}/`
    pub fn model_dir(name: &str) -> PathBuf {
        cache_dir().join(name)
    }

    /// Quantized ONNX file, the one `model add` downloads
    pub fn model_quantized(name: &str) -> PathBuf {
        model_dir(name).join("model_quantized.onnx")
    }

    /// Tokenizer: `~/.kbase/cache/models/{name}/tokenizer.json`
    pub fn model_tokenizer(name: &str) -> PathBuf {
        model_dir(name).join("tokenizer.json")
    }

    /// Lock file tracking provenance: `~/.kbase/models.lock`
    pub fn lock_path() -> PathBuf {
        kbase_home().join("models.lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_under_home() {
        let cache = kbase_cache();
        assert!(cache.starts_with(kbase_home()));
        assert!(config_path().starts_with(kbase_home()));
    }

    #[test]
    fn test_models_paths() {
        let cache = models::cache_dir();
        assert!(cache.to_string_lossy().contains("cache/models"));

        let quantized = models::model_quantized("all-minilm-l6-v2");
        assert!(quantized
            .to_string_lossy()
            .ends_with("all-minilm-l6-v2/model_quantized.onnx"));

        let tokenizer = models::model_tokenizer("all-minilm-l6-v2");
        assert!(tokenizer
            .to_string_lossy()
            .ends_with("all-minilm-l6-v2/tokenizer.json"));

        let lock = models::lock_path();
        assert!(lock.to_string_lossy().ends_with("models.lock"));
        // Lock sits next to config, not in the rebuildable cache
        assert!(!lock.to_string_lossy().contains("cache"));
    }
}
