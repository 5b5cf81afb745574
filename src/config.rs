//! Settings for the knowledge store
//!
//! Layered: built-in defaults, then `~/.kbase/config.toml` (or an explicit
//! path), then environment overrides. Backend selection is derived from the
//! result: a non-empty Pinecone API key means the remote backend.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::KnowledgeError;
use crate::paths;
use crate::store::{DEFAULT_THRESHOLD, DEFAULT_TOP_K};

/// Default embedding model (registry name)
pub const DEFAULT_MODEL: &str = "all-minilm-l6-v2";

/// Default Pinecone index name
pub const DEFAULT_INDEX_NAME: &str = "jarvis-knowledge";

/// Default bound on every remote call
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const ENV_PINECONE_INDEX_NAME: &str = "PINECONE_INDEX_NAME";
pub const ENV_PINECONE_INDEX_HOST: &str = "PINECONE_INDEX_HOST";
pub const ENV_PINECONE_NAMESPACE: &str = "PINECONE_NAMESPACE";
pub const ENV_EMBEDDING_MODEL: &str = "KBASE_EMBEDDING_MODEL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embeddings: EmbeddingsSettings,
    pub search: SearchSettings,
    pub pinecone: PineconeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsSettings {
    /// Registry name of the embedding model
    pub model: String,
    /// Directory holding the model files, overriding the cache lookup
    pub model_dir: Option<String>,
}

impl Default for EmbeddingsSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            model_dir: None,
        }
    }
}

impl EmbeddingsSettings {
    /// Model directory override with `~` and `$VARS` expanded
    pub fn model_dir_path(&self) -> Option<PathBuf> {
        self.model_dir.as_ref().map(|dir| {
            let expanded = shellexpand::full(dir)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| dir.clone());
            PathBuf::from(expanded)
        })
    }
}

/// Defaults applied by `VectorStore::search` when the caller gives none
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub top_k: usize,
    pub threshold: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeSettings {
    pub api_key: String,
    pub index_name: String,
    /// Data-plane host; resolved through the control plane when absent
    pub index_host: Option<String>,
    pub namespace: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            index_host: None,
            namespace: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// Keep the key out of logs and panic messages
impl fmt::Debug for PineconeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PineconeSettings")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("index_name", &self.index_name)
            .field("index_host", &self.index_host)
            .field("namespace", &self.namespace)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl PineconeSettings {
    /// Remote backend is selected iff credentials are present
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Settings {
    /// Load from the default location, then apply environment overrides.
    ///
    /// A missing config file is not an error; defaults are used.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Load from an explicit path, then apply environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Self::default()
        };

        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings TOML")
    }

    /// Apply overrides from a key lookup (the process environment in practice).
    ///
    /// Empty values are ignored so an unset-but-exported variable does not
    /// clobber the file.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_PINECONE_API_KEY) {
            self.pinecone.api_key = key;
        }
        if let Some(name) = get(ENV_PINECONE_INDEX_NAME) {
            self.pinecone.index_name = name;
        }
        if let Some(host) = get(ENV_PINECONE_INDEX_HOST) {
            self.pinecone.index_host = Some(host);
        }
        if let Some(ns) = get(ENV_PINECONE_NAMESPACE) {
            self.pinecone.namespace = Some(ns);
        }
        if let Some(model) = get(ENV_EMBEDDING_MODEL) {
            self.embeddings.model = model;
        }
    }

    /// Reject settings the store cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.embeddings.model.trim().is_empty() {
            return Err(KnowledgeError::Config("embedding model name is empty".into()));
        }
        if self.search.top_k == 0 {
            return Err(KnowledgeError::Config("search.top_k must be at least 1".into()));
        }
        if !self.search.threshold.is_finite() {
            return Err(KnowledgeError::Config(format!(
                "search.threshold must be finite, got {}",
                self.search.threshold
            )));
        }
        if self.pinecone.is_configured() {
            if self.pinecone.index_name.trim().is_empty() && self.pinecone.index_host.is_none() {
                return Err(KnowledgeError::Config(
                    "pinecone.index_name or pinecone.index_host is required".into(),
                ));
            }
            if self.pinecone.timeout_secs == 0 {
                return Err(KnowledgeError::Config(
                    "pinecone.timeout_secs must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}
