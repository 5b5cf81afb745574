//! Model registry for embedding models
//!
//! The registry is compiled into the binary so a store can always resolve its
//! model's dimension before any model file is touched.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{KnowledgeError, Result};

const REGISTRY_TOML: &str = include_str!("../../resources/models/registry.toml");

/// How a model's vectors are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// ONNX Runtime inference over downloaded model files
    Onnx,
    /// Deterministic feature hashing, no files
    Hashing,
}

/// Model definition from registry
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDefinition {
    /// Registry key, filled in after parsing
    #[serde(skip)]
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub engine: EngineKind,
    pub dimensions: usize,
    #[serde(default)]
    pub download_quantized: Option<String>,
    #[serde(default)]
    pub download_tokenizer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DefaultConfig {
    model: String,
}

/// Model registry (from resources/models/registry.toml)
#[derive(Debug, Deserialize)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelDefinition>,
    default: DefaultConfig,
}

impl ModelRegistry {
    /// The registry shipped with this build
    pub fn builtin() -> Result<Self> {
        Self::from_toml(REGISTRY_TOML)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut registry: Self = toml::from_str(content)
            .map_err(|e| KnowledgeError::Config(format!("invalid model registry: {}", e)))?;
        for (id, def) in registry.models.iter_mut() {
            def.id = id.clone();
        }
        if !registry.models.contains_key(&registry.default.model) {
            return Err(KnowledgeError::Config(format!(
                "default model '{}' is not in the registry",
                registry.default.model
            )));
        }
        Ok(registry)
    }

    /// Get model definition by name
    pub fn get(&self, name: &str) -> Result<&ModelDefinition> {
        self.models.get(name).ok_or_else(|| {
            KnowledgeError::Config(format!(
                "model '{}' not found in registry (available: {})",
                name,
                self.names().join(", ")
            ))
        })
    }

    pub fn default_model(&self) -> &ModelDefinition {
        &self.models[&self.default.model]
    }

    /// Registry names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }
}
