//! Embeddings module - turn text into fixed-length vectors
//!
//! [`EmbeddingEngine`] is the trait the concrete engines implement (ONNX
//! inference, feature hashing). [`EmbeddingProvider`] is what a store owns:
//! it loads its engine lazily and only once, serialises calls through a
//! single lock, and applies the empty-text policy so that embedding is total
//! over all text.

mod hashing;
pub mod models;
mod onnx;
mod similarity;

pub use hashing::HashingEmbedder;
pub use models::{EngineKind, ModelDefinition, ModelRegistry};
pub use onnx::OnnxEmbedder;
pub use similarity::{cosine_similarity, dot, euclidean_distance, l2_normalize, norm};

use parking_lot::Mutex;
use std::path::PathBuf;

use crate::error::{KnowledgeError, Result};

/// Trait for embedding generation engines
///
/// Requires Send so a provider holding one can be shared across threads.
pub trait EmbeddingEngine: Send {
    /// Generate embedding for a single text
    fn embed(&mut self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    fn embed_batch(&mut self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Embedding dimension (e.g., 384 for all-MiniLM-L6-v2)
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Build the engine a registry entry describes.
///
/// `model_dir` overrides the cache lookup for ONNX models.
pub fn create_engine(
    model: &ModelDefinition,
    model_dir: Option<&std::path::Path>,
) -> anyhow::Result<Box<dyn EmbeddingEngine>> {
    match model.engine {
        EngineKind::Hashing => Ok(Box::new(HashingEmbedder::new(model.dimensions))),
        EngineKind::Onnx => {
            let dir = match model_dir {
                Some(dir) => dir.to_path_buf(),
                None => crate::models::resolve_model_path(&model.id)?,
            };
            Ok(Box::new(OnnxEmbedder::from_dir(
                &dir,
                &model.id,
                model.dimensions,
            )?))
        }
    }
}

type EngineLoader = Box<dyn Fn() -> anyhow::Result<Box<dyn EmbeddingEngine>> + Send + Sync>;

/// Lazily-initialised, shareable embedding engine
///
/// The expensive model load happens on the first non-blank `embed` call and
/// is never repeated after it succeeds. All calls go through one mutex, so an
/// engine that needs `&mut self` for inference is used by one caller at a
/// time. Share a provider between stores with `Arc` to share the model.
pub struct EmbeddingProvider {
    model_name: String,
    dimension: usize,
    engine: Mutex<Option<Box<dyn EmbeddingEngine>>>,
    loader: EngineLoader,
}

impl EmbeddingProvider {
    /// Provider whose engine is produced by `loader` on first use
    pub fn new<F>(model_name: impl Into<String>, dimension: usize, loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn EmbeddingEngine>> + Send + Sync + 'static,
    {
        Self {
            model_name: model_name.into(),
            dimension,
            engine: Mutex::new(None),
            loader: Box::new(loader),
        }
    }

    /// Provider for a registry model
    pub fn from_definition(model: &ModelDefinition, model_dir: Option<PathBuf>) -> Self {
        let def = model.clone();
        Self::new(model.id.clone(), model.dimensions, move || {
            create_engine(&def, model_dir.as_deref())
        })
    }

    /// Deterministic feature-hashing provider; needs no model files
    pub fn hashing(dimension: usize) -> Self {
        Self::new(format!("hashing-{}", dimension), dimension, move || {
            Ok(Box::new(HashingEmbedder::new(dimension)))
        })
    }

    /// Embed `text` into a vector of exactly [`dimension`](Self::dimension) floats.
    ///
    /// Blank text (empty or whitespace only) carries no information and maps to
    /// the zero vector without touching the model.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let mut guard = self.engine.lock();
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        let Some(engine) = guard.as_mut() else {
            return Err(KnowledgeError::Embedding(format!(
                "model '{}' is not loaded",
                self.model_name
            )));
        };

        let vector = engine.embed(text).map_err(|e| {
            KnowledgeError::Embedding(format!("model '{}': {:#}", self.model_name, e))
        })?;

        if vector.len() != self.dimension {
            return Err(KnowledgeError::Embedding(format!(
                "model '{}' returned {} values, expected {}",
                self.model_name,
                vector.len(),
                self.dimension
            )));
        }
        Ok(vector)
    }

    fn load(&self) -> Result<Box<dyn EmbeddingEngine>> {
        tracing::info!(model = %self.model_name, "loading embedding model");
        let engine = (self.loader)().map_err(|e| {
            KnowledgeError::Embedding(format!(
                "failed to load model '{}': {:#}",
                self.model_name, e
            ))
        })?;

        if engine.dimension() != self.dimension {
            return Err(KnowledgeError::Embedding(format!(
                "model '{}' has dimension {}, expected {}",
                self.model_name,
                engine.dimension(),
                self.dimension
            )));
        }
        tracing::debug!(model = %self.model_name, dimension = self.dimension, "embedding model ready");
        Ok(engine)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.lock().is_some()
    }

    /// Release the loaded engine. Returns whether one was loaded.
    ///
    /// A later `embed` loads it again.
    pub fn unload(&self) -> bool {
        let released = self.engine.lock().take().is_some();
        if released {
            tracing::debug!(model = %self.model_name, "embedding model released");
        }
        released
    }
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Engine that returns a fixed-length vector regardless of input
    struct FixedEngine {
        len: usize,
        claimed: usize,
    }

    impl EmbeddingEngine for FixedEngine {
        fn embed(&mut self, _text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![1.0; self.len])
        }
        fn dimension(&self) -> usize {
            self.claimed
        }
        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_blank_text_is_zero_vector_without_loading() {
        let provider = EmbeddingProvider::new("never", 8, || anyhow::bail!("must not load"));
        assert_eq!(provider.embed("").unwrap(), vec![0.0; 8]);
        assert_eq!(provider.embed(" \n\t").unwrap(), vec![0.0; 8]);
        assert!(!provider.is_loaded());
    }

    #[test]
    fn test_load_happens_once_across_threads() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let provider = Arc::new(EmbeddingProvider::new("counted", 32, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(HashingEmbedder::new(32)) as Box<dyn EmbeddingEngine>)
        }));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let provider = Arc::clone(&provider);
                std::thread::spawn(move || provider.embed(&format!("text number {}", i)).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().len(), 32);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(provider.is_loaded());
    }

    #[test]
    fn test_failed_load_is_embedding_error() {
        let provider = EmbeddingProvider::new("broken", 4, || anyhow::bail!("file missing"));
        match provider.embed("hello") {
            Err(KnowledgeError::Embedding(msg)) => {
                assert!(msg.contains("broken"));
                assert!(msg.contains("file missing"));
            }
            other => panic!("expected Embedding error, got {:?}", other),
        }
        assert!(!provider.is_loaded());
    }

    #[test]
    fn test_engine_dimension_must_match() {
        let provider = EmbeddingProvider::new("liar", 4, || {
            Ok(Box::new(FixedEngine { len: 4, claimed: 5 }) as Box<dyn EmbeddingEngine>)
        });
        assert!(matches!(
            provider.embed("x"),
            Err(KnowledgeError::Embedding(_))
        ));
    }

    #[test]
    fn test_output_length_checked() {
        let provider = EmbeddingProvider::new("short", 4, || {
            Ok(Box::new(FixedEngine { len: 3, claimed: 4 }) as Box<dyn EmbeddingEngine>)
        });
        match provider.embed("x") {
            Err(KnowledgeError::Embedding(msg)) => assert!(msg.contains("returned 3 values")),
            other => panic!("expected Embedding error, got {:?}", other),
        }
    }

    #[test]
    fn test_unload_then_reload() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let provider = EmbeddingProvider::new("reload", 16, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(HashingEmbedder::new(16)) as Box<dyn EmbeddingEngine>)
        });

        let first = provider.embed("same text").unwrap();
        assert!(provider.unload());
        assert!(!provider.unload());
        let second = provider.embed("same text").unwrap();

        assert_eq!(first, second);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_create_engine_hashing() {
        let registry = ModelRegistry::builtin().unwrap();
        let def = registry.get("hashing-384").unwrap();
        let mut engine = create_engine(def, None).unwrap();
        assert_eq!(engine.dimension(), 384);
        assert_eq!(engine.embed("hello").unwrap().len(), 384);
    }

    #[test]
    fn test_create_engine_onnx_missing_dir() {
        let registry = ModelRegistry::builtin().unwrap();
        let def = registry.get("all-minilm-l6-v2").unwrap();
        let temp = tempfile::TempDir::new().unwrap();
        assert!(create_engine(def, Some(temp.path())).is_err());
    }
}
