//! Knowledge store - embed, index and retrieve short texts
//!
//! [`VectorStore`] owns one [`EmbeddingProvider`] and exactly one
//! [`IndexBackend`], picked once when the store is built:
//!
//! - no Pinecone API key → [`LocalIndex`] (in-process, volatile)
//! - API key present     → [`RemoteIndex`] over a [`PineconeClient`]
//!
//! Every operation dispatches to that backend; there is no fallback between
//! them at runtime.

mod backend;
mod local;
mod remote;
mod types;

pub use backend::{rank, IndexBackend};
pub use local::LocalIndex;
pub use remote::RemoteIndex;
pub use types::{
    BackendKind, IndexStats, KnowledgeEntry, KnowledgeRecord, Metadata, SearchResult, StoreStats,
};

use std::sync::Arc;

use crate::config::Settings;
use crate::embeddings::{norm, EmbeddingProvider, ModelRegistry};
use crate::error::{KnowledgeError, Result};
use crate::pinecone::PineconeClient;

/// Results returned when the caller doesn't say
pub const DEFAULT_TOP_K: usize = 3;

/// Minimum score a result needs when the caller doesn't say
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// Per-call search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    pub threshold: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SearchOptions {
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Orchestrator over one embedding provider and one index backend
pub struct VectorStore {
    embedder: Arc<EmbeddingProvider>,
    backend: Box<dyn IndexBackend>,
    defaults: SearchOptions,
}

impl VectorStore {
    /// Build a store from settings.
    ///
    /// Resolves the model in the registry (the model itself loads on first
    /// use) and selects the backend. Connecting to Pinecone happens here, so
    /// a bad key or unreachable host fails construction rather than the
    /// first call.
    pub fn open(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let registry = ModelRegistry::builtin()?;
        let model = registry.get(&settings.embeddings.model)?;
        let embedder = Arc::new(EmbeddingProvider::from_definition(
            model,
            settings.embeddings.model_dir_path(),
        ));

        Self::open_with_embedder(settings, embedder)
    }

    /// As [`open`](Self::open), sharing an existing provider (and its model)
    pub fn open_with_embedder(settings: &Settings, embedder: Arc<EmbeddingProvider>) -> Result<Self> {
        settings.validate()?;

        let backend: Box<dyn IndexBackend> = if settings.pinecone.is_configured() {
            let client = PineconeClient::connect(&settings.pinecone)?;
            Box::new(RemoteIndex::new(client))
        } else {
            Box::new(LocalIndex::new())
        };

        let defaults = SearchOptions {
            top_k: settings.search.top_k,
            threshold: settings.search.threshold,
        };
        Ok(Self::with_backend(embedder, backend).with_defaults(defaults))
    }

    /// Store over an explicit backend
    pub fn with_backend(embedder: Arc<EmbeddingProvider>, backend: Box<dyn IndexBackend>) -> Self {
        tracing::info!(
            backend = %backend.kind(),
            model = %embedder.model_name(),
            "knowledge store ready"
        );
        Self {
            embedder,
            backend,
            defaults: SearchOptions::default(),
        }
    }

    /// Volatile local store
    pub fn in_memory(embedder: Arc<EmbeddingProvider>) -> Self {
        Self::with_backend(embedder, Box::new(LocalIndex::new()))
    }

    pub fn with_defaults(mut self, defaults: SearchOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Embed `text` and store it with `metadata`; returns the new id.
    ///
    /// Nothing is stored if embedding or the backend write fails.
    pub fn add_knowledge(&self, text: &str, metadata: Option<Metadata>) -> Result<String> {
        let embedding = self.embedder.embed(text)?;
        let record = KnowledgeRecord::new(text, embedding, metadata.unwrap_or_default());
        let id = record.id.clone();

        self.backend.insert(record)?;
        tracing::info!(%id, backend = %self.backend.kind(), "knowledge added");
        Ok(id)
    }

    /// Search with the store's default top-k and threshold
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with(query, self.defaults)
    }

    /// Records most similar to `query`, best first.
    ///
    /// An empty result is a normal outcome. Failures (model, backend) are
    /// errors, never an empty list.
    pub fn search_with(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchResult>> {
        if options.top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query)?;
        // A zero vector scores 0 against everything
        if options.threshold > 0.0 && norm(&embedding) == 0.0 {
            tracing::debug!("blank query below threshold; skipping backend");
            return Ok(Vec::new());
        }

        let results = self
            .backend
            .search(&embedding, options.top_k, options.threshold)?;
        tracing::debug!(
            hits = results.len(),
            top_k = options.top_k,
            threshold = options.threshold,
            "knowledge search"
        );
        Ok(results)
    }

    /// Remove a record. `false` when the local index never had the id;
    /// remote backends report `true` once the service accepts the delete.
    pub fn delete_knowledge(&self, id: &str) -> Result<bool> {
        let removed = self.backend.remove(id)?;
        tracing::info!(%id, removed, "knowledge delete");
        Ok(removed)
    }

    /// All records without embeddings, in insertion order.
    /// Empty for remote backends, which cannot be enumerated.
    pub fn list_knowledge(&self) -> Result<Vec<KnowledgeEntry>> {
        self.backend.list_all()
    }

    /// One record by id
    pub fn get(&self, id: &str) -> Result<KnowledgeEntry> {
        self.backend
            .get(id)?
            .ok_or_else(|| KnowledgeError::NotFound(id.to_string()))
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let index = self.backend.describe()?;
        Ok(StoreStats {
            backend: index.backend,
            count: index.count,
            dimension: index.dimension,
            model: self.embedder.model_name().to_string(),
        })
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn defaults(&self) -> SearchOptions {
        self.defaults
    }

    pub fn embedder(&self) -> &Arc<EmbeddingProvider> {
        &self.embedder
    }

    /// Release the backend and, unless another store shares it, the model
    pub fn close(self) {
        self.backend.close();
        if Arc::strong_count(&self.embedder) == 1 {
            self.embedder.unload();
        }
        tracing::debug!("knowledge store closed");
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("backend", &self.backend.kind())
            .field("embedder", &self.embedder)
            .field("defaults", &self.defaults)
            .finish()
    }
}
