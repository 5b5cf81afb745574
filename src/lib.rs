pub mod config;
pub mod embeddings;
pub mod error;
pub mod models;
pub mod paths;
pub mod pinecone;
pub mod store;

// Re-export commonly used types
pub use config::Settings;
pub use embeddings::EmbeddingProvider;
pub use error::{KnowledgeError, Result};
pub use store::{
    BackendKind, KnowledgeEntry, Metadata, SearchOptions, SearchResult, StoreStats, VectorStore,
};
