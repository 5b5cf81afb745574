//! Record and result types shared by every backend
//!
//! These types are backend-agnostic: they don't know about Pinecone payloads
//! or in-process locks. Backends translate to and from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Caller-supplied metadata; stored and echoed back, never interpreted
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Which storage strategy a store is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process, volatile, brute-force scan
    Memory,
    /// Remote Pinecone index
    Pinecone,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Pinecone => "pinecone",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored unit. Created once by `add`, never mutated, removed only by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeRecord {
    /// New record with a fresh random id, stamped now
    pub fn new(text: impl Into<String>, embedding: Vec<f32>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            embedding,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Projection without the embedding
    pub fn entry(&self) -> KnowledgeEntry {
        KnowledgeEntry {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.metadata.clone(),
            created_at: Some(self.created_at),
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// A record as listed: everything but the embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Absent only for remote vectors written without a timestamp
    pub created_at: Option<DateTime<Utc>>,
}

/// One ranked hit. `score` is cosine similarity for the local backend and
/// the service's own score for remote backends; it is never clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub score: f32,
    pub metadata: Metadata,
    /// Absent only for remote vectors written without a timestamp
    pub created_at: Option<DateTime<Utc>>,
}

impl SearchResult {
    pub fn from_record(record: &KnowledgeRecord, score: f32) -> Self {
        Self {
            id: record.id.clone(),
            text: record.text.clone(),
            score,
            metadata: record.metadata.clone(),
            created_at: Some(record.created_at),
        }
    }
}

/// What a backend reports about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub backend: BackendKind,
    pub count: usize,
    /// 0 until the first embedding has fixed it
    pub dimension: usize,
}

/// Store-level statistics: backend stats plus the embedding model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub backend: BackendKind,
    pub count: usize,
    pub dimension: usize,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_records_get_distinct_ids() {
        let a = KnowledgeRecord::new("a", vec![1.0], Metadata::new());
        let b = KnowledgeRecord::new("a", vec![1.0], Metadata::new());
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_entry_drops_embedding() {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!("notes.txt"));
        let record = KnowledgeRecord::new("text", vec![0.1, 0.2, 0.3], metadata.clone());

        let entry = record.entry();
        assert_eq!(entry.id, record.id);
        assert_eq!(entry.metadata, metadata);
        assert_eq!(entry.created_at, Some(record.created_at));

        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("embedding").is_none());
    }

    #[test]
    fn test_backend_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_value(BackendKind::Memory).unwrap(), json!("memory"));
        assert_eq!(BackendKind::Pinecone.to_string(), "pinecone");
    }
}
