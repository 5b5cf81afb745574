//! Adapter from the store's backend contract to a remote ANN service
//!
//! Records become vectors whose payload carries the user metadata plus two
//! reserved keys, `text` and `created_at`. Reading strips the reserved keys
//! again, so callers see exactly the metadata they stored.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use super::backend::{rank, IndexBackend};
use super::types::{BackendKind, IndexStats, KnowledgeEntry, KnowledgeRecord, Metadata, SearchResult};
use crate::error::{KnowledgeError, Result};
use crate::pinecone::{AnnService, VectorRecord};

const TEXT_KEY: &str = "text";
const CREATED_AT_KEY: &str = "created_at";
/// Naive ISO timestamp written by older clients of the same index
const LEGACY_TIMESTAMP_KEY: &str = "timestamp";

/// Index backend that delegates storage and ranking to an [`AnnService`]
pub struct RemoteIndex<S: AnnService> {
    service: S,
}

impl<S: AnnService> RemoteIndex<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

/// Flatten a record's metadata, text and timestamp into one payload.
/// Reserved keys win over user keys of the same name.
fn to_payload(record: &KnowledgeRecord) -> Metadata {
    let mut payload = record.metadata.clone();
    payload.insert(TEXT_KEY.into(), Value::String(record.text.clone()));
    payload.insert(
        CREATED_AT_KEY.into(),
        Value::String(record.created_at.to_rfc3339()),
    );
    payload
}

/// Split a stored payload back into text, timestamp and user metadata
fn from_payload(mut payload: Metadata) -> (String, Option<DateTime<Utc>>, Metadata) {
    let text = match payload.remove(TEXT_KEY) {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let created_at = payload
        .remove(CREATED_AT_KEY)
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    // `timestamp` is only reserved for payloads written without `created_at`
    let created_at = match created_at {
        Some(ts) => Some(ts),
        None => payload
            .remove(LEGACY_TIMESTAMP_KEY)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
    };

    (text, created_at, payload)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl<S: AnnService> IndexBackend for RemoteIndex<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Pinecone
    }

    fn insert(&self, record: KnowledgeRecord) -> Result<()> {
        if record.embedding.is_empty() {
            return Err(KnowledgeError::Embedding(
                "cannot index an empty embedding".into(),
            ));
        }
        let vector = VectorRecord {
            id: record.id.clone(),
            values: record.embedding.clone(),
            metadata: to_payload(&record),
        };
        self.service.upsert(std::slice::from_ref(&vector))?;
        tracing::debug!(id = %record.id, "upserted vector");
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let matches = self.service.query(query, top_k)?;
        let candidates = matches
            .into_iter()
            .map(|m| {
                let (text, created_at, metadata) = from_payload(m.metadata);
                SearchResult {
                    id: m.id,
                    text,
                    score: m.score,
                    metadata,
                    created_at,
                }
            })
            .collect();

        // The service already ranks; this applies the threshold and keeps the
        // ordering contract even if it returns ties or extra matches
        Ok(rank(candidates, top_k, threshold))
    }

    fn remove(&self, id: &str) -> Result<bool> {
        // The service does not say whether the id existed
        self.service.delete(&[id.to_string()])?;
        Ok(true)
    }

    fn list_all(&self) -> Result<Vec<KnowledgeEntry>> {
        tracing::debug!("remote index cannot enumerate records; returning empty list");
        Ok(Vec::new())
    }

    fn describe(&self) -> Result<IndexStats> {
        let description = self.service.describe_index_stats()?;
        Ok(IndexStats {
            backend: BackendKind::Pinecone,
            count: description.total_vector_count,
            dimension: description.dimension,
        })
    }

    fn get(&self, id: &str) -> Result<Option<KnowledgeEntry>> {
        let fetched = self.service.fetch(&[id.to_string()])?;
        Ok(fetched.into_iter().next().map(|vector| {
            let (text, created_at, metadata) = from_payload(vector.metadata);
            KnowledgeEntry {
                id: vector.id,
                text,
                metadata,
                created_at,
            }
        }))
    }
}
