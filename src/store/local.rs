//! In-process brute-force index
//!
//! Records live in insertion order in a `Vec` behind one `RwLock`: searches
//! and listings share the read side, inserts and removals take the write
//! side. Search scores every record (in parallel with rayon) and keeps
//! insertion order among equal scores. Nothing is persisted.

use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::HashSet;

use super::backend::{by_score_desc, IndexBackend};
use super::types::{BackendKind, IndexStats, KnowledgeEntry, KnowledgeRecord, SearchResult};
use crate::embeddings::cosine_similarity;
use crate::error::{KnowledgeError, Result};

#[derive(Default)]
struct LocalState {
    records: Vec<KnowledgeRecord>,
    /// Fixed by the first insert; 0 before that
    dimension: usize,
    /// Every id ever inserted, including removed ones
    issued: HashSet<String>,
}

/// Volatile in-memory index with exact cosine search
#[derive(Default)]
pub struct LocalIndex {
    state: RwLock<LocalState>,
}

impl LocalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IndexBackend for LocalIndex {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn insert(&self, record: KnowledgeRecord) -> Result<()> {
        if record.embedding.is_empty() {
            return Err(KnowledgeError::Embedding(
                "cannot index an empty embedding".into(),
            ));
        }

        let mut state = self.state.write();
        if state.dimension == 0 {
            state.dimension = record.dimension();
        } else if record.dimension() != state.dimension {
            return Err(KnowledgeError::DimensionMismatch {
                expected: state.dimension,
                actual: record.dimension(),
            });
        }
        if state.issued.contains(&record.id) {
            return Err(KnowledgeError::DuplicateId(record.id));
        }

        state.issued.insert(record.id.clone());
        state.records.push(record);
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<SearchResult>> {
        let state = self.state.read();
        if state.records.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != state.dimension {
            return Err(KnowledgeError::DimensionMismatch {
                expected: state.dimension,
                actual: query.len(),
            });
        }

        // Indexed collect keeps insertion order, so the stable sort below
        // breaks ties by position
        let mut scored: Vec<(usize, f32)> = state
            .records
            .par_iter()
            .enumerate()
            .map(|(i, record)| (i, cosine_similarity(query, &record.embedding)))
            .filter(|(_, score)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| by_score_desc(a.1, b.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult::from_record(&state.records[i], score))
            .collect())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write();
        match state.records.iter().position(|r| r.id == id) {
            Some(pos) => {
                // Vec::remove keeps the order of the remaining records
                state.records.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_all(&self) -> Result<Vec<KnowledgeEntry>> {
        Ok(self.state.read().records.iter().map(KnowledgeRecord::entry).collect())
    }

    fn describe(&self) -> Result<IndexStats> {
        let state = self.state.read();
        Ok(IndexStats {
            backend: BackendKind::Memory,
            count: state.records.len(),
            dimension: state.dimension,
        })
    }

    fn get(&self, id: &str) -> Result<Option<KnowledgeEntry>> {
        Ok(self
            .state
            .read()
            .records
            .iter()
            .find(|r| r.id == id)
            .map(KnowledgeRecord::entry))
    }
}
