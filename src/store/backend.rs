//! Backend capability trait and the shared ranking contract

use std::cmp::Ordering;

use super::types::{BackendKind, IndexStats, KnowledgeEntry, KnowledgeRecord, SearchResult};
use crate::error::Result;

/// Storage strategy behind a [`VectorStore`](super::VectorStore).
///
/// A store holds exactly one backend, chosen at construction. Every method
/// takes `&self`; implementations do their own synchronisation (or, for
/// stateless adapters, need none).
pub trait IndexBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Store a fully formed record. Either the whole record is stored or
    /// nothing is.
    fn insert(&self, record: KnowledgeRecord) -> Result<()>;

    /// Records scoring at least `threshold`, best first, at most `top_k`.
    /// Equal scores keep insertion order.
    fn search(&self, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<SearchResult>>;

    /// `Ok(true)` if the id was removed. Unknown ids are `Ok(false)`, never
    /// an error; remote backends report `Ok(true)` once the call succeeds.
    fn remove(&self, id: &str) -> Result<bool>;

    /// Every record without its embedding. Backends that cannot enumerate
    /// safely return an empty list.
    fn list_all(&self) -> Result<Vec<KnowledgeEntry>>;

    fn describe(&self) -> Result<IndexStats>;

    /// Single record by id, if the backend has it
    fn get(&self, id: &str) -> Result<Option<KnowledgeEntry>>;

    /// Release connections or buffers before the store is dropped
    fn close(&self) {}
}

/// Descending by score. `sort_by` is stable, so ties keep their input order.
pub(crate) fn by_score_desc(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Apply the search contract to an arbitrary candidate list:
/// drop scores below `threshold` (and NaN), sort descending with stable
/// ties, keep the first `top_k`.
pub fn rank(mut candidates: Vec<SearchResult>, top_k: usize, threshold: f32) -> Vec<SearchResult> {
    candidates.retain(|c| c.score >= threshold);
    candidates.sort_by(|a, b| by_score_desc(a.score, b.score));
    candidates.truncate(top_k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Metadata;

    fn hit(id: &str, score: f32) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            text: id.to_string(),
            score,
            metadata: Metadata::new(),
            created_at: None,
        }
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_rank_sorts_filters_and_caps() {
        let ranked = rank(
            vec![hit("a", 0.2), hit("b", 0.9), hit("c", 0.5), hit("d", 0.7)],
            2,
            0.3,
        );
        assert_eq!(ids(&ranked), vec!["b", "d"]);
    }

    #[test]
    fn test_rank_threshold_is_inclusive() {
        let ranked = rank(vec![hit("edge", 0.3), hit("below", 0.299)], 10, 0.3);
        assert_eq!(ids(&ranked), vec!["edge"]);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let ranked = rank(
            vec![hit("first", 0.5), hit("top", 0.8), hit("second", 0.5), hit("third", 0.5)],
            10,
            0.0,
        );
        assert_eq!(ids(&ranked), vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn test_rank_drops_nan() {
        let ranked = rank(vec![hit("nan", f32::NAN), hit("ok", 0.1)], 10, -1.0);
        assert_eq!(ids(&ranked), vec!["ok"]);
    }

    #[test]
    fn test_rank_top_k_larger_than_survivors() {
        let ranked = rank(vec![hit("a", 0.4), hit("b", 0.6)], 50, 0.0);
        assert_eq!(ranked.len(), 2);
    }
}
