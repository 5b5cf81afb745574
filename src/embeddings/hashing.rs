//! Feature-hashing embedder
//!
//! Each lower-cased alphanumeric token is hashed with SHA-256; the first eight
//! bytes pick a bucket and one bit of the ninth picks the sign. The summed
//! vector is L2 normalised. Similarity therefore reflects shared words only,
//! but it is deterministic across processes and platforms and needs no model
//! files, which makes it the engine of choice for tests and offline use.

use anyhow::Result;
use sha2::{Digest, Sha256};

use super::similarity::l2_normalize;
use super::EmbeddingEngine;

pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: format!("hashing-{}", dimension),
        }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl EmbeddingEngine for HashingEmbedder {
    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        if self.dimension == 0 {
            return Ok(vector);
        }

        for token in Self::tokens(text) {
            let (index, sign) = self.bucket(&token);
            vector[index] += sign;
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;
    use approx::assert_relative_eq;

    #[test]
    fn test_deterministic() {
        let mut a = HashingEmbedder::new(384);
        let mut b = HashingEmbedder::new(384);
        let text = "Rust ownership prevents data races";
        assert_eq!(a.embed(text).unwrap(), b.embed(text).unwrap());
    }

    #[test]
    fn test_unit_length_and_dimension() {
        let mut embedder = HashingEmbedder::new(384);
        let v = embedder.embed("The cat sits on the mat").unwrap();
        assert_eq!(v.len(), 384);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let mut embedder = HashingEmbedder::new(384);
        let a = embedder.embed("Hello, World!").unwrap();
        let b = embedder.embed("hello world").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_tokens_gives_zero_vector() {
        let mut embedder = HashingEmbedder::new(16);
        let v = embedder.embed("  ?! ").unwrap();
        assert_eq!(v, vec![0.0; 16]);
    }

    #[test]
    fn test_shared_words_score_higher() {
        let mut embedder = HashingEmbedder::new(384);
        let q = embedder.embed("cats").unwrap();
        let close = embedder.embed("cats are great").unwrap();
        let far = embedder.embed("dogs").unwrap();
        assert!(cosine_similarity(&q, &close) > cosine_similarity(&q, &far));
        assert_relative_eq!(cosine_similarity(&q, &q), 1.0, epsilon = 1e-6);
    }
}
