//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ragline::{EmbeddingProvider, Result};

pub const DIM: usize = 32;

/// Deterministic bag-of-words embedder: each lowercase word is hashed into
/// one of `DIM` buckets. Texts sharing words end up close under cosine distance.
#[derive(Debug, Default)]
pub struct HashEmbedder;

impl HashEmbedder {
    fn bucket(word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % DIM as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            vector[Self::bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn name(&self) -> &str {
        "hash"
    }
}
