//! Deterministic hashed embeddings
//!
//! Character n-grams and whole words are hashed into a fixed number of
//! buckets. Texts sharing many n-grams end up close; unrelated texts end up
//! nearly orthogonal. No model download or network access is needed, which
//! makes this the provider of choice for tests and offline use.

use crate::embeddings::{normalize_in_place, EmbeddingService};
use crate::error::{MasteryError, Result};
use async_trait::async_trait;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the UTF-8 bytes
///
/// Fixed across platforms and toolchains, so vectors stored by one build
/// still match queries embedded by another.
fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Hashed n-gram embedding service
pub struct HashEmbeddingService {
    dimensions: usize,
}

impl HashEmbeddingService {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, token: &str) -> usize {
        (fnv1a(token) % self.dimensions as u64) as usize
    }

    /// Embed synchronously; the async trait method delegates here
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(MasteryError::EmbeddingUnavailable(
                "hash embedding has zero dimensions".to_string(),
            ));
        }

        let mut embedding = vec![0.0; self.dimensions];
        let text_lower = text.to_lowercase();
        let chars: Vec<char> = text_lower.chars().collect();

        for window_size in 2..=4 {
            for window in chars.windows(window_size) {
                let gram: String = window.iter().collect();
                embedding[self.bucket(&gram)] += 1.0;
            }
        }

        // Words weighted more than character n-grams
        for word in text_lower.split_whitespace() {
            embedding[self.bucket(word)] += 2.0;
        }

        if !normalize_in_place(&mut embedding) {
            return Err(MasteryError::EmbeddingUnavailable(format!(
                "text '{}' has no hashable content",
                text
            )));
        }

        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingService for HashEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_text(text)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "hashed-ngrams"
    }
}
