//! Embedding generation services for concept similarity search
//!
//! Provides local (fastembed), remote (OpenAI-compatible) and hashed
//! embedding generation behind the [`EmbeddingService`] trait. Every service
//! returns unit-length vectors of a fixed dimension.

pub mod hashed;
pub mod local;
pub mod remote;

pub use hashed::HashEmbeddingService;
pub use local::LocalEmbeddingService;
pub use remote::RemoteEmbeddingService;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Embedding service trait defining required operations
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate a unit-length embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimensionality
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Build the embedding service selected by the configuration
pub async fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingService>> {
    config.validate()?;

    let service: Arc<dyn EmbeddingService> = match config.provider {
        EmbeddingProvider::Local => Arc::new(LocalEmbeddingService::new(config.clone()).await?),
        EmbeddingProvider::Remote => Arc::new(RemoteEmbeddingService::from_config(config)?),
        EmbeddingProvider::Hash => Arc::new(HashEmbeddingService::new(config.dimensions)),
    };

    Ok(service)
}

/// Dot product of two equal-length vectors
///
/// On unit-length vectors this is the cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale a vector to unit length in place
///
/// Returns false (leaving the vector untouched) for a zero or non-finite
/// magnitude.
pub fn normalize_in_place(vector: &mut [f32]) -> bool {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return false;
    }

    for val in vector.iter_mut() {
        *val /= magnitude;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot() {
        let vec1 = vec![1.0, 0.0, 0.0];
        let vec3 = vec![0.0, 1.0, 0.0];

        assert_eq!(dot(&vec1, &vec1), 1.0);
        assert_eq!(dot(&vec1, &vec3), 0.0);
    }

    #[test]
    fn test_dot_of_normalized_is_cosine() {
        let mut a = vec![3.0, 4.0, 0.0];
        let mut b = vec![1.0, 0.0, 0.0];
        assert!(normalize_in_place(&mut a));
        assert!(normalize_in_place(&mut b));

        // cos = 3 / 5
        assert!((dot(&a, &b) - 0.6).abs() < 1e-6);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut zero = vec![0.0; 4];
        assert!(!normalize_in_place(&mut zero));
        assert_eq!(zero, vec![0.0; 4]);
    }

    #[tokio::test]
    async fn test_from_config_hash_provider() {
        let config = EmbeddingConfig {
            provider: EmbeddingProvider::Hash,
            dimensions: 64,
            ..Default::default()
        };

        let service = from_config(&config).await.unwrap();
        assert_eq!(service.dimensions(), 64);
        assert_eq!(service.embed("priors").await.unwrap().len(), 64);
    }
}
