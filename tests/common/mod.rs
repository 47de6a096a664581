//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use mastery_core::embeddings::HashEmbeddingService;
use mastery_core::{ClassifyOptions, EmbeddingService, MasteryEngine, MasteryError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Embedder backed by a fixed table of vectors
///
/// Texts missing from the table map to `fallback`, or fail when there is
/// none. Lets tests pin exact similarities.
pub struct StaticEmbedder {
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
}

impl StaticEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            table: HashMap::new(),
            fallback: None,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimensions);
        self.table.insert(text.to_string(), vector);
        self
    }

    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        assert_eq!(vector.len(), self.dimensions);
        self.fallback = Some(vector);
        self
    }
}

#[async_trait]
impl EmbeddingService for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.table
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| MasteryError::EmbeddingUnavailable(format!("no vector for '{}'", text)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

/// Embedder that always fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingService for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(MasteryError::EmbeddingUnavailable(
            "provider offline".to_string(),
        ))
    }

    fn dimensions(&self) -> usize {
        16
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Unit vector along one axis
pub fn axis(dimensions: usize, i: usize) -> Vec<f32> {
    let mut v = vec![0.0; dimensions];
    v[i] = 1.0;
    v
}

/// Open an engine on a fresh temporary database
pub async fn create_test_engine(embedder: Arc<dyn EmbeddingService>) -> (MasteryEngine, TempDir) {
    let temp = TempDir::new().unwrap();
    let engine = MasteryEngine::with_embedder(
        temp.path().join("mastery.db"),
        embedder,
        ClassifyOptions::default(),
    )
    .await
    .expect("Failed to create test engine");
    (engine, temp)
}

/// Engine backed by the hashed n-gram embedder
pub async fn create_hashed_engine() -> (MasteryEngine, TempDir) {
    create_test_engine(Arc::new(HashEmbeddingService::new(384))).await
}
