//! Concept registry and the vector index it owns
//!
//! The registry is the only writer of the `concepts` table and the only
//! owner of the [`VectorIndex`]. The index is published as an immutable
//! `Arc` snapshot: readers clone the pointer under a short read lock and
//! search outside it, so a search sees either the fully-old or the
//! fully-new index. Writers serialize on an async mutex held across
//! "insert row, rebuild, swap", so the last published snapshot always
//! matches the table.

use crate::embeddings::{normalize_in_place, EmbeddingService};
use crate::error::{MasteryError, Result};
use crate::storage::{ConceptStore, SqliteStore, VectorIndex};
use crate::types::Concept;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Canonical set of concepts with their embeddings
pub struct ConceptRegistry {
    concepts: ConceptStore,
    embedder: Arc<dyn EmbeddingService>,
    index: RwLock<Arc<VectorIndex>>,
    write_lock: Mutex<()>,
}

impl ConceptRegistry {
    /// Open the registry and build the index from stored rows
    pub async fn open(store: SqliteStore, embedder: Arc<dyn EmbeddingService>) -> Result<Self> {
        let registry = Self {
            concepts: ConceptStore::new(store),
            index: RwLock::new(Arc::new(VectorIndex::empty(embedder.dimensions()))),
            embedder,
            write_lock: Mutex::new(()),
        };

        registry.rebuild_index().await?;
        Ok(registry)
    }

    /// Ensure a normalized key is registered
    ///
    /// Existing keys are a no-op: no embedding is computed and the index is
    /// left alone. New keys are embedded, stored, and the index is rebuilt
    /// before this returns. On embedding failure nothing is written.
    pub async fn ensure_concept(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(MasteryError::Validation(
                "Concept text cannot be empty".to_string(),
            ));
        }

        if self.concepts.contains(key).await? {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;

        // Another writer may have registered it while we waited
        if self.concepts.contains(key).await? {
            return Ok(());
        }

        let embedding = self.embed(key).await?;
        let concept = Concept {
            key: key.to_string(),
            canonical_display: key.to_string(),
            embedding,
        };

        if self.concepts.insert(&concept).await? {
            info!("Registered new concept: {}", key);
            self.rebuild_locked().await?;
        }

        Ok(())
    }

    /// Look up a concept by key
    pub async fn lookup(&self, key: &str) -> Result<Option<Concept>> {
        self.concepts.get(key).await
    }

    /// Rebuild the index from the stored rows and publish it
    pub async fn rebuild_index(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.rebuild_locked().await
    }

    /// Caller must hold `write_lock`
    async fn rebuild_locked(&self) -> Result<()> {
        let rows = self.concepts.all_embeddings().await?;
        let index = VectorIndex::build(self.embedder.dimensions(), rows)?;
        let size = index.len();

        let mut published = self.index.write().unwrap_or_else(|e| e.into_inner());
        *published = Arc::new(index);
        drop(published);

        info!("Vector index rebuilt: {} concepts", size);
        Ok(())
    }

    /// Current index snapshot
    pub fn index(&self) -> Arc<VectorIndex> {
        let published = self.index.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&published)
    }

    /// Embed text through the provider, validating dimension and length
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = self.embedder.embed(text).await.map_err(|e| match e {
            MasteryError::EmbeddingUnavailable(_) => e,
            other => MasteryError::EmbeddingUnavailable(other.to_string()),
        })?;

        let expected = self.embedder.dimensions();
        if embedding.len() != expected {
            return Err(MasteryError::EmbeddingUnavailable(format!(
                "Provider '{}' returned {} dimensions, expected {}",
                self.embedder.model_name(),
                embedding.len(),
                expected
            )));
        }

        if !normalize_in_place(&mut embedding) {
            return Err(MasteryError::EmbeddingUnavailable(format!(
                "Provider '{}' returned a zero vector",
                self.embedder.model_name()
            )));
        }

        debug!("Embedded '{}' ({} dims)", text, expected);
        Ok(embedding)
    }

    /// Nearest registered concept to `text`
    ///
    /// Returns `None` without calling the provider when the registry is
    /// empty. Never registers `text`.
    pub async fn nearest(&self, text: &str) -> Result<Option<(String, f32)>> {
        if self.index().is_empty() {
            return Ok(None);
        }

        let query = self.embed(text).await?;
        let index = self.index();
        let nearest = index
            .nearest(&query)?
            .map(|(key, similarity)| (key.to_string(), similarity));
        Ok(nearest)
    }

    /// Up to `limit` registered concepts closest to `text`, best first
    pub async fn similar(&self, text: &str, limit: usize) -> Result<Vec<(String, f32)>> {
        if limit == 0 || self.index().is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embed(text).await?;
        let index = self.index();
        let ranked = index
            .search(&query, limit)?
            .into_iter()
            .map(|(key, similarity)| (key.to_string(), similarity))
            .collect();
        Ok(ranked)
    }

    /// Number of registered concepts
    pub async fn len(&self) -> Result<usize> {
        self.concepts.count().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Registered keys in insertion order
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.concepts.keys().await
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingService> {
        &self.embedder
    }
}
