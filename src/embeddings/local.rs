//! Local embedding service using fastembed
//!
//! Provides semantic embeddings using locally-run models via the fastembed
//! library with ONNX Runtime.
//!
//! Models are automatically downloaded on first use to the cache directory
//! and subsequent runs load from cache.

use crate::config::EmbeddingConfig;
use crate::embeddings::{normalize_in_place, EmbeddingService};
use crate::error::{MasteryError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, info};

/// Local embedding service using fastembed
pub struct LocalEmbeddingService {
    /// fastembed needs `&mut` to run inference, so the model sits behind a mutex
    model: Arc<Mutex<TextEmbedding>>,
    config: EmbeddingConfig,
    dimensions: usize,
}

impl LocalEmbeddingService {
    /// Create a new local embedding service with the given configuration
    ///
    /// This will download the model if not already cached (may take 30-120
    /// seconds depending on model size and network speed).
    ///
    /// # Example
    /// ```ignore
    /// let service = LocalEmbeddingService::new(EmbeddingConfig::default()).await?;
    /// let embedding = service.embed("gradient descent").await?;
    /// ```
    pub async fn new(config: EmbeddingConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing local embedding service: model={}, cache={:?}",
            config.model, config.cache_dir
        );

        let embedding_model = Self::model_name_to_enum(&config.model)?;

        let mut init_options = InitOptions::new(embedding_model)
            .with_show_download_progress(config.show_download_progress);
        if let Some(cache_dir) = config.cache_dir.clone() {
            init_options = init_options.with_cache_dir(cache_dir);
        }

        // Load model in blocking task (may download if not cached)
        let model = task::spawn_blocking(move || TextEmbedding::try_new(init_options))
            .await
            .map_err(|e| MasteryError::EmbeddingUnavailable(format!("Task join error: {}", e)))?
            .map_err(|e| {
                MasteryError::EmbeddingUnavailable(format!("Failed to load model: {}", e))
            })?;

        let dimensions = config.dimensions;

        info!(
            "Local embedding service initialized successfully: {} dimensions",
            dimensions
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            config,
            dimensions,
        })
    }

    /// Map model name string to fastembed's EmbeddingModel enum
    fn model_name_to_enum(model_name: &str) -> Result<EmbeddingModel> {
        match model_name {
            "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
            "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
            "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
            _ => Err(MasteryError::Config(format!(
                "Unsupported model: '{}'",
                model_name
            ))),
        }
    }

    /// Run fastembed's synchronous inference in a blocking task
    async fn embed_internal(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        debug!("Embedding batch of {} texts", texts.len());

        let model = Arc::clone(&self.model);
        let batch_size = self.config.batch_size;

        let embeddings = task::spawn_blocking(move || {
            let mut model_guard = model
                .lock()
                .map_err(|e| format!("Mutex lock failed: {}", e))?;

            model_guard
                .embed(texts, Some(batch_size))
                .map_err(|e| format!("Embedding generation failed: {}", e))
        })
        .await
        .map_err(|e| MasteryError::EmbeddingUnavailable(format!("Task join error: {}", e)))?
        .map_err(MasteryError::EmbeddingUnavailable)?;

        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != self.dimensions {
                return Err(MasteryError::EmbeddingUnavailable(format!(
                    "Embedding {} has wrong dimensions: expected {}, got {}",
                    i,
                    self.dimensions,
                    embedding.len()
                )));
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(MasteryError::Validation(
                "Text cannot be empty".to_string(),
            ));
        }

        let mut embeddings = self.embed_internal(vec![text.to_string()]).await?;
        let mut embedding = embeddings.pop().ok_or_else(|| {
            MasteryError::EmbeddingUnavailable("No embedding returned".to_string())
        })?;

        if !normalize_in_place(&mut embedding) {
            return Err(MasteryError::EmbeddingUnavailable(
                "Model returned a zero vector".to_string(),
            ));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
