//! Remote embedding service for OpenAI-compatible endpoints
//!
//! Posts a single text to `{base_url}/embeddings` and returns the
//! normalized vector. There is no retry: a failed request surfaces as
//! [`MasteryError::EmbeddingUnavailable`] and retry policy stays with the
//! caller.

use crate::config::EmbeddingConfig;
use crate::embeddings::{normalize_in_place, EmbeddingService};
use crate::error::{MasteryError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Request timeout duration
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// OpenAI-compatible embedding service
pub struct RemoteEmbeddingService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl RemoteEmbeddingService {
    /// Create a new remote embedding service
    ///
    /// # Arguments
    /// * `api_key` - Bearer token for the endpoint
    /// * `model` - Model name (e.g., "text-embedding-3-small")
    /// * `base_url` - API base URL (defaults to the OpenAI endpoint)
    /// * `dimensions` - Requested output dimension
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        dimensions: usize,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(MasteryError::Config("API key cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MasteryError::EmbeddingUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            dimensions,
        })
    }

    /// Create from configuration, reading the key from `api_key_env`
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            MasteryError::Config(format!(
                "Remote embedding API key not found. Set the {} environment variable",
                config.api_key_env
            ))
        })?;

        Self::new(
            api_key,
            config.model.clone(),
            config.base_url.clone(),
            config.dimensions,
        )
    }

    async fn call_api(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Calling embeddings API: model={}", self.model);

        let request = EmbeddingRequest {
            input: vec![text],
            model: &self.model,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MasteryError::EmbeddingUnavailable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            warn!("Embeddings API returned {}: {}", status, message);
            return Err(MasteryError::EmbeddingUnavailable(format!(
                "API returned {}: {}",
                status, message
            )));
        }

        let parsed = response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| MasteryError::EmbeddingUnavailable(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| MasteryError::EmbeddingUnavailable("No embedding returned".to_string()))
    }
}

#[async_trait]
impl EmbeddingService for RemoteEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(MasteryError::Validation(
                "Text cannot be empty".to_string(),
            ));
        }

        let mut embedding = self.call_api(text).await?;

        if embedding.len() != self.dimensions {
            return Err(MasteryError::EmbeddingUnavailable(format!(
                "Embedding has wrong dimensions: expected {}, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        if !normalize_in_place(&mut embedding) {
            return Err(MasteryError::EmbeddingUnavailable(
                "API returned a zero vector".to_string(),
            ));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
