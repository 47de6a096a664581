//! Configuration for the mastery core
//!
//! Loaded from a TOML file; every section has defaults so an empty file (or
//! no file at all) yields a working configuration backed by the local
//! embedding model.

use crate::error::{MasteryError, Result};
use crate::mastery::DEFAULT_HALF_LIFE_DAYS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MasteryConfig {
    /// SQLite database holding the event log and concept registry
    pub database_path: Option<PathBuf>,

    /// Aggregation and classification parameters
    pub scoring: ScoringConfig,

    /// Embedding provider settings
    pub embedding: EmbeddingConfig,
}

/// Aggregation and classification parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Days over which an event's influence halves
    pub half_life_days: f64,

    /// Scores strictly below this are weak
    pub weak_threshold: f64,

    /// Scores strictly above this are strong
    pub strong_threshold: f64,

    /// Fallback score for phrases with no informative neighbour
    pub default_score: f64,

    /// Minimum cosine similarity for a neighbour to count
    pub similarity_cutoff: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            half_life_days: DEFAULT_HALF_LIFE_DAYS,
            weak_threshold: 0.4,
            strong_threshold: 0.7,
            default_score: -0.5,
            similarity_cutoff: 0.2,
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum EmbeddingProvider {
    /// fastembed model run locally via ONNX Runtime
    #[default]
    Local,

    /// OpenAI-compatible HTTP embeddings endpoint
    Remote,

    /// Deterministic n-gram hashing (offline, low quality)
    Hash,
}

/// Embedding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,

    /// Model name understood by the provider
    pub model: String,

    /// Vector dimension D of every stored embedding
    pub dimensions: usize,

    /// Base URL for the remote provider
    pub base_url: Option<String>,

    /// Environment variable holding the remote API key
    pub api_key_env: String,

    /// Model cache directory for the local provider
    pub cache_dir: Option<PathBuf>,

    /// Texts per inference batch for the local provider
    pub batch_size: usize,

    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model: "multilingual-e5-small".to_string(),
            dimensions: 384,
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            cache_dir: None,
            batch_size: 32,
            show_download_progress: false,
        }
    }
}

/// Known local models and their output dimensions
pub const LOCAL_MODELS: &[(&str, usize)] = &[
    ("multilingual-e5-small", 384),
    ("multilingual-e5-base", 768),
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
    ("nomic-embed-text-v1.5", 768),
];

impl EmbeddingConfig {
    /// Output dimension of a known local model
    pub fn local_model_dimensions(model: &str) -> Option<usize> {
        LOCAL_MODELS
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, dims)| *dims)
    }

    /// Validate embedding settings
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(MasteryError::Config(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }

        if self.model.trim().is_empty() && self.provider != EmbeddingProvider::Hash {
            return Err(MasteryError::Config(
                "embedding.model cannot be empty".to_string(),
            ));
        }

        match self.provider {
            EmbeddingProvider::Local => {
                let expected = Self::local_model_dimensions(&self.model).ok_or_else(|| {
                    MasteryError::Config(format!(
                        "Unsupported local model: '{}'",
                        self.model
                    ))
                })?;
                if expected != self.dimensions {
                    return Err(MasteryError::Config(format!(
                        "Model '{}' produces {} dimensions, but embedding.dimensions is {}",
                        self.model, expected, self.dimensions
                    )));
                }
                if self.batch_size == 0 {
                    return Err(MasteryError::Config(
                        "embedding.batch_size must be greater than 0".to_string(),
                    ));
                }
            }
            EmbeddingProvider::Remote => {
                if self.api_key_env.trim().is_empty() {
                    return Err(MasteryError::Config(
                        "embedding.api_key_env cannot be empty".to_string(),
                    ));
                }
            }
            EmbeddingProvider::Hash => {}
        }

        Ok(())
    }
}

impl ScoringConfig {
    /// Validate scoring parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.half_life_days.is_finite() && self.half_life_days > 0.0) {
            return Err(MasteryError::Config(
                "scoring.half_life_days must be a positive number".to_string(),
            ));
        }

        if self.weak_threshold > self.strong_threshold {
            return Err(MasteryError::Config(format!(
                "scoring.weak_threshold ({}) must not exceed scoring.strong_threshold ({})",
                self.weak_threshold, self.strong_threshold
            )));
        }

        if !(-1.0..=1.0).contains(&self.similarity_cutoff) {
            return Err(MasteryError::Config(
                "scoring.similarity_cutoff must be between -1 and 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl MasteryConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: MasteryConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.embedding.validate()?;
        Ok(())
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let toml_str =
            toml::to_string_pretty(self).map_err(|e| MasteryError::Config(e.to_string()))?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Default database location under the local data directory
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mastery")
        .join("mastery.db")
}
