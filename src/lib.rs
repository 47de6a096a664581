//! Mastery - decay-weighted topic mastery tracking
//!
//! Tracks how well a user knows individual topics from a stream of learning
//! signals and answers, for any free-text phrase, whether the user is weak,
//! strong or neutral on it, even for phrases never seen before.
//!
//! # Architecture
//!
//! - **Types**: events, event kinds, concepts, normalization
//! - **Storage**: SQLite event log and concept table, in-memory vector index
//! - **Embeddings**: local (fastembed), remote and hashed providers
//! - **Registry**: concept deduplication and index ownership
//! - **Mastery**: decay aggregation and nearest-neighbour classification
//! - **Engine**: the facade tying them together
//!
//! # Example
//!
//! ```ignore
//! use mastery_core::{EventKind, MasteryConfig, MasteryEngine};
//!
//! #[tokio::main]
//! async fn main() -> mastery_core::Result<()> {
//!     let engine = MasteryEngine::open(&MasteryConfig::default()).await?;
//!
//!     engine.record_event("alice", "priors", EventKind::Confusion, None).await?;
//!     engine.record_event("alice", "gradient descent", EventKind::RecallCorrect, None).await?;
//!
//!     let buckets = engine.classify("alice", &["bayes rule", "gradient descent"]).await?;
//!     println!("weak: {:?}, strong: {:?}", buckets.weak, buckets.strong);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod mastery;
pub mod registry;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::{EmbeddingConfig, EmbeddingProvider, MasteryConfig, ScoringConfig};
pub use embeddings::EmbeddingService;
pub use engine::MasteryEngine;
pub use error::{MasteryError, Result};
pub use mastery::{Bucket, Classification, ClassifyOptions};
pub use registry::ConceptRegistry;
pub use storage::VectorIndex;
pub use types::{normalize, Concept, Event, EventKind, EventSignal};
