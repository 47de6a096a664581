//! Mastery scoring and classification
//!
//! - `aggregator`: events → decayed, squashed per-concept scores
//! - `classifier`: phrases → weak / strong / neutral, with nearest-neighbour
//!   fallback for phrases that have no history

pub mod aggregator;
pub mod classifier;

pub use aggregator::{MasteryAggregator, DEFAULT_HALF_LIFE_DAYS};
pub use classifier::{nearest_score, Bucket, Classification, ClassifyOptions};
