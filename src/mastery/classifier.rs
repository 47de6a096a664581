//! Weak / strong / neutral classification of free-text phrases
//!
//! Phrases with their own event history are scored directly. Anything else
//! borrows the score of its nearest registered concept, blended toward the
//! default by similarity. Classification is total: every phrase resolves to
//! some score and lands in exactly one bucket.

use crate::config::ScoringConfig;
use crate::error::{MasteryError, Result};
use crate::registry::ConceptRegistry;
use crate::types::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Knobs for one classification call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifyOptions {
    pub weak_threshold: f64,
    pub strong_threshold: f64,
    pub half_life_days: f64,
    pub default_score: f64,
    pub similarity_cutoff: f32,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        ScoringConfig::default().into()
    }
}

impl From<ScoringConfig> for ClassifyOptions {
    fn from(config: ScoringConfig) -> Self {
        Self {
            weak_threshold: config.weak_threshold,
            strong_threshold: config.strong_threshold,
            half_life_days: config.half_life_days,
            default_score: config.default_score,
            similarity_cutoff: config.similarity_cutoff,
        }
    }
}

impl ClassifyOptions {
    /// Same options with different thresholds
    pub fn with_thresholds(mut self, weak_threshold: f64, strong_threshold: f64) -> Self {
        self.weak_threshold = weak_threshold;
        self.strong_threshold = strong_threshold;
        self
    }

    /// Reject NaN knobs
    ///
    /// Any ordering of the thresholds is accepted: the bucket rule checks
    /// `weak` first, so inverted thresholds still partition the input.
    pub fn validate(&self) -> Result<()> {
        let knobs = [
            ("weak threshold", self.weak_threshold),
            ("strong threshold", self.strong_threshold),
            ("default score", self.default_score),
            ("similarity cutoff", self.similarity_cutoff as f64),
        ];
        if let Some((name, _)) = knobs.iter().find(|(_, value)| value.is_nan()) {
            return Err(MasteryError::Validation(format!("{} must be a number", name)));
        }
        Ok(())
    }
}

/// Which bucket a score falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Weak,
    Strong,
    Neutral,
}

impl Bucket {
    /// `score < weak` is weak, `score > strong` is strong, else neutral
    pub fn for_score(score: f64, weak_threshold: f64, strong_threshold: f64) -> Self {
        if score < weak_threshold {
            Bucket::Weak
        } else if score > strong_threshold {
            Bucket::Strong
        } else {
            Bucket::Neutral
        }
    }
}

/// Partition of the input phrases, original text and order preserved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub weak: Vec<String>,
    pub strong: Vec<String>,
    pub neutral: Vec<String>,
}

impl Classification {
    pub fn push(&mut self, bucket: Bucket, phrase: String) {
        match bucket {
            Bucket::Weak => self.weak.push(phrase),
            Bucket::Strong => self.strong.push(phrase),
            Bucket::Neutral => self.neutral.push(phrase),
        }
    }

    /// Total phrases across all buckets
    pub fn len(&self) -> usize {
        self.weak.len() + self.strong.len() + self.neutral.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket holding `phrase`, if any
    pub fn bucket_of(&self, phrase: &str) -> Option<Bucket> {
        if self.weak.iter().any(|p| p == phrase) {
            Some(Bucket::Weak)
        } else if self.strong.iter().any(|p| p == phrase) {
            Some(Bucket::Strong)
        } else if self.neutral.iter().any(|p| p == phrase) {
            Some(Bucket::Neutral)
        } else {
            None
        }
    }
}

/// Convex blend of a neighbour's score with the default
///
/// The neighbour's score lives in (0, 1) while the default may not, so the
/// result can fall outside (0, 1). The formula is kept as is.
pub fn blend(neighbor_score: f64, similarity: f64, default: f64) -> f64 {
    neighbor_score * similarity + default * (1.0 - similarity)
}

/// Substitute score for a phrase with no event history
///
/// - empty registry (or empty phrase): `default`, without embedding
/// - nearest similarity below `similarity_cutoff`: `default`
/// - otherwise the neighbour's score (or `default` if it has none) blended
///   toward `default` by similarity
pub async fn nearest_score(
    registry: &ConceptRegistry,
    phrase: &str,
    scores: &HashMap<String, f64>,
    default: f64,
    similarity_cutoff: f32,
) -> Result<f64> {
    let key = normalize(phrase);
    if key.is_empty() {
        debug!("'{}' -> [empty phrase] default {:.2}", phrase, default);
        return Ok(default);
    }

    let Some((neighbor, similarity)) = registry.nearest(&key).await? else {
        debug!("'{}' -> [no index] default {:.2}", key, default);
        return Ok(default);
    };

    if similarity < similarity_cutoff {
        debug!(
            "'{}' -> [sim {:.2} < {:.2}] default {:.2}",
            key, similarity, similarity_cutoff, default
        );
        return Ok(default);
    }

    let neighbor_score = scores.get(&neighbor).copied().unwrap_or(default);
    let score = blend(neighbor_score, similarity as f64, default);

    debug!(
        "'{}' -> neighbour '{}' (sim {:.2}) => score {:.2}",
        key, neighbor, similarity, score
    );
    Ok(score)
}

/// Bucket every phrase using precomputed scores
pub async fn classify_phrases<S: AsRef<str>>(
    registry: &ConceptRegistry,
    scores: &HashMap<String, f64>,
    phrases: &[S],
    options: &ClassifyOptions,
) -> Result<Classification> {
    options.validate()?;

    let mut classification = Classification::default();
    for phrase in phrases {
        let phrase = phrase.as_ref();
        let key = normalize(phrase);

        let score = match scores.get(&key) {
            Some(score) => *score,
            None => {
                nearest_score(
                    registry,
                    &key,
                    scores,
                    options.default_score,
                    options.similarity_cutoff,
                )
                .await?
            }
        };

        let bucket = Bucket::for_score(score, options.weak_threshold, options.strong_threshold);
        debug!("'{}' score {:.3} -> {:?}", phrase, score, bucket);
        classification.push(bucket, phrase.to_string());
    }

    Ok(classification)
}
