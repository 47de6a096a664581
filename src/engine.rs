//! Engine facade used by the request-handling layer
//!
//! Owns the database handle, the concept registry and the scoring defaults,
//! and exposes `record_event`, `compute_scores` and `classify`. The engine
//! is `Send + Sync`; share it behind an `Arc` across request tasks.

use crate::config::MasteryConfig;
use crate::embeddings::{self, EmbeddingService};
use crate::error::{MasteryError, Result};
use crate::mastery::classifier::classify_phrases;
use crate::mastery::{Classification, ClassifyOptions, MasteryAggregator};
use crate::registry::ConceptRegistry;
use crate::storage::{EventStore, SqliteStore};
use crate::types::{normalize, Event, EventSignal};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Mastery tracking engine
pub struct MasteryEngine {
    events: EventStore,
    aggregator: MasteryAggregator,
    registry: ConceptRegistry,
    options: ClassifyOptions,
}

impl MasteryEngine {
    /// Open the engine described by a configuration
    ///
    /// Builds the configured embedding provider (which may download a
    /// model), opens the database and rebuilds the index from it.
    pub async fn open(config: &MasteryConfig) -> Result<Self> {
        config.validate()?;
        let embedder = embeddings::from_config(&config.embedding).await?;
        Self::with_embedder(config.database_path(), embedder, config.scoring.clone().into()).await
    }

    /// Open with an explicit embedding provider
    pub async fn with_embedder<P: AsRef<Path>>(
        db_path: P,
        embedder: Arc<dyn EmbeddingService>,
        options: ClassifyOptions,
    ) -> Result<Self> {
        options.validate()?;

        let store = SqliteStore::open(db_path).await?;
        let events = EventStore::new(store.clone());
        let registry = ConceptRegistry::open(store, embedder).await?;

        info!(
            "Mastery engine ready (embedding model: {})",
            registry.embedder().model_name()
        );

        Ok(Self {
            aggregator: MasteryAggregator::new(events.clone()),
            events,
            registry,
            options,
        })
    }

    /// Record a learning signal
    ///
    /// The concept text is normalized, registered (embedding it if new) and
    /// only then is the event appended. `timestamp` defaults to now. If the
    /// concept cannot be registered, no event is written.
    pub async fn record_event(
        &self,
        user_id: &str,
        concept_text: &str,
        signal: impl Into<EventSignal>,
        timestamp: Option<i64>,
    ) -> Result<()> {
        let signal = signal.into();
        let weight = signal.weight();
        if !weight.is_finite() {
            return Err(MasteryError::Validation(format!(
                "event weight must be finite, got {}",
                weight
            )));
        }

        let concept = normalize(concept_text);
        if concept.is_empty() {
            return Err(MasteryError::Validation(
                "Concept text cannot be empty".to_string(),
            ));
        }

        self.registry.ensure_concept(&concept).await?;

        let event = Event {
            user_id: user_id.to_string(),
            concept,
            weight,
            timestamp: timestamp.unwrap_or_else(|| Utc::now().timestamp()),
        };
        self.events.append(&event).await?;

        debug!(
            "Recorded {:?} for user {} on '{}'",
            signal, event.user_id, event.concept
        );
        Ok(())
    }

    /// Record a signal given as a textual kind and/or explicit weight
    ///
    /// Fails with [`MasteryError::InvalidEventKind`] before any write when
    /// the kind is unknown and no weight is supplied.
    pub async fn record_event_kind(
        &self,
        user_id: &str,
        concept_text: &str,
        kind: Option<&str>,
        weight: Option<f64>,
        timestamp: Option<i64>,
    ) -> Result<()> {
        let signal = EventSignal::resolve(kind, weight)?;
        self.record_event(user_id, concept_text, signal, timestamp)
            .await
    }

    /// Current per-concept scores for a user
    pub async fn compute_scores(
        &self,
        user_id: &str,
        half_life_days: f64,
    ) -> Result<HashMap<String, f64>> {
        self.aggregator
            .compute_scores(user_id, half_life_days)
            .await
    }

    /// Per-concept scores as of an explicit instant
    pub async fn compute_scores_at(
        &self,
        user_id: &str,
        half_life_days: f64,
        now: i64,
    ) -> Result<HashMap<String, f64>> {
        self.aggregator
            .compute_scores_at(user_id, half_life_days, now)
            .await
    }

    /// Classify phrases with the engine's configured options
    pub async fn classify<S: AsRef<str>>(
        &self,
        user_id: &str,
        phrases: &[S],
    ) -> Result<Classification> {
        self.classify_with(user_id, phrases, &self.options).await
    }

    /// Classify phrases with explicit options
    pub async fn classify_with<S: AsRef<str>>(
        &self,
        user_id: &str,
        phrases: &[S],
        options: &ClassifyOptions,
    ) -> Result<Classification> {
        let scores = self
            .aggregator
            .compute_scores(user_id, options.half_life_days)
            .await?;

        let classification = classify_phrases(&self.registry, &scores, phrases, options).await?;
        debug!(
            "Classified {} phrases for {}: {} weak, {} strong, {} neutral",
            phrases.len(),
            user_id,
            classification.weak.len(),
            classification.strong.len(),
            classification.neutral.len()
        );
        Ok(classification)
    }

    /// Fallback score for a single phrase using the engine's options
    pub async fn nearest_score(&self, phrase: &str, scores: &HashMap<String, f64>) -> Result<f64> {
        crate::mastery::nearest_score(
            &self.registry,
            phrase,
            scores,
            self.options.default_score,
            self.options.similarity_cutoff,
        )
        .await
    }

    pub fn registry(&self) -> &ConceptRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn options(&self) -> &ClassifyOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbeddingService;
    use crate::types::EventKind;
    use tempfile::TempDir;

    async fn create_test_engine() -> (MasteryEngine, TempDir) {
        let temp = TempDir::new().unwrap();
        let engine = MasteryEngine::with_embedder(
            temp.path().join("engine.db"),
            Arc::new(HashEmbeddingService::new(128)),
            ClassifyOptions::default(),
        )
        .await
        .unwrap();
        (engine, temp)
    }

    #[tokio::test]
    async fn test_record_event_normalizes_concept() {
        let (engine, _temp) = create_test_engine().await;

        engine
            .record_event("alice", "  Priors ", EventKind::Confusion, Some(10))
            .await
            .unwrap();
        engine
            .record_event("alice", "PRIORS", EventKind::Confusion, Some(20))
            .await
            .unwrap();

        assert_eq!(engine.registry().keys().await.unwrap(), vec!["priors"]);
        let events = engine.events().events_for_user("alice").await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.concept == "priors"));
    }

    #[tokio::test]
    async fn test_unknown_kind_writes_nothing() {
        let (engine, _temp) = create_test_engine().await;

        let result = engine
            .record_event_kind("alice", "priors", Some("daydream"), None, None)
            .await;
        assert!(matches!(result, Err(MasteryError::InvalidEventKind(_))));
        assert_eq!(engine.events().count(None).await.unwrap(), 0);
        assert!(engine.registry().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_explicit_weight_overrides_kind() {
        let (engine, _temp) = create_test_engine().await;
        engine
            .record_event_kind("alice", "priors", Some("confusion"), Some(2.0), Some(5))
            .await
            .unwrap();

        let events = engine.events().events_for_user("alice").await.unwrap();
        assert_eq!(events[0].weight, 2.0);
        assert_eq!(events[0].timestamp, 5);
    }

    #[tokio::test]
    async fn test_timestamp_defaults_to_now() {
        let (engine, _temp) = create_test_engine().await;
        let before = Utc::now().timestamp();
        engine
            .record_event("alice", "priors", EventKind::RecallCorrect, None)
            .await
            .unwrap();
        let after = Utc::now().timestamp();

        let ts = engine.events().events_for_user("alice").await.unwrap()[0].timestamp;
        assert!(ts >= before && ts <= after);
    }

    #[tokio::test]
    async fn test_empty_concept_rejected() {
        let (engine, _temp) = create_test_engine().await;
        let result = engine
            .record_event("alice", "   ", EventKind::Confusion, None)
            .await;
        assert!(matches!(result, Err(MasteryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_non_finite_weight_rejected() {
        let (engine, _temp) = create_test_engine().await;
        let result = engine
            .record_event("alice", "priors", EventSignal::Weight(f64::NAN), None)
            .await;
        assert!(matches!(result, Err(MasteryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_recorded_event_visible_immediately() {
        let (engine, _temp) = create_test_engine().await;
        engine
            .record_event("alice", "priors", EventKind::RecallCorrect, None)
            .await
            .unwrap();

        let scores = engine.compute_scores("alice", 30.0).await.unwrap();
        assert!(scores["priors"] > 0.5);
        assert!(engine.compute_scores("bob", 30.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extreme_timestamp_keeps_classification_total() {
        let (engine, _temp) = create_test_engine().await;
        engine
            .record_event("alice", "priors", EventKind::Confusion, Some(i64::MIN))
            .await
            .unwrap();

        let scores = engine.compute_scores("alice", 30.0).await.unwrap();
        assert_eq!(scores["priors"], 0.5);

        let result = engine.classify("alice", &["priors"]).await.unwrap();
        assert_eq!(result.neutral, vec!["priors"]);
    }
}
