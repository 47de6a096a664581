//! Decay-weighted aggregation of events into mastery scores
//!
//! Each event contributes `weight * exp(-λ * age)` with
//! `λ = ln 2 / half_life_seconds`, so an event's influence halves every
//! half-life. The per-concept sum is squashed through the logistic function
//! into (0, 1). All ages are measured against one aggregation instant.

use crate::error::{MasteryError, Result};
use crate::storage::EventStore;
use crate::types::Event;
use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

pub const DEFAULT_HALF_LIFE_DAYS: f64 = 30.0;

/// Decay rate per second for a half-life in days
pub fn decay_lambda(half_life_days: f64) -> f64 {
    std::f64::consts::LN_2 / (half_life_days * SECONDS_PER_DAY)
}

/// Multiplier applied to an event logged at `timestamp`, seen from `now`
///
/// The age is taken in f64 so that any pair of stored timestamps yields a
/// factor, even when the difference does not fit in an `i64`.
pub fn decay_factor(lambda: f64, now: i64, timestamp: i64) -> f64 {
    let age = now as f64 - timestamp as f64;
    (-lambda * age).exp()
}

/// Logistic squash into (0, 1)
pub fn squash(raw: f64) -> f64 {
    1.0 / (1.0 + (-raw).exp())
}

/// Sum of decayed weights per concept
pub fn raw_scores(events: &[Event], half_life_days: f64, now: i64) -> HashMap<String, f64> {
    let lambda = decay_lambda(half_life_days);
    let mut raw: HashMap<String, f64> = HashMap::new();

    for event in events {
        *raw.entry(event.concept.clone()).or_insert(0.0) +=
            event.weight * decay_factor(lambda, now, event.timestamp);
    }

    raw
}

/// Squashed score per concept; concepts without events are absent
pub fn scores_from_events(events: &[Event], half_life_days: f64, now: i64) -> HashMap<String, f64> {
    raw_scores(events, half_life_days, now)
        .into_iter()
        .map(|(concept, raw)| (concept, squash(raw)))
        .collect()
}

fn check_half_life(half_life_days: f64) -> Result<()> {
    if !(half_life_days.is_finite() && half_life_days > 0.0) {
        return Err(MasteryError::Validation(format!(
            "half_life_days must be a positive number, got {}",
            half_life_days
        )));
    }
    Ok(())
}

/// Folds a user's event history into per-concept scores
#[derive(Clone)]
pub struct MasteryAggregator {
    events: EventStore,
}

impl MasteryAggregator {
    pub fn new(events: EventStore) -> Self {
        Self { events }
    }

    /// Scores as of the current wall-clock time
    pub async fn compute_scores(
        &self,
        user_id: &str,
        half_life_days: f64,
    ) -> Result<HashMap<String, f64>> {
        self.compute_scores_at(user_id, half_life_days, Utc::now().timestamp())
            .await
    }

    /// Scores as of an explicit instant (unix seconds)
    pub async fn compute_scores_at(
        &self,
        user_id: &str,
        half_life_days: f64,
        now: i64,
    ) -> Result<HashMap<String, f64>> {
        check_half_life(half_life_days)?;

        let events = self.events.events_for_user(user_id).await?;
        let scores = scores_from_events(&events, half_life_days, now);

        debug!(
            "Computed {} concept scores from {} events for user {}",
            scores.len(),
            events.len(),
            user_id
        );
        Ok(scores)
    }
}
