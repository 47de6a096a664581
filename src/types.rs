//! Core data types for the mastery core
//!
//! This module defines the learning events, the event-kind weight table and
//! the concept records that the event store and concept registry persist.

use crate::error::{MasteryError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Normalize free text into a concept key
///
/// Surrounding whitespace is trimmed and the text is lower-cased. This is the
/// only identity used for concepts, so two phrases that differ only in case
/// or padding are the same concept.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Kind of learning signal, each carrying a fixed weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The user was confused by the concept
    Confusion,
    /// The user was assumed to know the concept
    AssumedMastery,
    /// The user recalled the concept correctly
    RecallCorrect,
    /// The user failed to recall the concept
    RecallFail,
}

impl EventKind {
    /// All known kinds
    pub const ALL: [EventKind; 4] = [
        EventKind::Confusion,
        EventKind::AssumedMastery,
        EventKind::RecallCorrect,
        EventKind::RecallFail,
    ];

    /// Weight contributed by one event of this kind
    pub fn weight(&self) -> f64 {
        match self {
            EventKind::Confusion => -1.0,
            EventKind::AssumedMastery => 0.1,
            EventKind::RecallCorrect => 1.0,
            EventKind::RecallFail => -1.0,
        }
    }

    /// Snake-case name used on the wire and in the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Confusion => "confusion",
            EventKind::AssumedMastery => "assumed_mastery",
            EventKind::RecallCorrect => "recall_correct",
            EventKind::RecallFail => "recall_fail",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = MasteryError;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| MasteryError::InvalidEventKind(s.to_string()))
    }
}

/// Source of an event's weight: a known kind or an explicit override
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventSignal {
    Kind(EventKind),
    Weight(f64),
}

impl EventSignal {
    /// Resolve a textual kind and an optional explicit weight
    ///
    /// An explicit weight always wins. Otherwise the kind must be one of the
    /// known kinds, or the call fails with [`MasteryError::InvalidEventKind`].
    pub fn resolve(kind: Option<&str>, weight: Option<f64>) -> Result<Self> {
        if let Some(weight) = weight {
            return Ok(EventSignal::Weight(weight));
        }

        match kind {
            Some(kind) => Ok(EventSignal::Kind(kind.parse()?)),
            None => Err(MasteryError::InvalidEventKind(
                "no event kind and no explicit weight".to_string(),
            )),
        }
    }

    /// Weight this signal contributes
    pub fn weight(&self) -> f64 {
        match self {
            EventSignal::Kind(kind) => kind.weight(),
            EventSignal::Weight(weight) => *weight,
        }
    }
}

impl From<EventKind> for EventSignal {
    fn from(kind: EventKind) -> Self {
        EventSignal::Kind(kind)
    }
}

/// One timestamped learning signal for a user and a concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: String,
    /// Normalized concept key
    pub concept: String,
    pub weight: f64,
    /// Unix timestamp in seconds
    pub timestamp: i64,
}

/// A registered concept and its unit-length embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    /// Normalized, unique key
    pub key: String,
    pub canonical_display: String,
    pub embedding: Vec<f32>,
}
