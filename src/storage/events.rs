//! Append-only event log
//!
//! Events are never updated or deleted. The only read path is a full scan
//! of one user's history, which the aggregator folds into scores.

use crate::error::Result;
use crate::storage::SqliteStore;
use crate::types::Event;
use tracing::debug;

/// Event log over the `events` table
#[derive(Clone)]
pub struct EventStore {
    store: SqliteStore,
}

impl EventStore {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Append one event; committed before this returns
    pub async fn append(&self, event: &Event) -> Result<()> {
        debug!(
            "Appending event: user={} concept={} weight={} ts={}",
            event.user_id, event.concept, event.weight, event.timestamp
        );

        let event = event.clone();
        self.store
            .interact(move |conn| {
                conn.execute(
                    "INSERT INTO events (user_id, concept, weight, ts) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![event.user_id, event.concept, event.weight, event.timestamp],
                )?;
                Ok(())
            })
            .await
    }

    /// All events recorded for a user, in insertion order
    pub async fn events_for_user(&self, user_id: &str) -> Result<Vec<Event>> {
        let user_id = user_id.to_string();
        let events = self
            .store
            .interact(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT user_id, concept, weight, ts FROM events
                     WHERE user_id = ?1 ORDER BY rowid",
                )?;
                let events = stmt
                    .query_map([&user_id], |row| {
                        Ok(Event {
                            user_id: row.get(0)?,
                            concept: row.get(1)?,
                            weight: row.get(2)?,
                            timestamp: row.get(3)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(events)
            })
            .await?;

        debug!("Loaded {} events", events.len());
        Ok(events)
    }

    /// Count events, for one user or overall
    pub async fn count(&self, user_id: Option<&str>) -> Result<usize> {
        let user_id = user_id.map(str::to_string);
        self.store
            .interact(move |conn| {
                let count: i64 = match user_id {
                    Some(user_id) => conn.query_row(
                        "SELECT COUNT(*) FROM events WHERE user_id = ?1",
                        [&user_id],
                        |row| row.get(0),
                    )?,
                    None => conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?,
                };
                Ok(count as usize)
            })
            .await
    }
}
