//! Durable rows of the concept registry
//!
//! Each concept is written once and never updated. The registry layer
//! decides when to insert; this module only reads and writes rows.

use crate::error::Result;
use crate::storage::{decode_embedding, encode_embedding, SqliteStore};
use crate::types::Concept;
use rusqlite::OptionalExtension;
use tracing::debug;

/// Row access for the `concepts` table
#[derive(Clone)]
pub struct ConceptStore {
    store: SqliteStore,
}

impl ConceptStore {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Insert a concept unless its key already exists
    ///
    /// Returns true when a new row was written.
    pub async fn insert(&self, concept: &Concept) -> Result<bool> {
        let key = concept.key.clone();
        let canonical = concept.canonical_display.clone();
        let bytes = encode_embedding(&concept.embedding);

        let inserted = self
            .store
            .interact(move |conn| {
                let changed = conn.execute(
                    "INSERT OR IGNORE INTO concepts (concept, canonical, embedding)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![key, canonical, bytes],
                )?;
                Ok(changed == 1)
            })
            .await?;

        debug!("Concept insert: key={} new={}", concept.key, inserted);
        Ok(inserted)
    }

    /// Whether a key is registered
    pub async fn contains(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.store
            .interact(move |conn| {
                let found = conn
                    .query_row(
                        "SELECT 1 FROM concepts WHERE concept = ?1",
                        [&key],
                        |_| Ok(()),
                    )
                    .optional()?;
                Ok(found.is_some())
            })
            .await
    }

    /// Fetch one concept by key
    pub async fn get(&self, key: &str) -> Result<Option<Concept>> {
        let key = key.to_string();
        let row = self
            .store
            .interact(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT concept, canonical, embedding FROM concepts WHERE concept = ?1",
                        [&key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, Vec<u8>>(2)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(|(key, canonical_display, bytes)| {
            Ok(Concept {
                key,
                canonical_display,
                embedding: decode_embedding(&bytes)?,
            })
        })
        .transpose()
    }

    /// Every (key, embedding) pair, in insertion order
    pub async fn all_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let rows = self
            .store
            .interact(|conn| {
                let mut stmt =
                    conn.prepare("SELECT concept, embedding FROM concepts ORDER BY rowid")?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(key, bytes)| Ok((key, decode_embedding(&bytes)?)))
            .collect()
    }

    /// All registered keys, in insertion order
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.store
            .interact(|conn| {
                let mut stmt = conn.prepare("SELECT concept FROM concepts ORDER BY rowid")?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(keys)
            })
            .await
    }

    /// Number of registered concepts
    pub async fn count(&self) -> Result<usize> {
        self.store
            .interact(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM concepts", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
    }
}
