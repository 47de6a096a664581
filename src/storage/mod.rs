//! Storage layer for the mastery core
//!
//! One SQLite database holds the two durable tables:
//! - `events(user_id, concept, weight, ts)`: append-only, no uniqueness
//! - `concepts(concept UNIQUE, canonical, embedding)`: the concept registry
//!
//! Connections come from a deadpool-sqlite pool; every write runs in
//! autocommit mode (or its own transaction) and is durable before the
//! awaiting call returns.

pub mod concepts;
pub mod events;
pub mod vectors;

pub use concepts::ConceptStore;
pub use events::EventStore;
pub use vectors::VectorIndex;

use crate::error::{MasteryError, Result};
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default connection pool size
const DEFAULT_POOL_SIZE: usize = 8;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    user_id TEXT NOT NULL,
    concept TEXT NOT NULL,
    weight  REAL NOT NULL,
    ts      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_user ON events(user_id);

CREATE TABLE IF NOT EXISTS concepts (
    concept   TEXT PRIMARY KEY NOT NULL,
    canonical TEXT NOT NULL,
    embedding BLOB NOT NULL
);
"#;

/// Pooled handle to the mastery database
///
/// Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    /// Open (creating if missing) the database and initialize the schema
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::with_pool_size(db_path, DEFAULT_POOL_SIZE).await
    }

    async fn with_pool_size<P: AsRef<Path>>(db_path: P, pool_size: usize) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let path_str = path.to_string_lossy().to_string();
        info!(
            "Opening mastery database at: {} (pool_size: {})",
            path_str, pool_size
        );

        let mut config = Config::new(path_str);
        config.pool = Some(deadpool_sqlite::PoolConfig::new(pool_size));
        let pool = config.create_pool(Runtime::Tokio1).map_err(|e| {
            MasteryError::Storage(format!("Failed to create connection pool: {}", e))
        })?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.interact(|conn| {
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        info!("Mastery schema initialized");
        Ok(())
    }

    /// Run a closure against a pooled connection on the blocking pool
    pub(crate) async fn interact<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool.get().await.map_err(|e| {
            MasteryError::Storage(format!("Failed to get connection from pool: {}", e))
        })?;

        conn.interact(move |conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            f(conn)
        })
        .await
        .map_err(|e| MasteryError::Storage(format!("Pool interaction failed: {}", e)))?
    }
}

/// Serialize an embedding as D little-endian f32 values
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize a little-endian f32 blob
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(MasteryError::Storage(format!(
            "Invalid embedding byte length: {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
