//! Persisted worker lifecycle state.
//!
//! One row per cache name. The row belongs to the bucket it names, so deleting
//! the bucket forgets the state with it.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use tokio_rusqlite::{params, rusqlite};

/// Lifecycle state last recorded for a cache name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRecord {
    pub state: String,
    pub skip_waiting: bool,
}

impl CacheDb {
    /// Load the recorded state for `cache_name`, if any.
    pub async fn load_worker_state(&self, cache_name: &str) -> Result<Option<WorkerRecord>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<WorkerRecord>, Error> {
                let result = conn.query_row(
                    "SELECT state, skip_waiting FROM worker_state WHERE cache_name = ?1",
                    params![cache_name],
                    |row| Ok(WorkerRecord { state: row.get(0)?, skip_waiting: row.get(1)? }),
                );

                match result {
                    Ok(record) => Ok(Some(record)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record the state for `cache_name`, replacing any earlier record.
    pub async fn save_worker_state(&self, cache_name: &str, state: &str, skip_waiting: bool) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let state = state.to_string();
        let updated_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![cache_name, updated_at],
                )?;
                tx.execute(
                    "INSERT INTO worker_state (cache_name, state, skip_waiting, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(cache_name) DO UPDATE SET
                        state = excluded.state,
                        skip_waiting = excluded.skip_waiting,
                        updated_at = excluded.updated_at",
                    params![cache_name, state, skip_waiting, updated_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
