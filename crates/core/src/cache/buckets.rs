//! Named cache buckets.
//!
//! A bucket is a versioned collection of request/response pairs. The worker
//! keeps exactly one bucket current; every other bucket in the database is
//! stale and only ever deleted.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use tokio_rusqlite::params;

/// Handle to one named bucket.
///
/// Obtained from [`CacheDb::open_bucket`]; entry operations live in
/// `entries.rs`.
#[derive(Clone, Debug)]
pub struct Bucket {
    pub(crate) db: CacheDb,
    pub(crate) name: String,
}

impl Bucket {
    /// Bucket name, including its version tag.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CacheDb {
    /// Handle to a bucket without creating it.
    ///
    /// Lookups on a missing bucket miss; the first write creates it.
    pub fn bucket(&self, name: &str) -> Bucket {
        Bucket { db: self.clone(), name: name.to_string() }
    }

    /// Open a bucket, creating it if it does not exist.
    pub async fn open_bucket(&self, name: &str) -> Result<Bucket, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("bucket name cannot be empty".into()));
        }

        let bucket = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![bucket, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Bucket { db: self.clone(), name: name.to_string() })
    }

    /// List bucket names, oldest first.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and all of its entries.
    ///
    /// Returns false if no bucket had that name.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE bucket = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Total body bytes stored across all buckets.
    pub async fn usage_bytes(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let used: i64 = conn.query_row("SELECT COALESCE(SUM(body_len), 0) FROM entries", [], |row| row.get(0))?;
                Ok(used as u64)
            })
            .await
            .map_err(Error::from)
    }
}
