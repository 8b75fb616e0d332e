//! Cache entry operations on a bucket.
//!
//! Only GET requests have a storable identity. Writes are single UPSERTs, or
//! one transaction for a batch, so readers never observe a partial entry.

use super::buckets::Bucket;
use super::hash::compute_request_key;
use crate::http::{Request, Response, ResponseType};
use crate::Error;
use bytes::Bytes;
use chrono::Utc;
use tokio_rusqlite::{params, rusqlite};
use url::Url;

/// Stored columns of one entry, before decoding.
struct EntryRow {
    response_url: String,
    status: i64,
    status_text: String,
    response_type: String,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn into_response(self) -> Result<Response, Error> {
        let url = Url::parse(&self.response_url).map_err(|e| Error::CorruptEntry(format!("url: {e}")))?;
        let response_type = ResponseType::parse(&self.response_type)
            .ok_or_else(|| Error::CorruptEntry(format!("response type: {}", self.response_type)))?;
        let headers: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(format!("headers: {e}")))?;
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status: {}", self.status)))?;

        Ok(Response { url, status, status_text: self.status_text, headers, body: Bytes::from(self.body), response_type })
    }
}

/// Encoded entry ready for insertion.
struct NewEntry {
    key_hash: String,
    method: String,
    request_url: String,
    response_url: String,
    status: i64,
    status_text: String,
    response_type: &'static str,
    headers_json: String,
    body: Vec<u8>,
}

impl NewEntry {
    fn encode(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::UnsupportedMethod(format!("cannot store {} requests", request.method)));
        }

        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;

        Ok(Self {
            key_hash: compute_request_key(&request.method, request.url.as_str()),
            method: request.method.clone(),
            request_url: request.url.to_string(),
            response_url: response.url.to_string(),
            status: i64::from(response.status),
            status_text: response.status_text.clone(),
            response_type: response.response_type.as_str(),
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

/// Reject a write that would push usage past the quota.
///
/// `replaced` lists the keys being overwritten in this bucket; their current
/// size is freed by the write.
fn check_quota(
    conn: &rusqlite::Connection, quota: Option<u64>, bucket: &str, replaced: &[String], incoming: u64,
) -> Result<(), Error> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let used: i64 = conn.query_row("SELECT COALESCE(SUM(body_len), 0) FROM entries", [], |row| row.get(0))?;
    let mut freed: i64 = 0;
    for key in replaced {
        freed += conn.query_row(
            "SELECT COALESCE(SUM(body_len), 0) FROM entries WHERE bucket = ?1 AND key_hash = ?2",
            params![bucket, key],
            |row| row.get::<_, i64>(0),
        )?;
    }

    let available = quota.saturating_sub((used - freed).max(0) as u64);
    if incoming > available {
        return Err(Error::QuotaExceeded { needed: incoming, available });
    }
    Ok(())
}

fn insert_entry(conn: &rusqlite::Connection, bucket: &str, entry: &NewEntry, stored_at: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
        params![bucket, stored_at],
    )?;
    conn.execute(
        "INSERT INTO entries (
            bucket, key_hash, method, request_url, response_url, status, status_text,
            response_type, headers_json, body, body_len, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(bucket, key_hash) DO UPDATE SET
            method = excluded.method,
            request_url = excluded.request_url,
            response_url = excluded.response_url,
            status = excluded.status,
            status_text = excluded.status_text,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            body_len = excluded.body_len,
            stored_at = excluded.stored_at",
        params![
            bucket,
            &entry.key_hash,
            &entry.method,
            &entry.request_url,
            &entry.response_url,
            entry.status,
            &entry.status_text,
            entry.response_type,
            &entry.headers_json,
            &entry.body,
            entry.body.len() as i64,
            stored_at,
        ],
    )?;
    Ok(())
}

impl Bucket {
    /// Find the stored response for a request.
    ///
    /// Non-GET requests never match.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        self.match_key(compute_request_key(&request.method, request.url.as_str()))
            .await
    }

    /// Find the stored response for a GET of `url`.
    pub async fn match_url(&self, url: &Url) -> Result<Option<Response>, Error> {
        self.match_key(compute_request_key("GET", url.as_str())).await
    }

    async fn match_key(&self, key_hash: String) -> Result<Option<Response>, Error> {
        let bucket = self.name.clone();
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status, status_text, response_type, headers_json, body
                     FROM entries WHERE bucket = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![bucket, key_hash], |row| {
                    Ok(EntryRow {
                        response_url: row.get(0)?,
                        status: row.get(1)?,
                        status_text: row.get(2)?,
                        response_type: row.get(3)?,
                        headers_json: row.get(4)?,
                        body: row.get(5)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_response).transpose()
    }

    /// Store a response for a request, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// - `UnsupportedMethod` for non-GET requests
    /// - `QuotaExceeded` if the storage quota would be exceeded
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let entry = NewEntry::encode(request, response)?;
        let bucket = self.name.clone();
        let quota = self.db.quota_bytes;
        let stored_at = Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                check_quota(&tx, quota, &bucket, std::slice::from_ref(&entry.key_hash), entry.body.len() as u64)?;
                insert_entry(&tx, &bucket, &entry, &stored_at)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of entries in one transaction: either all are written or none.
    ///
    /// Returns the number of entries written.
    pub async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<usize, Error> {
        let encoded = entries
            .iter()
            .map(|(request, response)| NewEntry::encode(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let bucket = self.name.clone();
        let quota = self.db.quota_bytes;
        let stored_at = Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                let keys: Vec<String> = encoded.iter().map(|e| e.key_hash.clone()).collect();
                let incoming: u64 = encoded.iter().map(|e| e.body.len() as u64).sum();
                check_quota(&tx, quota, &bucket, &keys, incoming)?;
                for entry in &encoded {
                    insert_entry(&tx, &bucket, entry, &stored_at)?;
                }
                tx.commit()?;
                Ok(encoded.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in this bucket.
    pub async fn len(&self) -> Result<u64, Error> {
        let bucket = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE bucket = ?1", params![bucket], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
