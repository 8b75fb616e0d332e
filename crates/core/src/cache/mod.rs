//! SQLite-backed cache storage for one origin.
//!
//! Mirrors the browser's CacheStorage model:
//!
//! - Named, versioned buckets (`tally-v1.0.0`)
//! - Entries keyed by request identity (method + URL, SHA-256)
//! - Atomic single-entry and batch writes
//! - Optional storage quota across all buckets
//! - Worker lifecycle state per cache name
//! - WAL mode for concurrent access

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod worker_state;

pub use crate::Error;

pub use buckets::Bucket;
pub use connection::CacheDb;
pub use worker_state::WorkerRecord;
