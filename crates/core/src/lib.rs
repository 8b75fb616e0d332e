//! Core types and shared functionality for the tally offline cache worker.
//!
//! This crate provides:
//! - Request/response model shared by the worker and its host
//! - Versioned cache buckets with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{Bucket, CacheDb, WorkerRecord};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Request, Response, ResponseType};
