//! Worker runtime for the tally offline layer.
//!
//! This crate provides the network fetcher and the service worker: cache
//! lifecycle, request routing, caching strategies and the auxiliary message,
//! sync and push handlers.

pub mod fetch;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, UrlError};
pub use worker::{Event, EventOutcome, FetchOutcome, ServiceWorker, WorkerConfig, WorkerState};
