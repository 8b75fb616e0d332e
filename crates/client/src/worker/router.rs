//! Request classification.
//!
//! Rules, first match wins:
//! 1. Cross-origin requests are not intercepted.
//! 2. Images, stylesheets, scripts and fonts go Cache-First.
//! 3. Every other same-origin request (pages, API calls) goes Network-First.

use tally_core::Request;
use url::{Origin, Url};

/// Where an intercepted request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the host performs the request natively.
    Passthrough,
    CacheFirst,
    NetworkFirst,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Passthrough => "passthrough",
            Route::CacheFirst => "cache_first",
            Route::NetworkFirst => "network_first",
        }
    }
}

/// Classifies requests relative to the application origin.
#[derive(Debug, Clone)]
pub struct Router {
    origin: Origin,
}

impl Router {
    pub fn new(origin: &Url) -> Self {
        Self { origin: origin.origin() }
    }

    pub fn classify(&self, request: &Request) -> Route {
        if request.url.origin() != self.origin {
            return Route::Passthrough;
        }
        if request.destination.is_static_asset() {
            return Route::CacheFirst;
        }
        Route::NetworkFirst
    }
}
