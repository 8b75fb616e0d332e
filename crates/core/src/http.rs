//! Request and response snapshots exchanged between the host, the worker and the cache.
//!
//! Bodies are held in [`Bytes`], so cloning a response to store it while also
//! returning it to the caller does not copy the payload.

use std::fmt;

use bytes::Bytes;
use url::Url;

/// Declared resource kind of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Destination {
    /// Full page navigation.
    Document,
    Image,
    Style,
    Script,
    Font,
    Manifest,
    /// `fetch()`/XHR calls carry no destination.
    #[default]
    Empty,
    Other,
}

impl Destination {
    /// Parse a destination name. Unknown names map to [`Destination::Other`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "image" => Destination::Image,
            "style" | "stylesheet" => Destination::Style,
            "script" => Destination::Script,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            "" | "empty" | "fetch" | "xhr" => Destination::Empty,
            _ => Destination::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Style => "style",
            Destination::Script => "script",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Empty => "",
            Destination::Other => "other",
        }
    }

    /// Static sub-resources whose content is addressed by URL.
    pub fn is_static_asset(&self) -> bool {
        matches!(self, Destination::Image | Destination::Style | Destination::Script | Destination::Font)
    }
}

/// How much of a response the page is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// Same-origin, fully readable.
    Basic,
    /// Cross-origin, readable.
    Cors,
    /// Cross-origin, body and status hidden.
    Opaque,
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            "error" => Some(ResponseType::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Absolute URL without fragment.
    pub url: Url,
    pub destination: Destination,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Build a request, normalizing the method and dropping the URL fragment.
    pub fn new(method: &str, mut url: Url, destination: Destination) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url, destination, headers: Vec::new() }
    }

    /// Shorthand for a GET request.
    pub fn get(url: Url, destination: Destination) -> Self {
        Self::new("GET", url, destination)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Human-readable identity used in logs and errors.
    pub fn identity(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// A response snapshot, either live from the network or replayed from a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub response_type: ResponseType,
}

impl Response {
    /// Status in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Exactly HTTP 200 and same-origin readable.
    pub fn is_basic_ok(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    /// Case-insensitive header lookup; returns the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
