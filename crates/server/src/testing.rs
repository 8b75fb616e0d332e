//! Offline host for tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use tally_client::{Fetcher, ServiceWorker, WorkerConfig};
use tally_client::worker::NotificationConfig;
use tally_core::{CacheDb, Error, Request, Response, ResponseType};
use url::Url;

use crate::host::Host;

pub(crate) const CURRENT: &str = "expense-tracker-v2";

pub(crate) fn origin() -> Url {
    Url::parse("https://tally.example").unwrap()
}

/// Answers from a fixed table; anything else fails like an offline network.
#[derive(Default)]
pub(crate) struct TableFetcher {
    routes: Mutex<HashMap<String, (u16, &'static str)>>,
    seen: Mutex<Vec<Request>>,
}

impl TableFetcher {
    pub(crate) fn respond(&self, target: &str, status: u16, body: &'static str) {
        let url = origin().join(target).unwrap().to_string();
        self.routes.lock().unwrap().insert(url, (status, body));
    }

    pub(crate) fn forget(&self, target: &str) {
        let url = origin().join(target).unwrap().to_string();
        self.routes.lock().unwrap().remove(&url);
    }

    /// Most recent request that reached the network.
    pub(crate) fn last_request(&self) -> Option<Request> {
        self.seen.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Fetcher for TableFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.seen.lock().unwrap().push(request.clone());
        let route = self.routes.lock().unwrap().get(request.url.as_str()).copied();
        let (status, body) = route.ok_or_else(|| Error::Network(format!("offline: {}", request.url)))?;
        let response_type =
            if request.url.origin() == origin().origin() { ResponseType::Basic } else { ResponseType::Cors };

        Ok(Response {
            url: request.url.clone(),
            status,
            status_text: String::new(),
            headers: vec![("content-type".into(), "text/html".into())],
            body: Bytes::from_static(body.as_bytes()),
            response_type,
        })
    }
}

/// Host with `/` and `/a.css` in the manifest, both answerable.
pub(crate) async fn host() -> (Arc<TableFetcher>, Host) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = Arc::new(TableFetcher::default());
    fetcher.respond("/", 200, "<app shell>");
    fetcher.respond("/a.css", 200, "body{}");

    let config = WorkerConfig {
        origin: origin(),
        cache_name: CURRENT.into(),
        precache: vec![origin().join("/").unwrap(), origin().join("/a.css").unwrap()],
        network_timeout: Duration::from_secs(5),
        sync_tag: "sync-expenses".into(),
        notifications: NotificationConfig {
            app_name: "Expense Tracker".into(),
            icon: "/icons/icon-192x192.png".into(),
            badge: "/icons/icon-72x72.png".into(),
            vibrate: vec![100, 50, 100],
            default_primary_key: "1".into(),
        },
    };

    let worker = ServiceWorker::new(config, db.clone(), fetcher.clone());
    (fetcher.clone(), Host::new(worker, db, fetcher))
}

/// Decode the JSON text content of a tool result.
pub(crate) fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
