//! Scripted network for worker tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tally_core::{CacheDb, Error, Request, Response, ResponseType};
use url::Url;

use crate::fetch::Fetcher;
use crate::worker::lifecycle::BucketStore;

pub(crate) const ORIGIN: &str = "https://tally.example";

pub(crate) fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub(crate) fn url(path: &str) -> Url {
    origin().join(path).unwrap()
}

#[derive(Clone)]
enum Reply {
    Respond { status: u16, body: &'static str, response_type: ResponseType },
    Fail(&'static str),
    Invalid(&'static str),
    Hang,
}

/// In-memory [`Fetcher`] answering from a route table and recording every call.
///
/// Unrouted URLs reject with `NETWORK_ERROR`, like an offline network.
#[derive(Default)]
pub(crate) struct StubFetcher {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn route(&self, target: &str, reply: Reply) {
        self.routes.lock().unwrap().insert(url(target).to_string(), reply);
    }

    /// Same-origin (or absolute) URL answering with a `basic` response.
    pub(crate) fn respond(&self, target: &str, status: u16, body: &'static str) {
        self.route(target, Reply::Respond { status, body, response_type: ResponseType::Basic });
    }

    pub(crate) fn respond_cors(&self, target: &str, status: u16, body: &'static str) {
        self.route(target, Reply::Respond { status, body, response_type: ResponseType::Cors });
    }

    pub(crate) fn fail(&self, target: &str, reason: &'static str) {
        self.route(target, Reply::Fail(reason));
    }

    /// Rejects before reaching the network, like a malformed request.
    pub(crate) fn reject(&self, target: &str, reason: &'static str) {
        self.route(target, Reply::Invalid(reason));
    }

    /// Never answers; exercises deadlines.
    pub(crate) fn hang(&self, target: &str) {
        self.route(target, Reply::Hang);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, target: &str) -> usize {
        let target = url(target).to_string();
        self.calls.lock().unwrap().iter().filter(|u| **u == target).count()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let key = request.url.to_string();
        self.calls.lock().unwrap().push(key.clone());
        let reply = self.routes.lock().unwrap().get(&key).cloned();

        match reply {
            Some(Reply::Respond { status, body, response_type }) => Ok(Response {
                url: request.url.clone(),
                status,
                status_text: String::new(),
                headers: vec![("content-type".into(), "text/plain".into())],
                body: Bytes::from_static(body.as_bytes()),
                response_type,
            }),
            Some(Reply::Fail(reason)) => Err(Error::Network(reason.to_string())),
            Some(Reply::Invalid(reason)) => Err(Error::InvalidInput(reason.to_string())),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::Network("hung request finished".into()))
            }
            None => Err(Error::Network(format!("offline: {key}"))),
        }
    }
}

/// Bucket store whose deletion of one bucket always fails.
pub(crate) struct LockedBucket {
    pub(crate) db: CacheDb,
    pub(crate) name: &'static str,
}

#[async_trait]
impl BucketStore for LockedBucket {
    async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.db.bucket_names().await
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        if name == self.name {
            return Err(Error::CorruptEntry(format!("{name}: database table is locked")));
        }
        self.db.delete_bucket(name).await
    }
}
