//! The offline worker.
//!
//! [`ServiceWorker`] receives lifecycle, fetch, message, sync and push events
//! through [`ServiceWorker::dispatch`] and handles each one according to its
//! state:
//!
//! | Event    | installing     | waiting            | active          |
//! |----------|----------------|--------------------|-----------------|
//! | install  | run install    | `INVALID_STATE`    | `INVALID_STATE` |
//! | activate | `INVALID_STATE`| run activate       | `INVALID_STATE` |
//! | fetch    | passthrough    | passthrough        | route + execute |
//! | message  | skip-waiting   | skip-waiting       | ignored         |
//! | sync     | acknowledge    | acknowledge        | acknowledge     |
//! | push     | notification   | notification       | notification    |
//!
//! Requests are only routed once activation has removed every stale bucket.
//! The lifecycle state is recorded next to the bucket it describes, so a
//! worker rebuilt with [`ServiceWorker::restore`] resumes where it left off.

pub mod lifecycle;
pub mod messages;
pub mod push;
pub mod router;
pub mod strategy;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tally_core::{AppConfig, CacheDb, Error, Request};
use url::Url;

pub use lifecycle::{ActivateReport, BucketStore, InstallReport, LifecycleManager};
pub use messages::{ControlMessage, SyncOutcome};
pub use push::{Notification, NotificationConfig};
pub use router::{Route, Router};
pub use strategy::{CacheFirst, CacheWrite, NetworkFirst, ResponseSource, Strategy, StrategyOutcome};

use crate::fetch::{Fetcher, resolve};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Waiting,
    Active,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Active => "active",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "installing" => Some(WorkerState::Installing),
            "waiting" => Some(WorkerState::Waiting),
            "active" => Some(WorkerState::Active),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the worker needs to know about the deployment it serves.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub cache_name: String,
    pub precache: Vec<Url>,
    pub network_timeout: Duration,
    pub sync_tag: String,
    pub notifications: NotificationConfig,
}

impl WorkerConfig {
    /// Build the worker configuration, resolving the precache manifest
    /// against the application origin.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the origin or a manifest entry cannot be
    /// resolved.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let precache = config
            .precache
            .iter()
            .map(|entry| resolve(&origin, entry).map_err(|e| Error::InvalidUrl(format!("precache {entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin,
            cache_name: config.cache_name(),
            precache,
            network_timeout: config.network_timeout(),
            sync_tag: config.sync_tag.clone(),
            notifications: NotificationConfig {
                app_name: config.app_name.clone(),
                icon: config.notification_icon.clone(),
                badge: config.notification_badge.clone(),
                vibrate: config.vibrate_pattern.clone(),
                default_primary_key: config.default_primary_key.clone(),
            },
        })
    }
}

/// An event delivered to the worker.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Message(Value),
    Sync { tag: String },
    /// Raw push payload text, if the push carried one.
    Push(Option<String>),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Install => "install",
            Event::Activate => "activate",
            Event::Fetch(_) => "fetch",
            Event::Message(_) => "message",
            Event::Sync { .. } => "sync",
            Event::Push(_) => "push",
        }
    }
}

/// How a fetch event was answered.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself.
    Passthrough,
    Handled { route: Route, outcome: StrategyOutcome },
}

#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    /// Whether skip-waiting is requested; always false once active.
    MessageHandled { skip_waiting: bool },
    SyncAcknowledged(SyncOutcome),
    Notified(Notification),
}

pub struct ServiceWorker {
    config: WorkerConfig,
    db: CacheDb,
    state: WorkerState,
    skip_waiting: bool,
    controlling: bool,
    lifecycle: LifecycleManager,
    router: Router,
    cache_first: CacheFirst,
    network_first: NetworkFirst,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        let bucket = db.bucket(&config.cache_name);
        let mut shell_url = config.origin.clone();
        shell_url.set_path("/");

        Self {
            lifecycle: LifecycleManager::new(
                db.clone(),
                config.cache_name.clone(),
                config.precache.clone(),
                fetcher.clone(),
            ),
            router: Router::new(&config.origin),
            cache_first: CacheFirst::new(bucket.clone(), fetcher.clone()),
            network_first: NetworkFirst::new(bucket, fetcher, config.network_timeout, shell_url),
            config,
            db,
            state: WorkerState::Installing,
            skip_waiting: false,
            controlling: false,
        }
    }

    /// Build a worker in the state last recorded for its cache name.
    ///
    /// With no record the worker starts in `installing`. A restored `active`
    /// worker controls open clients straight away.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the record cannot be read, or
    /// `CorruptEntry` if it names an unknown state.
    pub async fn restore(config: WorkerConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let record = db.load_worker_state(&config.cache_name).await?;
        let mut worker = Self::new(config, db, fetcher);

        if let Some(record) = record {
            worker.state = WorkerState::parse(&record.state)
                .ok_or_else(|| Error::CorruptEntry(format!("worker state: {}", record.state)))?;
            worker.skip_waiting = record.skip_waiting;
            worker.controlling = worker.state == WorkerState::Active;
            tracing::info!(cache = %worker.config.cache_name, state = %worker.state, "worker restored");
        }
        Ok(worker)
    }

    #[cfg(test)]
    pub(crate) fn with_bucket_store(mut self, store: Arc<dyn BucketStore>) -> Self {
        self.lifecycle = self.lifecycle.with_store(store);
        self
    }

    async fn record(&self, state: WorkerState) -> Result<(), Error> {
        self.db
            .save_worker_state(&self.config.cache_name, state.as_str(), self.skip_waiting)
            .await
            .inspect_err(|e| tracing::warn!(cache = %self.config.cache_name, error = %e, "could not record worker state"))
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Whether open clients are controlled by this worker.
    pub fn is_controlling(&self) -> bool {
        self.controlling
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting
    }

    /// True once installed with skip-waiting requested; the host should
    /// activate without waiting for open clients to close.
    pub fn should_activate(&self) -> bool {
        self.state == WorkerState::Waiting && self.skip_waiting
    }

    fn reject(&self, event: &str) -> Error {
        Error::InvalidState { event: event.to_string(), state: self.state.to_string() }
    }

    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for lifecycle events out of order, and whatever
    /// the handler itself fails with otherwise.
    pub async fn dispatch(&mut self, event: Event) -> Result<EventOutcome, Error> {
        let name = event.name();
        match (event, self.state) {
            (Event::Install, WorkerState::Installing) => self.install().await.map(EventOutcome::Installed),
            (Event::Activate, WorkerState::Waiting) => self.activate().await.map(EventOutcome::Activated),
            (Event::Install | Event::Activate, _) => Err(self.reject(name)),
            (Event::Fetch(request), _) => self.fetch(&request).await.map(EventOutcome::Fetched),
            (Event::Message(data), _) => Ok(EventOutcome::MessageHandled { skip_waiting: self.message(&data) }),
            (Event::Sync { tag }, _) => Ok(EventOutcome::SyncAcknowledged(self.sync(&tag))),
            (Event::Push(payload), _) => self.push(payload.as_deref()).map(EventOutcome::Notified),
        }
    }

    /// Precache the manifest into the current bucket and move to `waiting`.
    ///
    /// A failed install leaves the worker in `installing` so it can be retried.
    pub async fn install(&mut self) -> Result<InstallReport, Error> {
        if self.state != WorkerState::Installing {
            return Err(self.reject("install"));
        }

        let report = self.lifecycle.install().await.inspect_err(|e| {
            tracing::warn!(cache = %self.config.cache_name, error = %e, "install failed");
        })?;

        self.skip_waiting |= report.skip_waiting;
        self.record(WorkerState::Waiting).await?;
        self.state = WorkerState::Waiting;
        tracing::info!(cache = %self.config.cache_name, state = %self.state, "worker installed");
        Ok(report)
    }

    /// Remove stale buckets, take control of open clients and move to `active`.
    ///
    /// Stale buckets that cannot be deleted are reported, not fatal. Failing
    /// to record the new state leaves the worker `waiting`.
    pub async fn activate(&mut self) -> Result<ActivateReport, Error> {
        if self.state != WorkerState::Waiting {
            return Err(self.reject("activate"));
        }

        let mut report = self.lifecycle.activate().await;
        self.record(WorkerState::Active).await?;
        self.state = WorkerState::Active;
        self.controlling = true;
        report.clients_claimed = true;

        tracing::info!(
            cache = %self.config.cache_name,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "worker activated; clients claimed"
        );
        Ok(report)
    }

    /// Answer an intercepted request.
    ///
    /// Before activation every request passes through untouched.
    ///
    /// # Errors
    ///
    /// Returns the network error when no cached response can stand in for it.
    pub async fn fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if self.state != WorkerState::Active {
            tracing::debug!(state = %self.state, "not active; passing through {}", request.url);
            return Ok(FetchOutcome::Passthrough);
        }

        let route = self.router.classify(request);
        let strategy: &dyn Strategy = match route {
            Route::Passthrough => {
                tracing::debug!("cross-origin passthrough for {}", request.url);
                return Ok(FetchOutcome::Passthrough);
            }
            Route::CacheFirst => &self.cache_first,
            Route::NetworkFirst => &self.network_first,
        };

        tracing::debug!(strategy = strategy.name(), "routing {}", request.identity());
        let outcome = strategy.handle(request).await?;
        Ok(FetchOutcome::Handled { route, outcome })
    }

    /// Handle a message posted by a page. Returns whether skip-waiting is
    /// now requested.
    pub fn message(&mut self, data: &Value) -> bool {
        if self.state == WorkerState::Active {
            return false;
        }
        if let Some(ControlMessage::SkipWaiting) = ControlMessage::parse(data) {
            tracing::info!(state = %self.state, "skip waiting requested");
            self.skip_waiting = true;
        }
        self.skip_waiting
    }

    pub fn sync(&self, tag: &str) -> SyncOutcome {
        messages::acknowledge_sync(tag, &self.config.sync_tag)
    }

    /// Build the notification for a push event. The host displays it.
    pub fn push(&self, payload: Option<&str>) -> Result<Notification, Error> {
        let notification = push::build_notification(payload, &self.config.notifications, chrono::Utc::now())?;
        tracing::info!(title = %notification.title, primary_key = %notification.data.primary_key, "push notification");
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{LockedBucket, StubFetcher, origin, url};
    use serde_json::json;
    use tally_core::Destination;

    const CURRENT: &str = "expense-tracker-v2";

    fn config(precache: &[&str]) -> WorkerConfig {
        WorkerConfig {
            origin: origin(),
            cache_name: CURRENT.into(),
            precache: precache.iter().map(|p| url(p)).collect(),
            network_timeout: Duration::from_secs(5),
            sync_tag: "sync-expenses".into(),
            notifications: NotificationConfig {
                app_name: "Expense Tracker".into(),
                icon: "/icons/icon-192x192.png".into(),
                badge: "/icons/icon-72x72.png".into(),
                vibrate: vec![100, 50, 100],
                default_primary_key: "1".into(),
            },
        }
    }

    async fn worker(precache: &[&str]) -> (CacheDb, Arc<StubFetcher>, ServiceWorker) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(StubFetcher::new());
        let worker = ServiceWorker::new(config(precache), db.clone(), fetcher.clone());
        (db, fetcher, worker)
    }

    /// Installed and activated with `/` and `/a.css` precached.
    async fn active_worker() -> (CacheDb, Arc<StubFetcher>, ServiceWorker) {
        let (db, fetcher, mut worker) = worker(&["/", "/a.css"]).await;
        fetcher.respond("/", 200, "<app shell>");
        fetcher.respond("/a.css", 200, "body{}");
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        (db, fetcher, worker)
    }

    fn handled(outcome: FetchOutcome) -> (Route, StrategyOutcome) {
        match outcome {
            FetchOutcome::Handled { route, outcome } => (route, outcome),
            FetchOutcome::Passthrough => panic!("expected the request to be handled"),
        }
    }

    #[test]
    fn test_config_from_app_defaults() {
        let config = WorkerConfig::from_app(&AppConfig::default()).unwrap();
        assert_eq!(config.cache_name, "expense-tracker-v1.0.0");
        assert_eq!(config.precache.len(), 7);
        assert_eq!(config.precache[0].as_str(), "http://localhost:5173/");
        assert!(config.precache[6].as_str().starts_with("https://fonts.googleapis.com/"));
        assert_eq!(config.network_timeout, Duration::from_millis(10_000));
        assert_eq!(config.notifications.default_primary_key, "1");
    }

    #[test]
    fn test_config_rejects_bad_manifest_entry() {
        let app = AppConfig { precache: vec!["ftp://files.example/x".into()], ..AppConfig::default() };
        assert!(matches!(WorkerConfig::from_app(&app), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_e2e_install_then_activate() {
        let (db, fetcher, mut worker) = worker(&["/", "/a.css"]).await;
        db.open_bucket("expense-tracker-v1").await.unwrap();
        fetcher.respond("/", 200, "<app shell>");
        fetcher.respond("/a.css", 200, "body{}");

        let installed = worker.dispatch(Event::Install).await.unwrap();
        assert!(matches!(installed, EventOutcome::Installed(ref r) if r.precached == 2));
        assert_eq!(worker.state(), WorkerState::Waiting);
        assert_eq!(db.bucket(CURRENT).len().await.unwrap(), 2);
        assert!(worker.should_activate());

        let EventOutcome::Activated(report) = worker.dispatch(Event::Activate).await.unwrap() else {
            panic!("expected activation");
        };
        assert_eq!(report.deleted, vec!["expense-tracker-v1".to_string()]);
        assert!(report.clients_claimed);
        assert!(worker.is_controlling());
        assert_eq!(worker.state(), WorkerState::Active);
        assert_eq!(db.bucket_names().await.unwrap(), vec![CURRENT.to_string()]);
    }

    #[tokio::test]
    async fn test_e2e_image_miss_is_fetched_and_stored() {
        let (db, fetcher, worker) = active_worker().await;
        fetcher.respond("/logo.png", 200, "png");

        let request = Request::get(url("/logo.png"), Destination::Image);
        let (route, outcome) = handled(worker.fetch(&request).await.unwrap());
        assert_eq!(route, Route::CacheFirst);
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.text(), "png");
        assert!(db.bucket(CURRENT).match_request(&request).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_e2e_api_failure_without_entry_rejects() {
        let (db, fetcher, worker) = active_worker().await;
        fetcher.fail("/api/expenses", "offline");

        let request = Request::get(url("/api/expenses"), Destination::Empty);
        let result = worker.fetch(&request).await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert!(db.bucket(CURRENT).match_request(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_e2e_offline_navigation_serves_root() {
        let (_db, fetcher, worker) = active_worker().await;
        fetcher.fail("/dashboard", "offline");

        let request = Request::get(url("/dashboard"), Destination::Document);
        let (route, outcome) = handled(worker.fetch(&request).await.unwrap());
        assert_eq!(route, Route::NetworkFirst);
        assert_eq!(outcome.source, ResponseSource::OfflineShell);
        assert_eq!(outcome.response.text(), "<app shell>");
    }

    #[tokio::test]
    async fn test_cross_origin_does_no_cache_io() {
        let (db, fetcher, worker) = active_worker().await;
        let calls_before = fetcher.calls();
        let entries_before = db.bucket(CURRENT).len().await.unwrap();

        let request = Request::get(Url::parse("https://cdn.example/logo.png").unwrap(), Destination::Image);
        assert!(matches!(worker.fetch(&request).await.unwrap(), FetchOutcome::Passthrough));
        assert_eq!(fetcher.calls(), calls_before);
        assert_eq!(db.bucket(CURRENT).len().await.unwrap(), entries_before);
    }

    #[tokio::test]
    async fn test_precached_stylesheet_served_without_network() {
        let (_db, fetcher, worker) = active_worker().await;

        let request = Request::get(url("/a.css"), Destination::Style);
        let (_, outcome) = handled(worker.fetch(&request).await.unwrap());
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(fetcher.calls_for("/a.css"), 1);
    }

    #[tokio::test]
    async fn test_network_first_overwrites_entry() {
        let (db, fetcher, worker) = active_worker().await;
        fetcher.respond("/", 200, "<new shell>");

        let request = Request::get(url("/"), Destination::Document);
        let (_, outcome) = handled(worker.fetch(&request).await.unwrap());
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.text(), "<new shell>");

        let stored = db.bucket(CURRENT).match_request(&request).await.unwrap().unwrap();
        assert_eq!(stored.text(), "<new shell>");
    }

    #[tokio::test]
    async fn test_fetch_before_activation_passes_through() {
        let (db, fetcher, mut worker) = worker(&["/"]).await;
        fetcher.respond("/", 200, "<app shell>");
        fetcher.respond("/logo.png", 200, "png");
        let request = Request::get(url("/logo.png"), Destination::Image);

        let outcome = worker.dispatch(Event::Fetch(request.clone())).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Fetched(FetchOutcome::Passthrough)));

        worker.install().await.unwrap();
        assert!(matches!(worker.fetch(&request).await.unwrap(), FetchOutcome::Passthrough));
        assert_eq!(fetcher.calls_for("/logo.png"), 0);
        assert!(db.bucket(CURRENT).match_request(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lifecycle_events_out_of_order_rejected() {
        let (_db, fetcher, mut worker) = worker(&["/"]).await;
        fetcher.respond("/", 200, "<app shell>");

        let err = worker.dispatch(Event::Activate).await.unwrap_err();
        assert_eq!(err.to_string(), "INVALID_STATE: activate while installing");

        worker.dispatch(Event::Install).await.unwrap();
        let err = worker.dispatch(Event::Install).await.unwrap_err();
        assert_eq!(err.to_string(), "INVALID_STATE: install while waiting");

        worker.dispatch(Event::Activate).await.unwrap();
        assert!(matches!(worker.dispatch(Event::Activate).await, Err(Error::InvalidState { .. })));
        assert!(matches!(worker.dispatch(Event::Install).await, Err(Error::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_failed_install_can_be_retried() {
        let (db, fetcher, mut worker) = worker(&["/", "/a.css"]).await;
        fetcher.respond("/", 200, "<app shell>");
        fetcher.fail("/a.css", "connection reset");

        assert!(matches!(worker.dispatch(Event::Install).await, Err(Error::PrecacheFailed { .. })));
        assert_eq!(worker.state(), WorkerState::Installing);
        assert!(!worker.should_activate());
        assert_eq!(db.bucket(CURRENT).len().await.unwrap(), 0);

        fetcher.respond("/a.css", 200, "body{}");
        worker.dispatch(Event::Install).await.unwrap();
        assert_eq!(worker.state(), WorkerState::Waiting);
    }

    #[tokio::test]
    async fn test_skip_waiting_message() {
        let (_db, _fetcher, mut worker) = worker(&[]).await;

        let ignored = worker.dispatch(Event::Message(json!({"type": "PING"}))).await.unwrap();
        assert!(matches!(ignored, EventOutcome::MessageHandled { skip_waiting: false }));

        let recorded = worker.dispatch(Event::Message(json!({"type": "SKIP_WAITING"}))).await.unwrap();
        assert!(matches!(recorded, EventOutcome::MessageHandled { skip_waiting: true }));
        assert!(worker.skip_waiting_requested());
        assert!(!worker.should_activate());
    }

    #[tokio::test]
    async fn test_message_ignored_once_active() {
        let (_db, _fetcher, mut worker) = active_worker().await;
        let outcome = worker.dispatch(Event::Message(json!({"type": "SKIP_WAITING"}))).await.unwrap();
        assert!(matches!(outcome, EventOutcome::MessageHandled { skip_waiting: false }));
        assert_eq!(worker.state(), WorkerState::Active);
    }

    #[tokio::test]
    async fn test_sync_and_push_in_any_state() {
        let (_db, _fetcher, mut worker) = worker(&[]).await;

        let EventOutcome::SyncAcknowledged(sync) =
            worker.dispatch(Event::Sync { tag: "sync-expenses".into() }).await.unwrap()
        else {
            panic!("expected sync acknowledgement");
        };
        assert!(sync.recognized);

        let payload = r#"{"title":"Budget alert","body":"Over budget"}"#.to_string();
        let EventOutcome::Notified(notification) = worker.dispatch(Event::Push(Some(payload))).await.unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(notification.title, "Budget alert");
        assert_eq!(notification.data.primary_key, "1");

        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        assert!(matches!(worker.dispatch(Event::Push(None)).await.unwrap(), EventOutcome::Notified(_)));
        assert!(matches!(
            worker.dispatch(Event::Sync { tag: "other".into() }).await.unwrap(),
            EventOutcome::SyncAcknowledged(SyncOutcome { recognized: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_install_and_activate_are_recorded() {
        let (db, fetcher, mut worker) = worker(&["/"]).await;
        fetcher.respond("/", 200, "<app shell>");
        assert_eq!(db.load_worker_state(CURRENT).await.unwrap(), None);

        worker.install().await.unwrap();
        let record = db.load_worker_state(CURRENT).await.unwrap().unwrap();
        assert_eq!(record.state, "waiting");
        assert!(record.skip_waiting);

        worker.activate().await.unwrap();
        assert_eq!(db.load_worker_state(CURRENT).await.unwrap().unwrap().state, "active");
    }

    #[tokio::test]
    async fn test_restored_worker_serves_offline_shell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");

        let db = CacheDb::open(&path).await.unwrap();
        let online = Arc::new(StubFetcher::new());
        online.respond("/", 200, "<app shell>");
        online.respond("/a.css", 200, "body{}");
        let mut worker = ServiceWorker::new(config(&["/", "/a.css"]), db.clone(), online);
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        drop(worker);
        db.close().await.unwrap();

        let db = CacheDb::open(&path).await.unwrap();
        let offline = Arc::new(StubFetcher::new());
        let worker = ServiceWorker::restore(config(&["/", "/a.css"]), db, offline.clone()).await.unwrap();
        assert_eq!(worker.state(), WorkerState::Active);
        assert!(worker.is_controlling());

        let request = Request::get(url("/dashboard"), Destination::Document);
        let (route, outcome) = handled(worker.fetch(&request).await.unwrap());
        assert_eq!(route, Route::NetworkFirst);
        assert_eq!(outcome.source, ResponseSource::OfflineShell);
        assert_eq!(outcome.response.text(), "<app shell>");
        assert_eq!(offline.calls_for("/dashboard"), 1);
    }

    #[tokio::test]
    async fn test_restore_without_record_starts_installing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = ServiceWorker::restore(config(&["/"]), db, Arc::new(StubFetcher::new())).await.unwrap();
        assert_eq!(worker.state(), WorkerState::Installing);
        assert!(!worker.is_controlling());
    }

    #[tokio::test]
    async fn test_restore_waiting_worker() {
        let (db, fetcher, mut worker) = worker(&["/"]).await;
        fetcher.respond("/", 200, "<app shell>");
        worker.install().await.unwrap();

        let restored = ServiceWorker::restore(config(&["/"]), db, fetcher).await.unwrap();
        assert_eq!(restored.state(), WorkerState::Waiting);
        assert!(restored.should_activate());
        assert!(!restored.is_controlling());
    }

    #[tokio::test]
    async fn test_restore_rejects_unknown_state() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.save_worker_state(CURRENT, "redundant", false).await.unwrap();

        let result = ServiceWorker::restore(config(&["/"]), db, Arc::new(StubFetcher::new())).await;
        assert!(matches!(result, Err(Error::CorruptEntry(_))));
    }

    #[tokio::test]
    async fn test_activation_survives_failed_cleanup() {
        let (db, fetcher, worker) = worker(&["/"]).await;
        fetcher.respond("/", 200, "<app shell>");
        db.open_bucket("expense-tracker-v0").await.unwrap();
        db.open_bucket("expense-tracker-v1").await.unwrap();
        let store = Arc::new(LockedBucket { db: db.clone(), name: "expense-tracker-v0" });
        let mut worker = worker.with_bucket_store(store);

        worker.dispatch(Event::Install).await.unwrap();
        let EventOutcome::Activated(report) = worker.dispatch(Event::Activate).await.unwrap() else {
            panic!("expected activation");
        };

        assert_eq!(report.deleted, vec!["expense-tracker-v1".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "expense-tracker-v0");
        assert!(report.clients_claimed);
        assert_eq!(worker.state(), WorkerState::Active);
        assert!(worker.is_controlling());
        assert_eq!(db.load_worker_state(CURRENT).await.unwrap().unwrap().state, "active");
    }

    #[tokio::test]
    async fn test_activate_keeps_waiting_when_state_not_recorded() {
        let (db, fetcher, mut worker) = worker(&["/"]).await;
        fetcher.respond("/", 200, "<app shell>");
        worker.install().await.unwrap();
        db.close().await.unwrap();

        assert!(matches!(worker.activate().await, Err(Error::Database(_))));
        assert_eq!(worker.state(), WorkerState::Waiting);
        assert!(!worker.is_controlling());
    }
}
