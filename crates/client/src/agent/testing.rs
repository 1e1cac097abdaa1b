//! Scripted collaborators for agent tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use shellcache_core::{CacheStorage, Error, MemoryCacheStorage, Request, Response, ResponseSource};
use tokio::sync::watch;

/// In-memory network with per-URL routes, failures, an offline switch and a
/// gate that can hold fetches in flight.
pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<String, (u16, String)>>,
    sequences: Mutex<HashMap<String, VecDeque<String>>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
    gate: watch::Sender<bool>,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            sequences: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            offline: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            gate: watch::channel(false).0,
        }
    }

    pub(crate) fn route(&self, url: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), (status, body.to_string()));
    }

    /// Answer successive fetches of `url` with `bodies`, one each, in call
    /// order. Once they run out the plain route applies again.
    pub(crate) fn route_sequence(&self, url: &str, bodies: &[&str]) {
        let queue = bodies.iter().map(|b| b.to_string()).collect();
        self.sequences.lock().unwrap().insert(url.to_string(), queue);
    }

    /// Make fetches of `url` fail as if the connection dropped.
    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Park every fetch until [`release`](Self::release).
    pub(crate) fn hold(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn release(&self) {
        self.gate.send_replace(false);
    }

    /// URLs fetched so far, in call order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl crate::fetch::Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());
        let queued = self.sequences.lock().unwrap().get_mut(&url).and_then(VecDeque::pop_front);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|held| !*held).await;

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&url) {
            return Err(Error::Network(format!("connection failed: {url}")));
        }

        let route = match queued {
            Some(body) => Some((200, body)),
            None => self.routes.lock().unwrap().get(&url).cloned(),
        };
        let (status, body) = route.unwrap_or((404, "not found".to_string()));
        let status = StatusCode::from_u16(status).unwrap();
        Ok(Response::new(status, HeaderMap::new(), body, ResponseSource::Network))
    }
}

/// Storage whose deletes of one store always fail.
pub(crate) struct FailingDeletes {
    inner: MemoryCacheStorage,
    broken: String,
}

impl FailingDeletes {
    pub(crate) fn new(inner: MemoryCacheStorage, broken: &str) -> Self {
        Self { inner, broken: broken.to_string() }
    }
}

#[async_trait]
impl CacheStorage for FailingDeletes {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if name == self.broken {
            return Err(Error::InvalidState(format!("store {name} is locked")));
        }
        self.inner.delete(name).await
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_request(name, request).await
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.inner.put(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        self.inner.put_all(name, entries).await
    }

    async fn requests(&self, name: &str) -> Result<Vec<String>, Error> {
        self.inner.requests(name).await
    }
}

/// Storage whose writes never land: each put either fails or never returns.
pub(crate) struct BrokenPuts {
    inner: MemoryCacheStorage,
    hang: bool,
}

impl BrokenPuts {
    pub(crate) fn failing() -> Self {
        Self { inner: MemoryCacheStorage::new(), hang: false }
    }

    pub(crate) fn hanging() -> Self {
        Self { inner: MemoryCacheStorage::new(), hang: true }
    }

    async fn refuse(&self) -> Result<(), Error> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Err(Error::StoreRejected("quota exceeded".into()))
    }
}

#[async_trait]
impl CacheStorage for BrokenPuts {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete(name).await
    }

    async fn match_request(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_request(name, request).await
    }

    async fn put(&self, _name: &str, _request: &Request, _response: &Response) -> Result<(), Error> {
        self.refuse().await
    }

    async fn put_all(&self, _name: &str, _entries: &[(Request, Response)]) -> Result<(), Error> {
        self.refuse().await
    }

    async fn requests(&self, name: &str) -> Result<Vec<String>, Error> {
        self.inner.requests(name).await
    }
}
