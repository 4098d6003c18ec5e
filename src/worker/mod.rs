//! Offline cache worker.
//!
//! The policy the generated `sw.js` runs in the browser, expressed natively
//! so it can be tested against an in-memory store and a fake network.
//!
//! ## Policies
//!
//! - [`CachePolicy::Versioned`] (default): only `GET` requests whose URL
//!   carries the version query parameter (`/css/style.css?v=3f2a9c1d`) are
//!   intercepted. A hit is served from the store without touching the
//!   network. A miss is fetched, and a successful response is stored under
//!   the request before being returned. Because the stylesheet hash changes
//!   whenever any stylesheet changes, a cached entry never goes stale; a new
//!   deploy simply asks for a new URL.
//! - [`CachePolicy::CacheFirst`]: every `GET` is answered from the store when
//!   possible, otherwise from the network without storing. Only install-time
//!   entries are ever served, and they are never refreshed.
//!
//! Requests the worker does not intercept come back as
//! [`FetchOutcome::Passthrough`]; the caller goes to the network itself.
//!
//! Entries are never evicted. Network failures are returned as they are: no
//! retry, no fallback.

pub mod script;
mod store;

pub use self::script::render_service_worker;
pub use self::store::MemoryStore;

use crate::config::{WorkerConfig, WorkerPolicy};
use thiserror::Error;
use url::form_urlencoded;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("install failed fetching {url}: {reason}")]
    Install { url: String, reason: String },
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("cannot encode worker config: {0}")]
    Script(#[from] serde_json::Error),
}

/// A failed network fetch.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("network error: {0}")]
pub struct NetworkError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Site-relative or absolute URL, including any query string.
    pub url: String,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey {
            method: self.method.to_ascii_uppercase(),
            url: self.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// A `200` response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Store key: request method plus the full URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

/// Where cached responses live. Implementations must be safe to share
/// between concurrently handled requests.
pub trait CacheStore: Send + Sync {
    fn lookup(&self, key: &CacheKey) -> Option<Response>;
    /// Insert or replace the entry for `key`.
    fn store(&self, key: CacheKey, response: Response);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait Network: Send + Sync {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePolicy {
    /// Unconditional cache-first, without storing on miss. Legacy.
    CacheFirst,
    /// Cache-first for URLs carrying the `param` query parameter, stored
    /// lazily on first fetch.
    Versioned { param: String },
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Versioned {
            param: "v".to_string(),
        }
    }
}

impl CachePolicy {
    pub fn from_config(config: &WorkerConfig) -> Self {
        match config.policy {
            WorkerPolicy::CacheFirst => CachePolicy::CacheFirst,
            WorkerPolicy::Versioned => CachePolicy::Versioned {
                param: config.version_param.clone(),
            },
        }
    }

    pub fn intercepts(&self, request: &Request) -> bool {
        if !request.method.eq_ignore_ascii_case("GET") {
            return false;
        }
        match self {
            CachePolicy::CacheFirst => true,
            CachePolicy::Versioned { param } => has_query_param(&request.url, param),
        }
    }

    fn stores_on_miss(&self) -> bool {
        matches!(self, CachePolicy::Versioned { .. })
    }
}

/// Whether `url`'s query string has a `name` key, with or without a value.
///
/// Keys are form-decoded first (`%76` is `v`, `+` is a space), the way the
/// browser's `URLSearchParams` reads them.
pub fn has_query_param(url: &str, name: &str) -> bool {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let Some((_, query)) = without_fragment.split_once('?') else {
        return false;
    };
    form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == name)
}

/// How a request was answered.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the caller goes to the network directly.
    Passthrough,
    /// Served from the store. No network call was made.
    Cached(Response),
    /// Fetched from the network (and stored, if the policy says so).
    Network(Response),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Cached(r) | FetchOutcome::Network(r) => Some(r),
        }
    }
}

pub struct ServiceWorker<S: CacheStore, N: Network> {
    policy: CachePolicy,
    precache: Vec<String>,
    store: S,
    network: N,
}

impl<S: CacheStore, N: Network> ServiceWorker<S, N> {
    pub fn new(policy: CachePolicy, precache: Vec<String>, store: S, network: N) -> Self {
        Self {
            policy,
            precache,
            store,
            network,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Fetch and store every precache URL. Stops at the first failure;
    /// entries stored before it stay in the store.
    pub fn install(&self) -> Result<usize, WorkerError> {
        for url in &self.precache {
            let request = Request::get(url.clone());
            let response = self
                .network
                .fetch(&request)
                .map_err(|e| WorkerError::Install {
                    url: url.clone(),
                    reason: e.0,
                })?;
            if !response.is_success() {
                return Err(WorkerError::Install {
                    url: url.clone(),
                    reason: format!("status {}", response.status),
                });
            }
            self.store.store(request.key(), response);
        }
        Ok(self.precache.len())
    }

    /// Answer one request according to the policy.
    pub fn fetch(&self, request: &Request) -> Result<FetchOutcome, WorkerError> {
        if !self.policy.intercepts(request) {
            return Ok(FetchOutcome::Passthrough);
        }
        let key = request.key();
        if let Some(cached) = self.store.lookup(&key) {
            return Ok(FetchOutcome::Cached(cached));
        }
        let response = self.network.fetch(request)?;
        if self.policy.stores_on_miss() && response.is_success() {
            self.store.store(key, response.clone());
        }
        Ok(FetchOutcome::Network(response))
    }
}
