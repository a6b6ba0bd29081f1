//! HTTP client with a swappable adapter
//!
//! [`HttpClient`] is a cheap-clone handle: clones share defaults, adapter and
//! identity. Swapping the adapter on one clone affects every clone, which is
//! exactly what request interception relies on.

use crate::adapter::SharedAdapter;
use crate::error::HttpResult;
use crate::method::Method;
use crate::network::NetworkAdapter;
use crate::request::{default_validate_status, Headers, RequestConfig, StatusValidator};
use crate::response::Response;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

static GLOBAL_CLIENT: Lazy<HttpClient> = Lazy::new(HttpClient::new);

/// Identity of a client instance, shared by all its clones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Defaults merged into every request issued through a client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for relative request URLs
    pub base_url: Option<String>,
    /// Headers sent with every request; per-request headers win
    pub headers: Headers,
    /// Default timeout
    pub timeout: Option<Duration>,
    /// Default status validator
    pub validate_status: StatusValidator,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            headers: Headers::new(),
            timeout: None,
            validate_status: default_validate_status,
        }
    }
}

impl ClientConfig {
    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the default timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a default header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

struct ClientInner {
    id: ClientId,
    defaults: ClientConfig,
    adapter: RwLock<SharedAdapter>,
}

/// Async HTTP client
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("id", &self.inner.id)
            .field("defaults", &self.inner.defaults)
            .field("adapter", &self.inner.adapter.read().name())
            .finish()
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Create a client with default settings and the network adapter
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with the given defaults and the network adapter
    pub fn with_config(defaults: ClientConfig) -> Self {
        Self::with_adapter(defaults, Arc::new(NetworkAdapter::new()))
    }

    /// Create a client with the given defaults and adapter
    pub fn with_adapter(defaults: ClientConfig, adapter: SharedAdapter) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                id: ClientId::next(),
                defaults,
                adapter: RwLock::new(adapter),
            }),
        }
    }

    /// Process-wide default client
    pub fn global() -> &'static HttpClient {
        &GLOBAL_CLIENT
    }

    /// Identity of this client
    pub fn id(&self) -> ClientId {
        self.inner.id
    }

    /// Whether both handles refer to the same client instance
    pub fn same_instance(&self, other: &HttpClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Request defaults
    pub fn defaults(&self) -> &ClientConfig {
        &self.inner.defaults
    }

    /// Currently installed adapter
    pub fn adapter(&self) -> SharedAdapter {
        Arc::clone(&self.inner.adapter.read())
    }

    /// Replace the adapter, returning the previous one
    pub fn swap_adapter(&self, adapter: SharedAdapter) -> SharedAdapter {
        let mut slot = self.inner.adapter.write();
        debug!(client = %self.inner.id, from = slot.name(), to = adapter.name(), "swapping adapter");
        std::mem::replace(&mut *slot, adapter)
    }

    /// Replace the adapter
    pub fn set_adapter(&self, adapter: SharedAdapter) {
        self.swap_adapter(adapter);
    }

    /// Issue a request through the installed adapter
    pub async fn request(&self, config: RequestConfig) -> HttpResult<Response> {
        let config = self.merge_defaults(config);
        // Clone the adapter out so the lock is not held across the await
        let adapter = self.adapter();
        debug!(
            client = %self.inner.id,
            adapter = adapter.name(),
            method = %config.method,
            url = %config.url,
            "request"
        );
        adapter.dispatch(config).await
    }

    /// `GET` request
    pub async fn get(&self, url: impl Into<String>) -> HttpResult<Response> {
        self.request(RequestConfig::new(Method::GET, url)).await
    }

    /// `DELETE` request
    pub async fn delete(&self, url: impl Into<String>) -> HttpResult<Response> {
        self.request(RequestConfig::new(Method::DELETE, url)).await
    }

    /// `HEAD` request
    pub async fn head(&self, url: impl Into<String>) -> HttpResult<Response> {
        self.request(RequestConfig::new(Method::HEAD, url)).await
    }

    /// `OPTIONS` request
    pub async fn options(&self, url: impl Into<String>) -> HttpResult<Response> {
        self.request(RequestConfig::new(Method::OPTIONS, url)).await
    }

    /// `POST` request with a JSON body
    pub async fn post(&self, url: impl Into<String>, data: Value) -> HttpResult<Response> {
        self.request(RequestConfig::new(Method::POST, url).with_data(data))
            .await
    }

    /// `PUT` request with a JSON body
    pub async fn put(&self, url: impl Into<String>, data: Value) -> HttpResult<Response> {
        self.request(RequestConfig::new(Method::PUT, url).with_data(data))
            .await
    }

    /// `PATCH` request with a JSON body
    pub async fn patch(&self, url: impl Into<String>, data: Value) -> HttpResult<Response> {
        self.request(RequestConfig::new(Method::PATCH, url).with_data(data))
            .await
    }

    fn merge_defaults(&self, mut config: RequestConfig) -> RequestConfig {
        let defaults = &self.inner.defaults;
        if config.base_url.is_none() {
            config.base_url.clone_from(&defaults.base_url);
        }
        if config.timeout.is_none() {
            config.timeout = defaults.timeout;
        }
        for (name, value) in &defaults.headers {
            config
                .headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        if config.validate_status.is_none() {
            config.validate_status = Some(defaults.validate_status);
        }
        config
    }
}
