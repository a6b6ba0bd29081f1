//! Install/uninstall controller
//!
//! [`MockTransport`] owns one stub registry, one request ledger and one
//! scheduler. Installing it on a client swaps the client's adapter for a
//! [`MockAdapter`] bound to those and opens a session; uninstalling puts the
//! captured adapter back and empties both stores.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mockline::{MockTransport, ResponseDescriptor};
//! use mockline_http::HttpClient;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let mock = MockTransport::new();
//! mock.install_on(&client)?;
//!
//! mock.stub_request("GET", "/users/1", ResponseDescriptor::new(200).with_body(json!({ "id": 1 })));
//! let response = client.get("/users/1").await?;
//! assert_eq!(response.data["id"], 1);
//!
//! mock.uninstall();
//! # Ok(())
//! # }
//! ```

use crate::config::MockConfig;
use crate::dispatch::MockAdapter;
use crate::error::{MockError, MockResult};
use crate::ledger::RequestLedger;
use crate::matcher::{MethodMatcher, UrlMatcher};
use crate::registry::{StubHit, StubLifetime, StubRegistry, StubRule};
use crate::reply::Reply;
use crate::scheduler::{NoCallback, Scheduler, Timer};
use mockline_http::{ClientId, HttpClient, SharedAdapter};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Clients currently intercepted by any transport in this process
static INTERCEPTED: Lazy<Mutex<HashSet<ClientId>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// An active interception on one client
#[derive(Debug)]
struct Session {
    client: HttpClient,
    previous: SharedAdapter,
    adapter: SharedAdapter,
}

/// Mock transport for intercepting an [`HttpClient`] in tests
#[derive(Debug)]
pub struct MockTransport {
    ledger: RequestLedger,
    registry: StubRegistry,
    scheduler: Scheduler,
    session: Mutex<Option<Session>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Mock transport with the default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Mock transport with the given configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            ledger: RequestLedger::new(),
            registry: StubRegistry::new(),
            scheduler: Scheduler::new(config.delay()),
            session: Mutex::new(None),
        }
    }

    /// Mock transport configured from the environment
    pub fn from_env() -> MockResult<Self> {
        Ok(Self::with_config(MockConfig::from_env()?))
    }

    // =========================================================================
    // Install / uninstall
    // =========================================================================

    /// Intercept the process-wide default client
    pub fn install(&self) -> MockResult<()> {
        self.install_on(HttpClient::global())
    }

    /// Intercept `client` and every clone of it.
    ///
    /// Starts a session with an empty ledger and registry. Fails with
    /// [`MockError::AlreadyInstalled`] while this transport has a session, or
    /// while any transport intercepts `client`; the active session is left
    /// untouched.
    pub fn install_on(&self, client: &HttpClient) -> MockResult<()> {
        let mut session = self.session.lock();
        if let Some(active) = session.as_ref() {
            return Err(MockError::AlreadyInstalled {
                client: active.client.id(),
            });
        }
        if !INTERCEPTED.lock().insert(client.id()) {
            return Err(MockError::AlreadyInstalled { client: client.id() });
        }

        self.ledger.reset();
        self.registry.reset();
        let adapter: SharedAdapter = Arc::new(MockAdapter::new(
            self.ledger.clone(),
            self.registry.clone(),
            self.scheduler.clone(),
        ));
        let previous = client.swap_adapter(Arc::clone(&adapter));
        info!(client = %client.id(), previous = previous.name(), "mock transport installed");

        *session = Some(Session {
            client: client.clone(),
            previous,
            adapter,
        });
        Ok(())
    }

    /// Restore the captured adapter and empty the ledger and registry.
    ///
    /// Does nothing when not installed. Request futures already handed out
    /// are left as they are.
    pub fn uninstall(&self) {
        let Some(session) = self.session.lock().take() else {
            debug!("uninstall without an active session");
            return;
        };

        let Session {
            client,
            previous,
            adapter,
        } = session;
        let current = client.swap_adapter(previous);
        if !Arc::ptr_eq(&current, &adapter) {
            // Someone else replaced the hook mid-session; theirs stays.
            let original = client.swap_adapter(Arc::clone(&current));
            warn!(
                client = %client.id(),
                replaced_by = current.name(),
                original = original.name(),
                "adapter was swapped during the session, not restoring"
            );
        }
        INTERCEPTED.lock().remove(&client.id());
        self.ledger.reset();
        self.registry.reset();
        info!(client = %client.id(), "mock transport uninstalled");
    }

    /// Whether a session is active
    pub fn is_installed(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Client the active session intercepts
    pub fn installed_client(&self) -> Option<HttpClient> {
        self.session.lock().as_ref().map(|s| s.client.clone())
    }

    /// Run `f` with the global client intercepted, see [`with_mock_on`](Self::with_mock_on)
    pub async fn with_mock<F, Fut, T>(&self, f: F) -> MockResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.with_mock_on(HttpClient::global(), f).await
    }

    /// Run `f` with `client` intercepted for its whole asynchronous tail.
    ///
    /// Installs, awaits the future `f` returns, waits one default delay so
    /// settlements issued inside can propagate, then uninstalls. The adapter
    /// is restored even if `f` panics or the returned future is dropped.
    pub async fn with_mock_on<F, Fut, T>(&self, client: &HttpClient, f: F) -> MockResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.install_on(client)?;
        let _guard = UninstallGuard(self);
        let output = f().await;
        self.scheduler.wait().await;
        Ok(output)
    }

    // =========================================================================
    // Stubs
    // =========================================================================

    /// Answer every matching request with `reply` until removed or replaced
    pub fn stub_request(
        &self,
        method: impl Into<MethodMatcher>,
        url: impl Into<UrlMatcher>,
        reply: impl Into<Reply>,
    ) -> StubRule {
        self.registry
            .register(method, url, reply, StubLifetime::Persistent)
    }

    /// Answer requests with any method
    pub fn stub_any(&self, url: impl Into<UrlMatcher>, reply: impl Into<Reply>) -> StubRule {
        self.registry
            .register(MethodMatcher::Any, url, reply, StubLifetime::Persistent)
    }

    /// Answer the next matching request only
    pub fn stub_once(
        &self,
        method: impl Into<MethodMatcher>,
        url: impl Into<UrlMatcher>,
        reply: impl Into<Reply>,
    ) -> StubHit {
        self.registry.register_once(method, url, reply)
    }

    /// Time out every request to `url`, whatever the method
    pub fn stub_timeout(&self, url: impl Into<UrlMatcher>) -> StubRule {
        self.registry.register(
            MethodMatcher::Any,
            url,
            Reply::Timeout,
            StubLifetime::Persistent,
        )
    }

    /// Stub registry of this transport
    pub fn stubs(&self) -> StubRegistry {
        self.registry.clone()
    }

    /// Request ledger of this transport
    pub fn requests(&self) -> RequestLedger {
        self.ledger.clone()
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Default scheduler delay
    pub fn delay(&self) -> Duration {
        self.scheduler.delay()
    }

    /// Change the default scheduler delay
    pub fn set_delay(&self, delay: Duration) {
        self.scheduler.set_delay(delay);
    }

    /// Scheduler shared with the installed adapter
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Yield for the default delay
    pub fn wait(&self) -> Timer<NoCallback> {
        self.scheduler.wait()
    }

    /// Yield for `delay`
    pub fn wait_for(&self, delay: Duration) -> Timer<NoCallback> {
        self.scheduler.wait_for(delay)
    }

    /// Yield for the default delay, then run `callback`
    pub fn wait_then<F, T>(&self, callback: F) -> Timer<F>
    where
        F: FnOnce() -> T,
    {
        self.scheduler.wait_then(callback)
    }

    /// Yield for `delay`, then run `callback`
    pub fn wait_for_then<F, T>(&self, delay: Duration, callback: F) -> Timer<F>
    where
        F: FnOnce() -> T,
    {
        self.scheduler.wait_for_then(delay, callback)
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.uninstall();
    }
}

struct UninstallGuard<'a>(&'a MockTransport);

impl Drop for UninstallGuard<'_> {
    fn drop(&mut self) {
        self.0.uninstall();
    }
}
