//! Request ledger
//!
//! Every request the mock adapter intercepts is recorded here, in the order
//! the client invoked the adapter. Each entry is a [`TrackedRequest`]: a
//! shared handle that also owns the one-shot channel feeding the client's
//! pending request future, so test code can settle it by hand.

use crate::error::{MockError, MockResult};
use crate::reply::{ErrorDescriptor, ResponseDescriptor};
use crate::scheduler::Scheduler;
use chrono::{DateTime, Utc};
use mockline_http::{settle, Headers, HttpError, HttpResult, Method, RequestConfig, Response};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Log target for ledger dumps
pub const DEBUG_TARGET: &str = "mockline::requests";

pub(crate) type Settlement = HttpResult<Response>;
type Settler = oneshot::Sender<Settlement>;

// =============================================================================
// Tracked Request
// =============================================================================

struct TrackedInner {
    sequence: usize,
    config: RequestConfig,
    timestamp: DateTime<Utc>,
    settler: Mutex<Option<Settler>>,
    scheduler: Scheduler,
}

/// One intercepted request.
///
/// Cloning yields another handle to the same request. The request can be
/// settled at most once, either automatically by a stub or through one of the
/// `respond_*` methods; a second attempt fails with
/// [`MockError::AlreadySettled`].
#[derive(Clone)]
pub struct TrackedRequest {
    inner: Arc<TrackedInner>,
}

impl TrackedRequest {
    fn new(sequence: usize, config: RequestConfig, scheduler: Scheduler) -> (Self, oneshot::Receiver<Settlement>) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            inner: Arc::new(TrackedInner {
                sequence,
                config,
                timestamp: Utc::now(),
                settler: Mutex::new(Some(tx)),
                scheduler,
            }),
        };
        (request, rx)
    }

    /// Position in the ledger
    pub fn sequence(&self) -> usize {
        self.inner.sequence
    }

    /// Identifier stamped on responses and errors for this request
    pub fn request_id(&self) -> u64 {
        self.inner.sequence as u64
    }

    /// Request method, uppercase
    pub fn method(&self) -> &Method {
        &self.inner.config.method
    }

    /// Request URL as issued
    pub fn url(&self) -> &str {
        &self.inner.config.url
    }

    /// Request headers
    pub fn headers(&self) -> &Headers {
        &self.inner.config.headers
    }

    /// Request body
    pub fn data(&self) -> Option<&Value> {
        self.inner.config.data.as_ref()
    }

    /// Full request config
    pub fn config(&self) -> &RequestConfig {
        &self.inner.config
    }

    /// Wall-clock time of interception
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.inner.timestamp
    }

    /// Whether the request has been settled
    pub fn is_settled(&self) -> bool {
        self.inner.settler.lock().is_none()
    }

    /// Whether both handles refer to the same request
    pub fn same_request(&self, other: &TrackedRequest) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolve the request with `descriptor`.
    ///
    /// Statuses the request's validator rejects settle the client future with
    /// an error carrying the response. Completes one scheduler delay later so
    /// the client side has observed the settlement; returns the response that
    /// was delivered.
    pub async fn respond_with(&self, descriptor: ResponseDescriptor) -> MockResult<Response> {
        let settler = self.take_settler()?;
        let response = descriptor.into_response(self.inner.config.clone(), self.request_id());
        debug!(
            sequence = self.inner.sequence,
            status = response.status,
            "responding to tracked request"
        );
        self.deliver(settler, settle(response.clone()));
        self.inner.scheduler.wait().await;
        Ok(response)
    }

    /// Reject the request with a timeout once the scheduler delay elapses.
    ///
    /// The request counts as settled immediately. The rejection is delivered
    /// by a spawned task, so it still fires if the returned future is dropped
    /// early. Returns the delivered error.
    pub async fn respond_with_timeout(&self) -> MockResult<HttpError> {
        let settler = self.take_settler()?;
        let error = HttpError::timeout(self.inner.config.clone()).with_request_id(self.request_id());
        debug!(sequence = self.inner.sequence, "timing out tracked request");

        let timer = self.inner.scheduler.wait();
        let request = self.clone();
        let delivered = error.clone();
        let delivery = tokio::spawn(async move {
            timer.await;
            request.deliver(settler, Err(delivered));
        });
        if let Err(e) = delivery.await {
            warn!(sequence = self.inner.sequence, error = %e, "timeout delivery task failed");
        }
        Ok(error)
    }

    /// Reject the request with an arbitrary error, without delay
    pub fn respond_with_error(&self, descriptor: ErrorDescriptor) -> MockResult<HttpError> {
        let settler = self.take_settler()?;
        let error = descriptor.into_http_error(self.inner.config.clone(), self.request_id());
        debug!(sequence = self.inner.sequence, code = %error.code, "failing tracked request");
        self.deliver(settler, Err(error.clone()));
        Ok(error)
    }

    pub(crate) fn settle_now(&self, settlement: Settlement) -> MockResult<()> {
        let settler = self.take_settler()?;
        self.deliver(settler, settlement);
        Ok(())
    }

    pub(crate) fn take_settler(&self) -> MockResult<Settler> {
        self.inner
            .settler
            .lock()
            .take()
            .ok_or_else(|| MockError::AlreadySettled {
                sequence: self.inner.sequence,
                method: self.inner.config.method.clone(),
                url: self.inner.config.url.clone(),
            })
    }

    pub(crate) fn deliver(&self, settler: Settler, settlement: Settlement) {
        if settler.send(settlement).is_err() {
            debug!(
                sequence = self.inner.sequence,
                "request future dropped before settlement"
            );
        }
    }

    /// `mm:ss.mmm METHOD url`
    pub fn debug_line(&self) -> String {
        format!(
            "{} {} {}",
            self.inner.timestamp.format("%M:%S%.3f"),
            self.inner.config.method,
            self.inner.config.url
        )
    }
}

impl fmt::Debug for TrackedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedRequest")
            .field("sequence", &self.inner.sequence)
            .field("method", &self.inner.config.method)
            .field("url", &self.inner.config.url)
            .field("timestamp", &self.inner.timestamp)
            .field("settled", &self.is_settled())
            .finish()
    }
}

// =============================================================================
// Request Ledger
// =============================================================================

/// Ordered record of intercepted requests.
///
/// Cloning yields another handle to the same ledger.
#[derive(Debug, Clone, Default)]
pub struct RequestLedger {
    entries: Arc<RwLock<Vec<TrackedRequest>>>,
}

impl RequestLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request; its sequence is the ledger length at insertion
    pub(crate) fn track(
        &self,
        config: RequestConfig,
        scheduler: Scheduler,
    ) -> (TrackedRequest, oneshot::Receiver<Settlement>) {
        let mut entries = self.entries.write();
        let (request, rx) = TrackedRequest::new(entries.len(), config, scheduler);
        entries.push(request.clone());
        (request, rx)
    }

    /// Number of recorded requests
    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// First recorded request
    pub fn first(&self) -> Option<TrackedRequest> {
        self.entries.read().first().cloned()
    }

    /// Last recorded request
    pub fn most_recent(&self) -> Option<TrackedRequest> {
        self.entries.read().last().cloned()
    }

    /// Request at `index`
    pub fn at(&self, index: usize) -> Option<TrackedRequest> {
        self.entries.read().get(index).cloned()
    }

    /// First request with this method and URL
    pub fn get(&self, method: impl Into<Method>, url: &str) -> Option<TrackedRequest> {
        let method = method.into();
        self.entries
            .read()
            .iter()
            .find(|r| *r.method() == method && r.url() == url)
            .cloned()
    }

    /// All requests with this method, in ledger order
    pub fn with_method(&self, method: impl Into<Method>) -> Vec<TrackedRequest> {
        let method = method.into();
        self.entries
            .read()
            .iter()
            .filter(|r| *r.method() == method)
            .cloned()
            .collect()
    }

    /// Snapshot of every recorded request
    pub fn entries(&self) -> Vec<TrackedRequest> {
        self.entries.read().clone()
    }

    /// Forget every recorded request.
    ///
    /// Futures already handed to the client are not voided; handles held by
    /// test code can still settle them.
    pub fn reset(&self) {
        self.entries.write().clear();
    }

    /// One `mm:ss.mmm METHOD url` line per request, also logged at info level
    pub fn debug(&self) -> Vec<String> {
        let lines: Vec<String> = self
            .entries
            .read()
            .iter()
            .map(TrackedRequest::debug_line)
            .collect();
        for line in &lines {
            info!(target: DEBUG_TARGET, "{line}");
        }
        lines
    }
}
