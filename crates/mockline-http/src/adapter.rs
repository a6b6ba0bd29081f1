//! Transport hook trait

use crate::error::HttpResult;
use crate::request::RequestConfig;
use crate::response::Response;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Transport hook invoked by [`HttpClient`](crate::HttpClient) for every request.
///
/// Implementations perform (or simulate) the request and settle it with
/// [`settle`](crate::settle): a [`Response`] for accepted statuses, an
/// [`HttpError`](crate::HttpError) carrying the response otherwise.
#[async_trait]
pub trait Adapter: Send + Sync + Debug {
    /// Perform one request
    async fn dispatch(&self, config: RequestConfig) -> HttpResult<Response>;

    /// Short adapter identifier used in logs
    fn name(&self) -> &'static str;
}

/// Adapter shared between a client and whoever swapped it in
pub type SharedAdapter = Arc<dyn Adapter>;
