//! Request configuration handed to adapters

use crate::method::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Request and response headers
pub type Headers = BTreeMap<String, String>;

/// Decides whether a status code resolves or rejects the request
pub type StatusValidator = fn(u16) -> bool;

/// Default status validator: everything below 400 is a success
pub fn default_validate_status(status: u16) -> bool {
    status < 400
}

/// Everything an adapter needs to perform one request.
///
/// `url` is kept exactly as the caller issued it. Adapters that perform real
/// I/O join it with `base_url` through [`RequestConfig::full_url`]; mocks
/// match against `url` alone.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Request method
    pub method: Method,
    /// Request URL as issued
    pub url: String,
    /// Optional base URL prepended for real I/O
    pub base_url: Option<String>,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub data: Option<Value>,
    /// Request timeout, `None` means no timeout
    pub timeout: Option<Duration>,
    /// Status validator applied when settling the response, `None` uses the
    /// client default
    pub validate_status: Option<StatusValidator>,
}

impl RequestConfig {
    /// Create a request config for the given method and URL
    pub fn new(method: impl Into<Method>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            base_url: None,
            headers: Headers::new(),
            data: None,
            timeout: None,
            validate_status: None,
        }
    }

    /// Attach a request body
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the status validator
    pub fn with_validate_status(mut self, validate_status: StatusValidator) -> Self {
        self.validate_status = Some(validate_status);
        self
    }

    /// Whether `status` resolves this request
    pub fn accepts(&self, status: u16) -> bool {
        self.validate_status.unwrap_or(default_validate_status)(status)
    }

    /// URL with the base URL applied, unless `url` is already absolute
    pub fn full_url(&self) -> String {
        match &self.base_url {
            Some(base) if !is_absolute(&self.url) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                self.url.trim_start_matches('/')
            ),
            _ => self.url.clone(),
        }
    }

    /// Timeout in whole milliseconds, `0` when unset
    pub fn timeout_millis(&self) -> u128 {
        self.timeout.map_or(0, |t| t.as_millis())
    }
}

fn is_absolute(url: &str) -> bool {
    url.split_once("://")
        .is_some_and(|(scheme, _)| !scheme.is_empty() && scheme.chars().all(char::is_alphanumeric))
}
