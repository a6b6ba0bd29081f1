//! Fabricated responses and errors

use crate::ledger::TrackedRequest;
use mockline_http::{reason_phrase, HttpError, Headers, RequestConfig, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Response to deliver for a request.
///
/// `response` is the body payload; it becomes [`Response::data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDescriptor {
    /// Status code
    pub status: u16,
    /// Status text, the canonical reason phrase when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    /// Response headers
    #[serde(default)]
    pub headers: Headers,
    /// Body payload
    #[serde(default)]
    pub response: Value,
}

impl ResponseDescriptor {
    /// Descriptor with the given status and an empty body
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: None,
            headers: Headers::new(),
            response: Value::Null,
        }
    }

    /// Set the body payload
    pub fn with_body(mut self, response: Value) -> Self {
        self.response = response;
        self
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the status text
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = Some(status_text.into());
        self
    }

    /// Build the client-facing response for a request
    pub(crate) fn into_response(self, config: RequestConfig, request_id: u64) -> Response {
        Response {
            status: self.status,
            status_text: self
                .status_text
                .unwrap_or_else(|| reason_phrase(self.status).to_string()),
            data: self.response,
            headers: self.headers,
            config,
            request_id: Some(request_id),
        }
    }
}

/// Error to reject a request with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    /// Error code, e.g. `ECONNREFUSED`
    pub code: String,
    /// Error message
    pub message: String,
}

impl ErrorDescriptor {
    /// Create an error descriptor
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub(crate) fn into_http_error(self, config: RequestConfig, request_id: u64) -> HttpError {
        HttpError::custom(self.code, self.message, config).with_request_id(request_id)
    }
}

/// Function producing a response from the intercepted request
pub type ReplyFn = Arc<dyn Fn(&TrackedRequest) -> ResponseDescriptor + Send + Sync>;

/// What a stub answers with
#[derive(Clone)]
pub enum Reply {
    /// A fixed response
    Static(ResponseDescriptor),
    /// A response computed from the request
    Generator(ReplyFn),
    /// A timeout after the scheduler delay
    Timeout,
    /// An immediate error
    Error(ErrorDescriptor),
}

impl Reply {
    /// Reply computed from the request
    pub fn generator<F>(f: F) -> Self
    where
        F: Fn(&TrackedRequest) -> ResponseDescriptor + Send + Sync + 'static,
    {
        Self::Generator(Arc::new(f))
    }

    /// Whether this reply simulates a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(descriptor) => f.debug_tuple("Static").field(descriptor).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
            Self::Timeout => f.write_str("Timeout"),
            Self::Error(descriptor) => f.debug_tuple("Error").field(descriptor).finish(),
        }
    }
}

impl From<ResponseDescriptor> for Reply {
    fn from(descriptor: ResponseDescriptor) -> Self {
        Self::Static(descriptor)
    }
}

impl From<ErrorDescriptor> for Reply {
    fn from(descriptor: ErrorDescriptor) -> Self {
        Self::Error(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_fills_status_text() {
        let response = ResponseDescriptor::new(404).into_response(RequestConfig::new("get", "/x"), 3);
        assert_eq!(response.status_text, "Not Found");
        assert_eq!(response.request_id, Some(3));
        assert_eq!(response.data, Value::Null);

        let response = ResponseDescriptor::new(299)
            .with_status_text("Odd")
            .into_response(RequestConfig::new("get", "/x"), 0);
        assert_eq!(response.status_text, "Odd");
    }

    #[test]
    fn test_descriptor_deserializes_with_defaults() {
        let descriptor: ResponseDescriptor =
            serde_json::from_value(json!({ "status": 200, "response": { "id": 1 } })).unwrap();
        assert_eq!(descriptor, ResponseDescriptor::new(200).with_body(json!({ "id": 1 })));
    }

    #[test]
    fn test_error_descriptor_keeps_code() {
        let err = ErrorDescriptor::new("ECONNREFUSED", "connection refused")
            .into_http_error(RequestConfig::new("get", "/x"), 9);
        assert_eq!(err.code.as_str(), "ECONNREFUSED");
        assert_eq!(err.message, "connection refused");
        assert_eq!(err.request_id, Some(9));
        assert!(err.response.is_none());
    }
}
