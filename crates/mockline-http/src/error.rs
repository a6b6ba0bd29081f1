//! HTTP client errors
//!
//! Every failure a request can end in, real or simulated, surfaces as an
//! [`HttpError`]. Callers tell failures apart by [`ErrorCode`] and by whether
//! a response is attached.

use crate::request::RequestConfig;
use crate::response::Response;
use std::fmt;
use thiserror::Error;

/// Machine-readable error code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Request timed out (`ECONNABORTED`)
    ConnectionAborted,
    /// Response rejected with a 4xx status (`ERR_BAD_REQUEST`)
    BadRequest,
    /// Response rejected with any other status (`ERR_BAD_RESPONSE`)
    BadResponse,
    /// Transport-level failure (`ERR_NETWORK`)
    Network,
    /// Any other code
    Other(String),
}

impl ErrorCode {
    /// Code string as seen by callers
    pub fn as_str(&self) -> &str {
        match self {
            Self::ConnectionAborted => "ECONNABORTED",
            Self::BadRequest => "ERR_BAD_REQUEST",
            Self::BadResponse => "ERR_BAD_RESPONSE",
            Self::Network => "ERR_NETWORK",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "ECONNABORTED" => Self::ConnectionAborted,
            "ERR_BAD_REQUEST" => Self::BadRequest,
            "ERR_BAD_RESPONSE" => Self::BadResponse,
            "ERR_NETWORK" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        Self::from(code.as_str())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
    /// Human-readable message
    pub message: String,
    /// Error code
    pub code: ErrorCode,
    /// Config of the request that failed
    pub config: Box<RequestConfig>,
    /// Transport-assigned request identifier, if any
    pub request_id: Option<u64>,
    /// Response that caused the rejection, if one was received
    pub response: Option<Box<Response>>,
}

/// Result alias for client operations
pub type HttpResult<T> = Result<T, HttpError>;

impl HttpError {
    /// Create an error with an arbitrary code
    pub fn custom(
        code: impl Into<ErrorCode>,
        message: impl Into<String>,
        config: RequestConfig,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            config: Box::new(config),
            request_id: None,
            response: None,
        }
    }

    /// Create a timeout error for the given request
    pub fn timeout(config: RequestConfig) -> Self {
        let message = format!("timeout of {}ms exceeded", config.timeout_millis());
        Self::custom(ErrorCode::ConnectionAborted, message, config)
    }

    /// Create a transport-level error
    pub fn network(config: RequestConfig, message: impl Into<String>) -> Self {
        Self::custom(ErrorCode::Network, message, config)
    }

    /// Wrap a response rejected by the status validator
    pub fn from_response(response: Response) -> Self {
        let code = if (400..500).contains(&response.status) {
            ErrorCode::BadRequest
        } else {
            ErrorCode::BadResponse
        };
        Self {
            message: format!("Request failed with status code {}", response.status),
            code,
            config: Box::new(response.config.clone()),
            request_id: response.request_id,
            response: Some(Box::new(response)),
        }
    }

    /// Attach a transport-assigned request identifier
    pub fn with_request_id(mut self, request_id: u64) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Whether this is a timeout
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::ConnectionAborted
    }

    /// Status of the attached response, if any
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}
