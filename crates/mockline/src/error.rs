//! Mock transport errors
//!
//! Usage errors of the mock itself. Simulated network failures are never
//! reported here; they travel through [`mockline_http::HttpError`] like real
//! ones do.

use mockline_http::{ClientId, Method};
use thiserror::Error;

/// Errors from misusing the mock transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    /// A session is already active on this transport
    #[error("mock transport is already installed on {client}")]
    AlreadyInstalled {
        /// Client the active session is installed on
        client: ClientId,
    },

    /// A tracked request was settled a second time
    #[error("request #{sequence} ({method} {url}) has already been settled")]
    AlreadySettled {
        /// Ledger position of the request
        sequence: usize,
        /// Request method
        method: Method,
        /// Request URL
        url: String,
    },

    /// A URL pattern failed to compile
    #[error("invalid url pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// Configuration could not be loaded or is out of range
    #[error("invalid mock configuration: {reason}")]
    Config {
        /// What is wrong
        reason: String,
    },
}

impl MockError {
    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

/// Result alias for mock operations
pub type MockResult<T> = Result<T, MockError>;
