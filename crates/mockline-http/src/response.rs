//! Responses and settlement

use crate::error::HttpError;
use crate::request::{Headers, RequestConfig};
use serde_json::Value;

/// A received response
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Status text
    pub status_text: String,
    /// Decoded body
    pub data: Value,
    /// Response headers
    pub headers: Headers,
    /// Config of the request that produced this response
    pub config: RequestConfig,
    /// Transport-assigned request identifier, if any
    pub request_id: Option<u64>,
}

/// Resolve or reject a response according to its request's status validator.
///
/// This is the single place where a status code turns into success or
/// failure; adapters call it instead of deciding themselves.
pub fn settle(response: Response) -> Result<Response, HttpError> {
    if response.config.accepts(response.status) {
        Ok(response)
    } else {
        Err(HttpError::from_response(response))
    }
}

/// Canonical reason phrase for common status codes
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}
