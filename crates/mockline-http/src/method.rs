//! Request method

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP request method, always stored uppercase.
///
/// Methods are compared after normalization, so `"get"` and `"GET"` are the
/// same method. Arbitrary extension methods are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Method(String);

impl Method {
    /// `GET`
    pub const GET: &'static str = "GET";
    /// `POST`
    pub const POST: &'static str = "POST";
    /// `PUT`
    pub const PUT: &'static str = "PUT";
    /// `PATCH`
    pub const PATCH: &'static str = "PATCH";
    /// `DELETE`
    pub const DELETE: &'static str = "DELETE";
    /// `HEAD`
    pub const HEAD: &'static str = "HEAD";
    /// `OPTIONS`
    pub const OPTIONS: &'static str = "OPTIONS";

    /// Create a method, normalizing it to uppercase
    pub fn new(method: impl AsRef<str>) -> Self {
        Self(method.as_ref().trim().to_ascii_uppercase())
    }

    /// Get the normalized method name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw method name
    pub fn is(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Method {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Method {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&Method> for Method {
    fn from(value: &Method) -> Self {
        value.clone()
    }
}

impl From<Method> for String {
    fn from(value: Method) -> Self {
        value.0
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
