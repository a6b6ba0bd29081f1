//! Request matchers for stub rules

use crate::error::{MockError, MockResult};
use mockline_http::Method;
use regex::Regex;
use std::fmt;

/// Matches the request URL, exactly as issued
#[derive(Clone)]
pub enum UrlMatcher {
    /// Byte-for-byte string equality
    Exact(String),
    /// Regular expression search anywhere in the URL
    Pattern(Regex),
}

impl UrlMatcher {
    /// Exact URL matcher
    pub fn exact(url: impl Into<String>) -> Self {
        Self::Exact(url.into())
    }

    /// Pattern matcher compiled from a regular expression
    pub fn pattern(pattern: &str) -> MockResult<Self> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| MockError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Whether `url` is matched
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == url,
            Self::Pattern(re) => re.is_match(url),
        }
    }

    /// Whether two matchers describe the same rule key.
    ///
    /// Patterns are compared by source text.
    pub fn same_as(&self, other: &UrlMatcher) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Debug for UrlMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(url) => f.debug_tuple("Exact").field(url).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
        }
    }
}

impl fmt::Display for UrlMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(url) => f.write_str(url),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for UrlMatcher {
    fn from(url: &str) -> Self {
        Self::exact(url)
    }
}

impl From<String> for UrlMatcher {
    fn from(url: String) -> Self {
        Self::Exact(url)
    }
}

impl From<Regex> for UrlMatcher {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

impl From<&UrlMatcher> for UrlMatcher {
    fn from(matcher: &UrlMatcher) -> Self {
        matcher.clone()
    }
}

/// Matches the request method, case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    /// Any method
    Any,
    /// One method
    Exact(Method),
}

impl MethodMatcher {
    /// Whether `method` is matched
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == method,
        }
    }
}

impl fmt::Display for MethodMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(method) => method.fmt(f),
        }
    }
}

impl From<&str> for MethodMatcher {
    fn from(method: &str) -> Self {
        Self::Exact(Method::new(method))
    }
}

impl From<String> for MethodMatcher {
    fn from(method: String) -> Self {
        Self::Exact(Method::new(method))
    }
}

impl From<Method> for MethodMatcher {
    fn from(method: Method) -> Self {
        Self::Exact(method)
    }
}

impl From<&Method> for MethodMatcher {
    fn from(method: &Method) -> Self {
        Self::Exact(method.clone())
    }
}
