//! Default adapter performing real I/O through `reqwest`

use crate::adapter::Adapter;
use crate::error::{HttpError, HttpResult};
use crate::request::{Headers, RequestConfig};
use crate::response::{settle, Response};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Adapter backed by a `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct NetworkAdapter {
    client: reqwest::Client,
}

impl NetworkAdapter {
    /// Create a network adapter with a fresh connection pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a network adapter around an existing `reqwest` client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Adapter for NetworkAdapter {
    async fn dispatch(&self, config: RequestConfig) -> HttpResult<Response> {
        let method = reqwest::Method::from_bytes(config.method.as_str().as_bytes())
            .map_err(|e| HttpError::custom("ERR_BAD_OPTION_VALUE", e.to_string(), config.clone()))?;
        let url = config.full_url();
        debug!(%method, %url, "dispatching over network");

        let mut builder = self.client.request(method, url.as_str());
        for (name, value) in &config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(data) = &config.data {
            builder = builder.json(data);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::timeout(config.clone())
            } else {
                HttpError::network(config.clone(), e.to_string())
            }
        })?;

        let status = response.status();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::network(config.clone(), e.to_string()))?;

        settle(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            data: decode_body(&body),
            headers,
            config,
            request_id: None,
        })
    }

    fn name(&self) -> &'static str {
        "network"
    }
}

/// JSON bodies decode to their value, anything else to a string
fn decode_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
