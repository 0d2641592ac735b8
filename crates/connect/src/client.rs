//! Outbound HTTP client used by adapters in live mode.
//!
//! Adapters only see the [`PlatformHttpClient`] trait, so tests can swap in
//! a client that fails on demand.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

use unibridge_core::errors::{Error, Result};

#[async_trait]
pub trait PlatformHttpClient: Send + Sync {
    /// GET `path` relative to the platform base URL.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value>;

    /// POST a JSON body to `path` relative to the platform base URL.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// API Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
    error: Option<String>,
}

/// reqwest-backed client bound to one platform.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    client: reqwest::Client,
    platform: &'static str,
    base_url: String,
    auth_header: Option<HeaderValue>,
}

impl HttpPlatformClient {
    /// Create a client for `platform`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bearer token is not a valid header value or
    /// the HTTP client cannot be initialized.
    pub fn new(
        platform: &'static str,
        base_url: &str,
        bearer_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let auth_header = bearer_token
            .map(|token| {
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| Error::Unexpected(format!("Invalid access token format: {}", e)))
            })
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to initialize HTTP client: {}", e)))?;

        Ok(Self {
            client,
            platform,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(auth) = &self.auth_header {
            headers.insert(AUTHORIZATION, auth.clone());
        }
        headers
    }

    fn request_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                platform: self.platform.to_string(),
            }
        } else {
            Error::external(self.platform, format!("Request failed: {}", err))
        }
    }

    /// Parse an HTTP response, mapping failures onto the bridge taxonomy.
    async fn parse_response(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(e))?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                platform: self.platform.to_string(),
            });
        }
        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                let msg = err
                    .message
                    .or(err.error)
                    .unwrap_or_else(|| format!("HTTP {}", status));
                return Err(Error::external(self.platform, msg));
            }
            return Err(Error::external(
                self.platform,
                format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            ));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            Error::external(self.platform, format!("Failed to parse response: {}", e))
        })
    }
}

#[async_trait]
impl PlatformHttpClient for HttpPlatformClient {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[{}] GET {}", self.platform, url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .query(query)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        self.parse_response(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[{}] POST {}", self.platform, url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        self.parse_response(response).await
    }
}
