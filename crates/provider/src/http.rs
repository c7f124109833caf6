//! HTTP transport backed by reqwest, with a session cookie jar.

use crate::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use gerbang_core::error::{GerbangError, GerbangResult};
use gerbang_core::HttpMethod;
use reqwest::cookie::Jar;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// `name=value` cookies to seed the jar with, e.g. an existing session.
    pub cookies: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("gerbang/", env!("CARGO_PKG_VERSION")).to_string(),
            cookies: Vec::new(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }
}

/// Sends requests through one `reqwest::Client` whose cookie jar plays the
/// role of the browser session: cookies set by the gateway (session, CSRF
/// secret) are replayed on every following request.
///
/// ```ignore
/// let transport = HttpTransport::new(&TransportConfig::default(), base.as_url())?;
/// ```
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// `origin` scopes the seeded cookies.
    pub fn new(config: &TransportConfig, origin: &Url) -> GerbangResult<Self> {
        let jar = Arc::new(Jar::default());
        for cookie in &config.cookies {
            jar.add_cookie_str(cookie, origin);
        }

        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GerbangError::Config(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(
            timeout_ms = config.timeout.as_millis() as u64,
            seeded_cookies = config.cookies.len(),
            "http transport ready"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        tracing::trace!(%method, %url, "sending");

        let mut builder = self.client.request(reqwest_method(method), url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.user_agent.starts_with("gerbang/"));
        assert!(config.cookies.is_empty());
    }

    #[tokio::test]
    async fn builds_with_seeded_cookie() {
        let origin: Url = "http://localhost:9000".parse().unwrap();
        let config = TransportConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_cookie("session_id=abc");
        assert!(HttpTransport::new(&config, &origin).is_ok());
    }

    #[test]
    fn verbs_map_one_to_one() {
        assert_eq!(reqwest_method(HttpMethod::Get), reqwest::Method::GET);
        assert_eq!(reqwest_method(HttpMethod::Delete), reqwest::Method::DELETE);
    }
}
