//! The network seam of the fetcher.

use crate::signature::RequestSignature;
use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_ENCODING, CONTENT_TYPE, RETRY_AFTER,
};
use std::time::Duration;
use thiserror::Error;

/// A response as seen by the fetcher, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    pub content_encoding: Option<String>,
    /// Server-requested wait before the next attempt.
    pub retry_after: Option<Duration>,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_encoding: None,
            retry_after: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response arrived: connection, timeout or body read failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error for {url}: {message}")]
pub struct TransportError {
    pub url: String,
    pub message: String,
}

impl TransportError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Issues one GET per call. Retrying and throttling belong to the caller.
pub trait Transport: Send + Sync {
    fn send(&self, signature: &RequestSignature) -> Result<RawResponse, TransportError>;
}

/// Blocking HTTP transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, signature: &RequestSignature) -> Result<RawResponse, TransportError> {
        let url = signature.as_str();
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportError::new(url, e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers();
        let content_encoding = header_str(headers, CONTENT_ENCODING.as_str())
            .or_else(|| charset_from_content_type(headers));
        let retry_after = header_str(headers, RETRY_AFTER.as_str())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response
            .text()
            .map_err(|e| TransportError::new(url, format!("failed to read body: {}", e)))?;

        Ok(RawResponse {
            status,
            body,
            content_encoding,
            retry_after,
        })
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn charset_from_content_type(headers: &HeaderMap) -> Option<String> {
    let content_type = header_str(headers, CONTENT_TYPE.as_str())?;
    content_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .map(|charset| charset.trim_matches('"').to_ascii_lowercase())
        .next()
}
