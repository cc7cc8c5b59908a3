//! Request/response values and the single-attempt executor

use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{BoxError, RegistryError};

/// Everything needed to perform one HTTP attempt; reused verbatim on retries
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A fully read response of one attempt
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RegistryError> {
        serde_json::from_str(&self.body).map_err(|e| {
            warn!("Failed to parse registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })
    }

    /// Human-readable reason for a failed response.
    ///
    /// Prefers the first entry of a JSON `errors` array, then a JSON
    /// `message`, then the raw body, then the status reason phrase.
    pub fn error_message(&self) -> String {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&self.body) {
            let first_error = parsed.errors.into_iter().next().map(|e| match e {
                ErrorEntry::Detailed { message } => message,
                ErrorEntry::Text(text) => text,
            });
            if let Some(message) = first_error.or(parsed.message).filter(|m| !m.is_empty()) {
                return message;
            }
        }

        let body = self.body.trim();
        if !body.is_empty() {
            return body.to_string();
        }
        self.status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorEntry {
    Detailed { message: String },
    Text(String),
}

/// Performs exactly one HTTP attempt, without retries or rate limiting.
///
/// Network-level failures (connect, DNS, timeout, body read) are returned as
/// `Err`; any received status, including errors, is `Ok`.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait HttpAttempt: Send + Sync {
    async fn attempt(&self, request: &RequestDescriptor) -> Result<HttpResponse, BoxError>;
}

/// [`HttpAttempt`] backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestAttempt {
    client: reqwest::Client,
}

impl ReqwestAttempt {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn build(user_agent: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self::new(client))
    }
}

#[async_trait::async_trait]
impl HttpAttempt for ReqwestAttempt {
    async fn attempt(&self, request: &RequestDescriptor) -> Result<HttpResponse, BoxError> {
        let response = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
