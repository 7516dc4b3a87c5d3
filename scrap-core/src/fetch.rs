// Single upstream HTTP call. No retry, no caching.

use crate::error::{ScrapError, ScrapResult};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::time::Duration;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// POST with a JSON-encoded body.
    pub fn post_json<T: Serialize + ?Sized>(url: impl Into<String>, body: &T) -> ScrapResult<Self> {
        let url = url.into();
        let body = serde_json::to_vec(body)
            .map_err(|e| ScrapError::Internal(format!("failed to encode request body: {e}")))?;
        Ok(Self {
            method: HttpMethod::Post,
            url,
            body: Some(body),
            headers: Vec::new(),
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs the request and returns the raw response body of a 2xx response.
    async fn fetch(&self, request: &FetchRequest) -> ScrapResult<Bytes>;
}

/// `Fetcher` backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Option<Duration>) -> ScrapResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ScrapError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> ScrapResult<Bytes> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self
                .client
                .post(&request.url)
                .body(request.body.clone().unwrap_or_default()),
        };

        builder = builder.header(reqwest::header::CONTENT_TYPE, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            error!("request to {} failed: {}", request.url, e);
            ScrapError::Transport {
                url: request.url.clone(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!("reading body from {} failed: {}", request.url, e);
            ScrapError::Transport {
                url: request.url.clone(),
                message: format!("failed to read response body: {e}"),
            }
        })?;

        if !status.is_success() {
            error!(
                "upstream {} returned {}: {}",
                request.url,
                status.as_u16(),
                String::from_utf8_lossy(&body)
            );
            return Err(ScrapError::UpstreamStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }
}
