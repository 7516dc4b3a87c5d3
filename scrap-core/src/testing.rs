// Stubs shared by the unit tests of this crate.

use crate::db::TokenRepository;
use crate::error::{ScrapError, ScrapResult};
use crate::fetch::{FetchRequest, Fetcher};
use crate::models::{TokenMetadata, TokenPage};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

pub struct StaticTokens(pub Vec<TokenMetadata>);

#[async_trait]
impl TokenRepository for StaticTokens {
    async fn find_by_addresses(&self, addresses: &[String]) -> ScrapResult<Vec<TokenMetadata>> {
        Ok(self
            .0
            .iter()
            .filter(|t| addresses.contains(&t.address))
            .cloned()
            .collect())
    }

    async fn list(&self, limit: i64, offset: i64, _search: Option<&str>) -> ScrapResult<TokenPage> {
        Ok(TokenPage {
            tokens: self
                .0
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect(),
            total: self.0.len() as i64,
        })
    }
}

/// Answers each request with the first route whose key appears in the URL or the body.
pub struct RouteFetcher {
    routes: Vec<(String, Result<String, (u16, String)>)>,
    pub seen: Mutex<Vec<FetchRequest>>,
}

impl RouteFetcher {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(mut self, key: &str, body: impl Into<String>) -> Self {
        self.routes.push((key.to_string(), Ok(body.into())));
        self
    }

    pub fn fail(mut self, key: &str, status: u16, body: &str) -> Self {
        self.routes
            .push((key.to_string(), Err((status, body.to_string()))));
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

#[async_trait]
impl Fetcher for RouteFetcher {
    async fn fetch(&self, request: &FetchRequest) -> ScrapResult<Bytes> {
        self.seen.lock().unwrap().push(request.clone());

        let body = request
            .body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();

        let route = self
            .routes
            .iter()
            .find(|(key, _)| request.url.contains(key.as_str()) || body.contains(key.as_str()));

        match route {
            Some((_, Ok(payload))) => Ok(Bytes::from(payload.clone())),
            Some((_, Err((status, payload)))) => Err(ScrapError::UpstreamStatus {
                status: *status,
                body: payload.clone(),
            }),
            None => Err(ScrapError::Transport {
                url: request.url.clone(),
                message: "no stub route".to_string(),
            }),
        }
    }
}
