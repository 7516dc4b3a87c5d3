use crate::coin::ContractDetail;
use crate::config::AiConfig;
use crate::error::{ScrapError, ScrapResult};
use crate::fetch::{FetchRequest, Fetcher};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Produces the natural-language analysis attached to a contract detail.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str, detail: &ContractDetail) -> ScrapResult<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    collections: &'a ContractDetail,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    assistant_message: String,
}

/// Preset-completions endpoint authenticated with an API key header.
pub struct CompletionClient {
    fetcher: Arc<dyn Fetcher>,
    url: String,
    api_key: String,
    api_key_header: String,
}

impl CompletionClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &AiConfig) -> Self {
        Self {
            fetcher,
            url: config.completions_url.clone(),
            api_key: config.api_key.clone(),
            api_key_header: config.api_key_header.clone(),
        }
    }
}

#[async_trait]
impl Summarizer for CompletionClient {
    async fn summarize(&self, prompt: &str, detail: &ContractDetail) -> ScrapResult<String> {
        if self.url.is_empty() {
            return Err(ScrapError::Internal("ai.completions_url is not configured".into()));
        }

        let request = FetchRequest::post_json(
            &self.url,
            &CompletionRequest {
                prompt,
                collections: detail,
            },
        )?
        .header(&self.api_key_header, &self.api_key);

        let body = self.fetcher.fetch(&request).await?;
        let response: CompletionResponse =
            serde_json::from_slice(&body).map_err(|e| ScrapError::decode("ai completion", e))?;

        Ok(response.assistant_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RouteFetcher;
    use serde_json::Value;

    fn config(url: &str) -> AiConfig {
        AiConfig {
            completions_url: url.to_string(),
            api_key: "secret".to_string(),
            api_key_header: "ATHENOR-API-KEY".to_string(),
        }
    }

    fn detail() -> ContractDetail {
        ContractDetail {
            id: "bonk".to_string(),
            symbol: "bonk".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_posts_prompt_and_record_with_key_header() {
        let fetcher = Arc::new(
            RouteFetcher::new().ok("/completions", r#"{"assistant_message":"Looks liquid."}"#),
        );
        let client = CompletionClient::new(fetcher.clone(), &config("http://ai.test/api/preset/completions"));

        let summary = client.summarize("Summarize.", &detail()).await.unwrap();
        assert_eq!(summary, "Looks liquid.");

        let seen = fetcher.seen.lock().unwrap();
        assert!(seen[0]
            .headers
            .iter()
            .any(|(name, value)| name == "ATHENOR-API-KEY" && value == "secret"));
        let sent: Value = serde_json::from_slice(seen[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(sent["prompt"], "Summarize.");
        assert_eq!(sent["collections"]["symbol"], "bonk");
    }

    #[tokio::test]
    async fn test_unconfigured_url_fails() {
        let client = CompletionClient::new(Arc::new(RouteFetcher::new()), &config(""));
        assert_eq!(client.summarize("p", &detail()).await.unwrap_err().kind(), "INTERNAL");
    }

    #[tokio::test]
    async fn test_malformed_reply_is_decode_failure() {
        let fetcher = Arc::new(RouteFetcher::new().ok("/completions", "<html>"));
        let client = CompletionClient::new(fetcher, &config("http://ai.test/completions"));
        assert_eq!(client.summarize("p", &detail()).await.unwrap_err().kind(), "DECODE_FAILURE");
    }
}
