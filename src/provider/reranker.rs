//! Reranker backed by an OpenAI-compatible chat-completions endpoint.

use super::config::RerankProviderConfig;
use crate::error::CatalogError;
use crate::ranking::{RerankContext, Reranker};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SYSTEM_PROMPT: &str =
    "You rank catalog entries. Answer with candidate keys only, comma separated.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

pub struct ProviderReranker {
    config: RerankProviderConfig,
    client: reqwest::Client,
}

impl ProviderReranker {
    pub fn new(config: RerankProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &RerankProviderConfig {
        &self.config
    }
}

#[async_trait]
impl Reranker for ProviderReranker {
    fn available(&self) -> bool {
        self.config.is_usable()
    }

    async fn rerank(&self, context: &RerankContext) -> Result<String, CatalogError> {
        let endpoint = self
            .config
            .normalized_endpoint()
            .ok_or_else(|| CatalogError::RerankFailed("no endpoint configured".to_string()))?;
        let url = format!("{}/chat/completions", endpoint);
        let prompt = context.prompt();
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.config.resolved_api_key() {
            request = request.bearer_auth(key);
        }
        debug!(url = %url, candidates = context.candidates.len(), "Sending rerank request");

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::RerankFailed(format!("HTTP request failed: {}", e)))?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CatalogError::RerankFailed(format!(
                "API request failed ({}): {}",
                status, text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::RerankFailed(format!("Failed to parse response: {}", e)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| CatalogError::RerankFailed("empty completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderType;

    #[test]
    fn unavailable_without_endpoint() {
        let reranker = ProviderReranker::new(RerankProviderConfig {
            provider_type: ProviderType::LocalCustom,
            model: "m".to_string(),
            api_key: None,
            endpoint: None,
            temperature: None,
        });
        assert!(!reranker.available());
    }

    #[test]
    fn response_shape_parses() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"core:a, bmm:b"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content, "core:a, bmm:b");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_rerank_failure() {
        let reranker = ProviderReranker::new(RerankProviderConfig {
            provider_type: ProviderType::LocalCustom,
            model: "m".to_string(),
            api_key: None,
            endpoint: Some("http://127.0.0.1:9".to_string()),
            temperature: None,
        });
        let context = RerankContext {
            query: "q".to_string(),
            candidates: vec![],
            recent: vec![],
        };
        let err = reranker.rerank(&context).await.unwrap_err();
        assert!(matches!(err, CatalogError::RerankFailed(_)));
    }
}
