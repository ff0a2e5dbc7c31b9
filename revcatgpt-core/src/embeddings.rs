//! Embedding provider abstraction.
//!
//! The pipeline only sees the [`EmbeddingProvider`] trait. The OpenAI
//! implementation talks to any OpenAI-compatible `/v1/embeddings` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;
use crate::types::Embedding;

/// Trait for remote embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text. The provider may return zero vectors; the caller
    /// decides whether that is an error.
    async fn embed(&self, text: &str) -> Result<Vec<Embedding>, EmbeddingError>;

    /// Return the provider name.
    fn provider_name(&self) -> &str;
}

/// Configuration for the OpenAI embedding client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key; falls back to `OPENAI_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,
    /// Embedding model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_model() -> String {
    "text-embedding-ada-002".into()
}

fn default_base_url() -> String {
    "https://api.openai.com".into()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

impl OpenAiConfig {
    /// The configured key, or `OPENAI_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI API embedder.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &OpenAiConfig) -> Self {
        let api_key = config.resolved_api_key().unwrap_or_else(|| {
            tracing::warn!("no OpenAI API key configured, embedding requests will be rejected");
            String::new()
        });
        Self::new(api_key, config.model.clone(), config.base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<Embedding>, EmbeddingError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::ApiRequest {
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse =
            resp.json().await.map_err(|e| EmbeddingError::ResponseParse {
                message: e.to_string(),
            })?;
        tracing::debug!(model = %self.model, vectors = parsed.data.len(), "embedding response");
        Ok(parsed
            .data
            .into_iter()
            .map(|d| Embedding::new(d.embedding))
            .collect())
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_config_defaults() {
        let config = OpenAiConfig::default();
        assert_eq!(config.model, "text-embedding-ada-002");
        assert_eq!(config.base_url, "https://api.openai.com");
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_openai_config_deserialize_empty() {
        let config: OpenAiConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.model, "text-embedding-ada-002");
    }

    #[test]
    fn test_configured_key_wins() {
        let config = OpenAiConfig {
            api_key: "sk-configured".into(),
            ..Default::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("sk-configured"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let embedder = OpenAiEmbedder::new(
            "k".into(),
            "text-embedding-3-small".into(),
            "http://localhost:11434/".into(),
        );
        assert_eq!(embedder.endpoint(), "http://localhost:11434/v1/embeddings");
        assert_eq!(embedder.provider_name(), "openai");
    }

    #[test]
    fn test_request_body_shape() {
        let body = EmbeddingRequest {
            model: "text-embedding-ada-002",
            input: ["who is Jean Piaget"],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "text-embedding-ada-002");
        assert_eq!(json["input"][0], "who is Jean Piaget");
    }

    #[test]
    fn test_response_parse() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25]}],"model":"ada"}"#,
        )
        .unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].embedding, vec![0.5, -0.25]);

        let empty: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(empty.data.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let embedder = OpenAiEmbedder::new(
            "k".into(),
            "text-embedding-ada-002".into(),
            "http://127.0.0.1:1".into(),
        );
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ApiRequest { .. }));
    }
}
