//! # Similarity search client
//!
//! The pipeline hands the query embedding to a [`SearchClient`] and renders
//! whatever ranked hits come back, in order. [`RevcatClient`] implements the
//! trait against the Revcat GraphQL API (`vectorSearch`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::types::SearchHit;

/// Trait for similarity search backends.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Return at most `limit` hits ranked by similarity, highest first.
    async fn search(&self, vector: &[f64], limit: usize) -> Result<Vec<SearchHit>, SearchError>;
}

// ---------------------------------------------------------------------------
// Revcat GraphQL client
// ---------------------------------------------------------------------------

/// Connection settings for the Revcat GraphQL endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevcatConfig {
    /// GraphQL endpoint URL.
    #[serde(default)]
    pub endpoint: String,
    /// Accept invalid TLS certificates from the endpoint.
    #[serde(default)]
    pub insecure: bool,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub api_key: String,
}

const VECTOR_SEARCH_QUERY: &str = r#"query VectorSearchShort($vector: [Float!]!, $size: Int!) {
  vectorSearch(vector: $vector, size: $size) {
    edges {
      id
      signature
      title { lang value translated }
      description { lang value translated }
      date
      place
      collection
      url
      languages
      persons { name role }
      tags
      media { name type mimetype uri width height }
      score
    }
  }
}"#;

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'static str,
    #[serde(rename = "operationName")]
    operation_name: &'static str,
    variables: VectorSearchVariables<'a>,
}

#[derive(Serialize)]
struct VectorSearchVariables<'a> {
    vector: &'a [f64],
    size: usize,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<VectorSearchData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VectorSearchData {
    vector_search: VectorSearchConnection,
}

#[derive(Deserialize)]
struct VectorSearchConnection {
    #[serde(default)]
    edges: Vec<SearchHit>,
}

/// Revcat GraphQL search client.
pub struct RevcatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for RevcatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevcatClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl RevcatClient {
    pub fn new(config: &RevcatConfig) -> Result<Self, SearchError> {
        if config.endpoint.is_empty() {
            return Err(SearchError::Request {
                message: "revcat endpoint is not configured".into(),
            });
        }
        url::Url::parse(&config.endpoint).map_err(|e| SearchError::Request {
            message: format!("invalid revcat endpoint '{}': {}", config.endpoint, e),
        })?;
        if config.insecure {
            tracing::warn!(endpoint = %config.endpoint, "TLS certificate verification disabled for revcat");
        }
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| SearchError::Request {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

fn parse_response(response: GraphQlResponse) -> Result<Vec<SearchHit>, SearchError> {
    if !response.errors.is_empty() {
        let messages = response
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SearchError::GraphQl { messages });
    }
    response
        .data
        .map(|d| d.vector_search.edges)
        .ok_or_else(|| SearchError::ResponseParse {
            message: "response has neither data nor errors".into(),
        })
}

#[async_trait]
impl SearchClient for RevcatClient {
    async fn search(&self, vector: &[f64], limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let body = GraphQlRequest {
            query: VECTOR_SEARCH_QUERY,
            operation_name: "VectorSearchShort",
            variables: VectorSearchVariables {
                vector,
                size: limit,
            },
        };
        let mut request = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let resp = request.send().await.map_err(|e| SearchError::Request {
            message: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GraphQlResponse =
            resp.json().await.map_err(|e| SearchError::ResponseParse {
                message: e.to_string(),
            })?;
        let hits = parse_response(parsed)?;
        tracing::debug!(hits = hits.len(), limit, "vector search completed");
        Ok(hits)
    }
}
