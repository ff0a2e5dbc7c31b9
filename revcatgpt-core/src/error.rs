//! Error types for the revcatgpt core library.
//!
//! Uses `thiserror` for public API error types. Startup-time concerns
//! (configuration, locale bundles, template compilation) aggregate into
//! [`RevcatGptError`]; request-scoped failures are [`PipelineError`], which
//! carries the message returned to the HTTP client.

use axum::http::StatusCode;
use std::path::PathBuf;

/// Top-level error type for building the service.
#[derive(Debug, thiserror::Error)]
pub enum RevcatGptError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Locale error: {0}")]
    Locale(#[from] LocaleError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Token budget error: {0}")]
    Budget(#[from] BudgetError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// Errors from loading localization bundles.
#[derive(Debug, thiserror::Error)]
pub enum LocaleError {
    #[error("Cannot find locale file {path}")]
    MissingFile { path: PathBuf },

    #[error("Cannot load locale file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Invalid language tag '{tag}'")]
    InvalidTag { tag: String },
}

/// Errors from the embedding provider.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors from the similarity search client.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {message}")]
    Request { message: String },

    #[error("Search endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Search query rejected: {messages}")]
    GraphQl { messages: String },

    #[error("Search response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Search timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors from compiling or evaluating the fragment template.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("cannot parse fragment template: {message}")]
    Template { message: String },

    #[error("cannot read fragment template {path}: {source}")]
    TemplateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    Evaluation { message: String },
}

/// Errors from setting up the token counter.
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("No tokenizer available for model '{model}': {message}")]
    Tokenizer { model: String, message: String },
}

/// Request-scoped failure of the context pipeline.
///
/// Every variant carries the human-readable message sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Upstream { message: String },

    #[error("{message}")]
    Render { message: String },
}

impl PipelineError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// The message reported to the client.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message } | Self::Upstream { message } | Self::Render { message } => {
                message
            }
        }
    }

    /// HTTP status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } | Self::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A type alias for results using the top-level `RevcatGptError`.
pub type Result<T> = std::result::Result<T, RevcatGptError>;
