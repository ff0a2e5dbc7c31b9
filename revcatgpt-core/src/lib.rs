//! # revcatgpt Core
//!
//! Core library for the revcatgpt context service.
//! Turns a free-text query into a token-bounded block of localized catalogue
//! fragments: language detection, a cached query embedding, similarity
//! search, template rendering, and token budgeting.

pub mod budget;
pub mod cache;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod gateway;
pub mod language;
pub mod locale;
pub mod pipeline;
pub mod render;
pub mod search;
pub mod types;

// Re-export commonly used types at the crate root.
pub use budget::{TokenBudget, TokenCounter, WithinBudget};
pub use cache::EmbeddingCache;
pub use config::{ServiceConfig, load_config};
pub use embeddings::{EmbeddingProvider, OpenAiConfig, OpenAiEmbedder};
pub use error::{PipelineError, Result, RevcatGptError};
pub use gateway::{AppState, SharedState, router};
pub use language::LanguageDetector;
pub use locale::LocaleBundle;
pub use pipeline::{AssembledContext, ContextPipeline, PipelineSettings, PipelineStage, SEPARATOR};
pub use render::{FragmentRenderer, TemplateHelper};
pub use search::{RevcatClient, RevcatConfig, SearchClient};
pub use types::{Embedding, LanguageTag, MultiLangFragment, QueryKey, SearchHit};
