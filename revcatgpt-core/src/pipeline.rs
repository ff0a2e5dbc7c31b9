//! Context assembly pipeline.
//!
//! One [`ContextPipeline::assemble`] call walks a query through
//! [`PipelineStage`]s: detect its language, resolve its embedding (cache
//! first), search, then render hits in rank order until the token budget is
//! spent. Every failure is reported as a [`PipelineError`] carrying the
//! message sent to the client.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::budget::{DEFAULT_TOKEN_CEILING, TokenCounter, WithinBudget};
use crate::cache::EmbeddingCache;
use crate::embeddings::EmbeddingProvider;
use crate::error::{EmbeddingError, PipelineError, SearchError};
use crate::language::LanguageDetector;
use crate::render::FragmentRenderer;
use crate::search::SearchClient;
use crate::types::{Embedding, LanguageTag, QueryKey, SearchHit};

/// Appended after every rendered fragment.
pub const SEPARATOR: &str = "\n\n---\n\n";

/// Default number of hits requested from the search backend.
pub const DEFAULT_SEARCH_LIMIT: usize = 30;

/// Default bound on each upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    LanguageDetected,
    EmbeddingResolved,
    SearchCompleted,
    Rendering,
    Completed,
    Errored,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::LanguageDetected => "language_detected",
            PipelineStage::EmbeddingResolved => "embedding_resolved",
            PipelineStage::SearchCompleted => "search_completed",
            PipelineStage::Rendering => "rendering",
            PipelineStage::Completed => "completed",
            PipelineStage::Errored => "errored",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-deployment pipeline constants.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub search_limit: usize,
    pub token_ceiling: usize,
    /// Used when the query language cannot be detected.
    pub default_language: LanguageTag,
    pub upstream_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            search_limit: DEFAULT_SEARCH_LIMIT,
            token_ceiling: DEFAULT_TOKEN_CEILING,
            default_language: LanguageTag::english(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }
}

/// The context assembled for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    /// Rendered fragments, each followed by [`SEPARATOR`].
    pub text: String,
    /// Estimated token cost of the included fragments.
    pub tokens: usize,
    /// Number of included fragments.
    pub fragments: usize,
    /// Language the fragments were rendered for.
    pub language: LanguageTag,
}

/// Query → context pipeline over injected collaborators.
pub struct ContextPipeline {
    detector: LanguageDetector,
    cache: Arc<EmbeddingCache>,
    embedder: Arc<dyn EmbeddingProvider>,
    search: Arc<dyn SearchClient>,
    renderer: FragmentRenderer,
    counter: TokenCounter,
    settings: PipelineSettings,
}

impl std::fmt::Debug for ContextPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPipeline")
            .field("detector", &self.detector)
            .field("cache", &self.cache)
            .field("embedder", &self.embedder.provider_name())
            .field("counter", &self.counter)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ContextPipeline {
    pub fn new(
        detector: LanguageDetector,
        cache: Arc<EmbeddingCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        search: Arc<dyn SearchClient>,
        renderer: FragmentRenderer,
        counter: TokenCounter,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            detector,
            cache,
            embedder,
            search,
            renderer,
            counter,
            settings,
        }
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Build the context for `query`.
    pub async fn assemble(&self, query: &str) -> Result<AssembledContext, PipelineError> {
        let result = self.run(query).await;
        match &result {
            Ok(context) => {
                debug!(stage = %PipelineStage::Completed, "pipeline stage");
                info!(
                    tokens = context.tokens,
                    fragments = context.fragments,
                    language = %context.language,
                    "context assembled"
                );
            }
            Err(e) => {
                debug!(stage = %PipelineStage::Errored, "pipeline stage");
                warn!(error = %e, "context assembly failed");
            }
        }
        result
    }

    async fn run(&self, query: &str) -> Result<AssembledContext, PipelineError> {
        if query.trim().is_empty() {
            return Err(PipelineError::bad_request("query is empty"));
        }
        debug!(stage = %PipelineStage::Received, query, "pipeline stage");

        let language = self.resolve_language(query)?;
        debug!(stage = %PipelineStage::LanguageDetected, language = %language, "pipeline stage");

        let embedding = self.resolve_embedding(query).await?;
        debug!(stage = %PipelineStage::EmbeddingResolved, dimensions = embedding.len(), "pipeline stage");

        let hits = self.find_hits(query, &embedding).await?;
        debug!(stage = %PipelineStage::SearchCompleted, hits = hits.len(), "pipeline stage");

        debug!(stage = %PipelineStage::Rendering, "pipeline stage");
        self.render_within_budget(query, &hits, language)
    }

    fn resolve_language(&self, query: &str) -> Result<LanguageTag, PipelineError> {
        match self.detector.detect(query) {
            Some(code) => LanguageTag::parse(code)
                .map_err(|_| PipelineError::bad_request(format!("cannot parse language {code}"))),
            None => Ok(self.settings.default_language.clone()),
        }
    }

    async fn resolve_embedding(&self, query: &str) -> Result<Embedding, PipelineError> {
        let key = QueryKey::for_query(query);
        if let Some(embedding) = self.cache.get(&key) {
            debug!("query embedding served from cache");
            return Ok(embedding);
        }

        let timeout = self.settings.upstream_timeout;
        let vectors = tokio::time::timeout(timeout, self.embedder.embed(query))
            .await
            .unwrap_or(Err(EmbeddingError::Timeout {
                timeout_secs: timeout.as_secs(),
            }))
            .map_err(|e| {
                PipelineError::upstream(format!("cannot create embedding for query {query} - {e}"))
            })?;

        let embedding = vectors
            .into_iter()
            .next()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                PipelineError::upstream(format!("no embedding returned for query {query}"))
            })?;
        self.cache.put(key, embedding.clone());
        Ok(embedding)
    }

    async fn find_hits(
        &self,
        query: &str,
        embedding: &Embedding,
    ) -> Result<Vec<SearchHit>, PipelineError> {
        let vector = embedding.to_f64();
        let timeout = self.settings.upstream_timeout;
        tokio::time::timeout(
            timeout,
            self.search.search(&vector, self.settings.search_limit),
        )
        .await
        .unwrap_or(Err(SearchError::Timeout {
            timeout_secs: timeout.as_secs(),
        }))
        .map_err(|e| PipelineError::upstream(format!("cannot search for query {query}: {e}")))
    }

    fn render_within_budget(
        &self,
        query: &str,
        hits: &[SearchHit],
        language: LanguageTag,
    ) -> Result<AssembledContext, PipelineError> {
        let rendered = hits.iter().map(|hit| self.renderer.render(hit, &language));
        let mut admitted = WithinBudget::new(rendered, self.settings.token_ceiling, |text: &String| {
            self.counter.estimate(text)
        });

        let mut text = String::new();
        let mut fragments = 0;
        for fragment in admitted.by_ref() {
            let fragment = fragment.map_err(|e| {
                PipelineError::render(format!("cannot execute template for query {query}: {e}"))
            })?;
            text.push_str(&fragment);
            text.push_str(SEPARATOR);
            fragments += 1;
        }
        if fragments < hits.len() {
            debug!(
                included = fragments,
                dropped = hits.len() - fragments,
                "token ceiling reached"
            );
        }

        Ok(AssembledContext {
            text,
            tokens: admitted.budget().used(),
            fragments,
            language,
        })
    }
}
