//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use revcatgpt_core::budget::TokenCounter;
use revcatgpt_core::error::{EmbeddingError, SearchError};
use revcatgpt_core::pipeline::PipelineSettings;
use revcatgpt_core::{
    ContextPipeline, Embedding, EmbeddingCache, EmbeddingProvider, FragmentRenderer,
    LanguageDetector, LanguageTag, LocaleBundle, SearchClient, SearchHit,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Embedder that returns a fixed result and counts its calls.
pub struct StubEmbedder {
    result: Result<Vec<Embedding>, String>,
    calls: AtomicUsize,
}

impl StubEmbedder {
    pub fn vectors(vectors: Vec<Embedding>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(vectors),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unit() -> Arc<Self> {
        Self::vectors(vec![Embedding::new(vec![0.25, 0.5, 0.75])])
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<Embedding>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .map_err(|message| EmbeddingError::ApiRequest { message })
    }

    fn provider_name(&self) -> &str {
        "stub"
    }
}

/// Search backend returning fixed hits, or a fixed failure.
pub struct StubSearch {
    result: Result<Vec<SearchHit>, String>,
    calls: AtomicUsize,
}

impl StubSearch {
    pub fn hits(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(hits),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchClient for StubSearch {
    async fn search(&self, _vector: &[f64], limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(hits) => Ok(hits.iter().take(limit).cloned().collect()),
            Err(message) => Err(SearchError::Request {
                message: message.clone(),
            }),
        }
    }
}

pub fn hit(id: &str, title: &str) -> SearchHit {
    SearchHit {
        id: id.into(),
        signature: format!("SIG-{id}"),
        title: vec![revcatgpt_core::MultiLangFragment::original("en", title)],
        ..Default::default()
    }
}

pub fn english_bundle() -> Arc<LocaleBundle> {
    let mut bundle = LocaleBundle::new(LanguageTag::english());
    bundle
        .add_messages(
            LanguageTag::english(),
            "signature = \"Signature\"\ndate = \"Date\"\ntranslated = \"machine translated\"\n",
        )
        .expect("valid messages");
    Arc::new(bundle)
}

/// Pipeline over the stubs, rendering with `template` for English readers.
pub fn build_pipeline(
    embedder: Arc<StubEmbedder>,
    search: Arc<StubSearch>,
    template: &str,
    settings: PipelineSettings,
) -> ContextPipeline {
    let bundle = english_bundle();
    ContextPipeline::new(
        LanguageDetector::new([&LanguageTag::english()]),
        Arc::new(EmbeddingCache::new(16)),
        embedder,
        search,
        FragmentRenderer::new(template, bundle).expect("valid template"),
        TokenCounter::for_model("gpt-4-0314").expect("tokenizer"),
        settings,
    )
}
