//! CLI command handlers.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use revcatgpt_core::budget::TokenCounter;
use revcatgpt_core::config::ServiceConfig;
use revcatgpt_core::gateway::{self, AppState, SharedState};
use revcatgpt_core::{
    ContextPipeline, EmbeddingCache, FragmentRenderer, LanguageDetector, LocaleBundle,
    OpenAiEmbedder, RevcatClient,
};

use crate::tls;

/// How long in-flight requests may run after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Validate `config` and print it with API keys masked.
pub fn check_config(config: &ServiceConfig) -> anyhow::Result<()> {
    println!("{}", describe_config(config)?);
    Ok(())
}

fn describe_config(config: &ServiceConfig) -> anyhow::Result<String> {
    config.validate()?;
    let rendered = toml::to_string_pretty(&config.redacted())
        .context("cannot serialize configuration")?;
    Ok(format!(
        "# configuration is valid\n# locale folder: {}\n\n{}",
        config.locale.folder_or_default().display(),
        rendered
    ))
}

/// Wire the pipeline from configuration.
fn build_state(config: &ServiceConfig) -> anyhow::Result<SharedState> {
    config.validate()?;

    let default_language = config.locale.default_language()?;
    let folder = config.locale.folder_or_default();
    let bundle = LocaleBundle::load(&folder, default_language, &config.locale.languages()?)?;
    info!(
        folder = %folder.display(),
        languages = bundle.languages().len(),
        "locale bundles loaded"
    );
    let bundle = Arc::new(bundle);

    let detector = LanguageDetector::new(bundle.languages());
    let renderer = match &config.pipeline.template {
        Some(path) => FragmentRenderer::from_file(path, Arc::clone(&bundle))?,
        None => FragmentRenderer::with_default_template(Arc::clone(&bundle))?,
    };
    let counter = TokenCounter::for_model(&config.pipeline.token_model)?;
    let search = RevcatClient::new(&config.revcat)?;
    let embedder = OpenAiEmbedder::from_config(&config.openai);

    let pipeline = ContextPipeline::new(
        detector,
        Arc::new(EmbeddingCache::new(config.pipeline.cache_capacity)),
        Arc::new(embedder),
        Arc::new(search),
        renderer,
        counter,
        config.pipeline_settings()?,
    );
    Ok(Arc::new(AppState::new(Arc::new(pipeline))))
}

/// Run the context server until SIGINT or SIGTERM.
pub async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    let server = &config.server;

    if server.tls_cert.is_some() || server.wants_tls() {
        let tls_config = tls::load_tls_config(server).await?;
        let addr: SocketAddr = tokio::net::lookup_host(&server.local_addr)
            .await
            .with_context(|| format!("cannot resolve {}", server.local_addr))?
            .next()
            .with_context(|| format!("no address for {}", server.local_addr))?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        info!(%addr, external = %server.external_addr, "context gateway listening (https)");
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(gateway::router(state).into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(&server.local_addr)
            .await
            .with_context(|| format!("cannot listen on {}", server.local_addr))?;
        gateway::serve(listener, state, shutdown_signal()).await?;
    }

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
