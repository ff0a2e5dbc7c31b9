//! TLS setup for the HTTPS listener.

use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use revcatgpt_core::config::ServerConfig;

/// Host names the self-signed certificate is issued for.
fn subject_alt_names(server: &ServerConfig) -> Vec<String> {
    let mut names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    if let Some(host) = url::Url::parse(&server.external_addr)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        && !names.contains(&host)
    {
        names.push(host);
    }
    names
}

/// Load the TLS config for the context server.
///
/// Tries the following in order:
/// 1. `server.tls_cert` / `server.tls_key` PEM files
/// 2. A self-signed cert generated at runtime via `rcgen`
pub async fn load_tls_config(server: &ServerConfig) -> anyhow::Result<RustlsConfig> {
    // Ensure the rustls CryptoProvider is installed (idempotent).
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    if let (Some(cert_path), Some(key_path)) = (&server.tls_cert, &server.tls_key) {
        info!(cert = %cert_path.display(), "using configured TLS certificate");
        return RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .with_context(|| format!("cannot load TLS key pair {}", cert_path.display()));
    }

    let names = subject_alt_names(server);
    info!(names = ?names, "no TLS certificate configured, generating a self-signed one");

    use rcgen::CertifiedKey;
    let CertifiedKey { cert, key_pair } = rcgen::generate_simple_self_signed(names)
        .context("failed to generate self-signed certificate")?;

    RustlsConfig::from_pem(cert.pem().into_bytes(), key_pair.serialize_pem().into_bytes())
        .await
        .context("failed to build TLS config")
}
