//! Configuration system for revcatgpt.
//!
//! Uses `figment` for layered configuration: defaults -> TOML file -> environment variables.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::budget::{DEFAULT_TOKEN_CEILING, DEFAULT_TOKEN_MODEL};
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::embeddings::OpenAiConfig;
use crate::error::ConfigError;
use crate::pipeline::{DEFAULT_SEARCH_LIMIT, DEFAULT_UPSTREAM_TIMEOUT, PipelineSettings};
use crate::search::RevcatConfig;
use crate::types::LanguageTag;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "revcatgpt.toml";

/// Prefix of environment overrides, e.g. `REVCATGPT_REVCAT__ENDPOINT`.
pub const ENV_PREFIX: &str = "REVCATGPT_";

const REDACTED: &str = "********";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub revcat: RevcatConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the server binds to.
    pub local_addr: String,
    /// Public base URL; an `https://` address enables TLS.
    pub external_addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            local_addr: "localhost:8081".into(),
            external_addr: "http://localhost:8081".into(),
            tls_cert: None,
            tls_key: None,
        }
    }
}

impl ServerConfig {
    pub fn wants_tls(&self) -> bool {
        self.external_addr.starts_with("https://")
    }
}

/// Localization bundle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Fallback interface language.
    pub default: String,
    /// Folder holding `active.<lang>.toml` files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,
    /// Interface languages to load.
    pub available: Vec<String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: "en".into(),
            folder: None,
            available: vec!["de".into(), "en".into(), "fr".into(), "it".into()],
        }
    }
}

impl LocaleConfig {
    pub fn default_language(&self) -> Result<LanguageTag, ConfigError> {
        LanguageTag::parse(&self.default).map_err(|e| ConfigError::Invalid {
            message: format!("locale.default: {e}"),
        })
    }

    pub fn languages(&self) -> Result<Vec<LanguageTag>, ConfigError> {
        self.available
            .iter()
            .map(|l| {
                LanguageTag::parse(l).map_err(|e| ConfigError::Invalid {
                    message: format!("locale.available: {e}"),
                })
            })
            .collect()
    }

    /// The locale folder, `./locales` when unset.
    pub fn folder_or_default(&self) -> PathBuf {
        self.folder
            .clone()
            .unwrap_or_else(|| PathBuf::from("locales"))
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// JSON log file; stderr only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Default filter directive, overridden by `RUST_LOG` and `-v`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".into(),
        }
    }
}

/// Context pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cache_capacity: usize,
    pub search_limit: usize,
    pub token_ceiling: usize,
    /// Chat model whose tokenizer prices fragments.
    pub token_model: String,
    pub upstream_timeout_secs: u64,
    /// Custom fragment template; the built-in one is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            search_limit: DEFAULT_SEARCH_LIMIT,
            token_ceiling: DEFAULT_TOKEN_CEILING,
            token_model: DEFAULT_TOKEN_MODEL.into(),
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT.as_secs(),
            template: None,
        }
    }
}

impl ServiceConfig {
    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        if self.pipeline.search_limit == 0 {
            return invalid("pipeline.search_limit must be positive");
        }
        if self.pipeline.token_ceiling == 0 {
            return invalid("pipeline.token_ceiling must be positive");
        }
        if self.pipeline.upstream_timeout_secs == 0 {
            return invalid("pipeline.upstream_timeout_secs must be positive");
        }
        if self.server.tls_cert.is_some() != self.server.tls_key.is_some() {
            return invalid("server.tls_cert and server.tls_key must be set together");
        }
        self.locale.default_language()?;
        let languages = self.locale.languages()?;
        if languages.is_empty() {
            return invalid("locale.available must name at least one language");
        }
        Ok(())
    }

    /// Pipeline constants derived from this configuration.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings, ConfigError> {
        Ok(PipelineSettings {
            search_limit: self.pipeline.search_limit,
            token_ceiling: self.pipeline.token_ceiling,
            default_language: self.locale.default_language()?,
            upstream_timeout: Duration::from_secs(self.pipeline.upstream_timeout_secs),
        })
    }

    /// A copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |s: &str| {
            if s.is_empty() {
                String::new()
            } else {
                REDACTED.to_string()
            }
        };
        let mut config = self.clone();
        config.revcat.api_key = mask(&config.revcat.api_key);
        config.openai.api_key = mask(&config.openai.api_key);
        config
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `REVCATGPT_`, `__` between sections)
/// 2. The TOML file at `path`, or `revcatgpt.toml` in the working directory
/// 3. Built-in defaults
///
/// An explicit `path` that does not exist is an error. When `locale.folder`
/// is unset it defaults to the config file's directory.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ServiceConfig::default()));

    let file = match path {
        Some(p) if !p.is_file() => {
            return Err(ConfigError::FileNotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => Some(p.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };
    if let Some(file) = &file {
        figment = figment.merge(Toml::file(file));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let mut config: ServiceConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;

    if config.locale.folder.is_none()
        && let Some(dir) = file.as_deref().and_then(Path::parent)
    {
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        config.locale.folder = Some(dir.to_path_buf());
    }

    tracing::debug!(file = ?file, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.local_addr, "localhost:8081");
        assert!(!config.server.wants_tls());
        assert_eq!(config.locale.default, "en");
        assert_eq!(config.locale.available, vec!["de", "en", "fr", "it"]);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.pipeline.cache_capacity, 100);
        assert_eq!(config.pipeline.search_limit, 30);
        assert_eq!(config.pipeline.token_ceiling, 3000);
        assert_eq!(config.pipeline.token_model, "gpt-4-0314");
        assert_eq!(config.openai.model, "text-embedding-ada-002");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = ServiceConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: ServiceConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.server.external_addr, config.server.external_addr);
        assert_eq!(deserialized.pipeline.token_model, config.pipeline.token_model);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revcatgpt.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
[server]
local_addr = "0.0.0.0:9000"
external_addr = "https://revcatgpt.example.org"

[locale]
default = "de"
available = ["de", "en"]

[revcat]
endpoint = "https://revcat.example.org/graphql"
api_key = "rc-secret"

[pipeline]
search_limit = 12
"#
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.local_addr, "0.0.0.0:9000");
        assert!(config.server.wants_tls());
        assert_eq!(config.locale.default, "de");
        assert_eq!(config.locale.available, vec!["de", "en"]);
        assert_eq!(config.revcat.endpoint, "https://revcat.example.org/graphql");
        assert_eq!(config.pipeline.search_limit, 12);
        // Unset values keep their defaults.
        assert_eq!(config.pipeline.token_ceiling, 3000);
        assert_eq!(config.locale.folder.as_deref(), Some(dir.path()));
        assert!(config.validate().is_ok());

        let settings = config.pipeline_settings().unwrap();
        assert_eq!(settings.search_limit, 12);
        assert_eq!(settings.default_language.as_str(), "de");
        assert_eq!(settings.upstream_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_load_config_keeps_explicit_locale_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[locale]\nfolder = \"/srv/locales\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.locale.folder, Some(PathBuf::from("/srv/locales")));
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_load_config_bad_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[pipeline]\nsearch_limit = \"many\"\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = ServiceConfig::default();
        config.pipeline.search_limit = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.pipeline.token_ceiling = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("token_ceiling"));
    }

    #[test]
    fn test_validate_rejects_bad_languages() {
        let mut config = ServiceConfig::default();
        config.locale.default = "not a language".into();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.locale.available = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_tls_pair() {
        let mut config = ServiceConfig::default();
        config.server.tls_cert = Some(PathBuf::from("cert.pem"));
        assert!(config.validate().is_err());
        config.server.tls_key = Some(PathBuf::from("key.pem"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let mut config = ServiceConfig::default();
        config.revcat.api_key = "rc-secret".into();
        let redacted = config.redacted();
        assert_eq!(redacted.revcat.api_key, "********");
        assert_eq!(redacted.openai.api_key, "");
        let rendered = toml::to_string(&redacted).unwrap();
        assert!(!rendered.contains("rc-secret"));
    }
}
