// Configuration management module
// This file handles loading and validating the exporter settings from
// built-in defaults, an optional config file and environment variables

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::ConfigBuilder;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Environment variable naming an optional config file.
pub const CONFIG_FILE_ENV: &str = "EXPORTER_CONFIG";
/// Prefix for environment overrides, e.g. `EXPORTER__OPSGENIE__API_KEY`.
pub const ENV_PREFIX: &str = "EXPORTER";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub log: LogConfig,
    pub opsgenie: OpsgenieConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// The address the exporter listens on
    pub addr: SocketAddr,
    /// The path metrics are exposed at
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log JSON lines instead of the plain text format
    pub json: bool,
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct OpsgenieConfig {
    pub api_key: String,
    /// API base, e.g. https://api.opsgenie.com or https://api.eu.opsgenie.com
    pub api_url: Url,
    pub timeout_secs: u64,
    /// Retry budget per request; 0 disables retries
    pub max_retry_elapsed_secs: u64,
    pub max_inflight: usize,
    pub rate_per_sec: u32,
    pub user_page_size: u32,
}

impl OpsgenieConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_retry_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_retry_elapsed_secs)
    }
}

impl fmt::Debug for OpsgenieConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpsgenieConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retry_elapsed_secs", &self.max_retry_elapsed_secs)
            .field("max_inflight", &self.max_inflight)
            .field("rate_per_sec", &self.rate_per_sec)
            .field("user_page_size", &self.user_page_size)
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
        Self::from_builder(builder)
    }

    /// Apply defaults underneath the given sources, deserialize and validate.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let cfg = builder
            .set_default("http.addr", "0.0.0.0:9212")?
            .set_default("http.path", "/metrics")?
            .set_default("log.json", false)?
            .set_default("log.level", "info")?
            .set_default("opsgenie.api_url", "https://api.opsgenie.com")?
            .set_default("opsgenie.timeout_secs", 30_i64)?
            .set_default("opsgenie.max_retry_elapsed_secs", 10_i64)?
            .set_default("opsgenie.max_inflight", 4_i64)?
            .set_default("opsgenie.rate_per_sec", 10_i64)?
            .set_default("opsgenie.user_page_size", 100_i64)?
            .build()
            .context("build configuration")?;
        let mut config: AppConfig = cfg.try_deserialize().context("deserialize configuration")?;
        config.opsgenie.api_url = with_trailing_slash(config.opsgenie.api_url);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.opsgenie.api_key.trim().is_empty() {
            bail!("opsgenie.api_key is required");
        }
        let path = self.http.path.as_str();
        if !path.starts_with('/') || matches!(path, "/" | "/health") {
            bail!("http.path must start with '/' and not clash with / or /health: {path}");
        }
        if path.contains(['*', ':', '{', '}']) {
            bail!("http.path must be a literal route without captures or wildcards: {path}");
        }
        if !(1..=500).contains(&self.opsgenie.user_page_size) {
            bail!(
                "opsgenie.user_page_size must be within 1..=500, got {}",
                self.opsgenie.user_page_size
            );
        }
        if self.opsgenie.max_inflight == 0 || self.opsgenie.rate_per_sec == 0 {
            bail!("opsgenie.max_inflight and opsgenie.rate_per_sec must be positive");
        }
        Ok(())
    }
}

/// `Url::join` replaces the last path segment unless the base ends in '/'.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> Result<AppConfig> {
        AppConfig::from_builder(
            config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg = from_toml("[opsgenie]\napi_key = \"secret\"\n").unwrap();
        assert_eq!(cfg.http.addr, "0.0.0.0:9212".parse().unwrap());
        assert_eq!(cfg.http.path, "/metrics");
        assert!(!cfg.log.json);
        assert_eq!(cfg.log.level, LogLevel::Info);
        assert_eq!(cfg.opsgenie.api_url.as_str(), "https://api.opsgenie.com/");
        assert_eq!(cfg.opsgenie.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.opsgenie.user_page_size, 100);
    }

    #[test]
    fn file_values_override_defaults() {
        let cfg = from_toml(
            r#"
            [http]
            addr = "127.0.0.1:9000"
            path = "/scrape"

            [log]
            json = true
            level = "debug"

            [opsgenie]
            api_key = "secret"
            api_url = "https://api.eu.opsgenie.com"
            max_retry_elapsed_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.http.addr.port(), 9000);
        assert_eq!(cfg.http.path, "/scrape");
        assert!(cfg.log.json);
        assert_eq!(cfg.log.level, LogLevel::Debug);
        assert_eq!(cfg.opsgenie.api_url.host_str(), Some("api.eu.opsgenie.com"));
        assert_eq!(cfg.opsgenie.max_retry_elapsed(), Duration::ZERO);
    }

    #[test]
    fn api_key_is_required() {
        assert!(from_toml("").is_err());
        assert!(from_toml("[opsgenie]\napi_key = \"  \"\n").is_err());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(from_toml("[opsgenie]\napi_key = \"k\"\n[log]\nlevel = \"trace\"\n").is_err());
        assert!(from_toml("[opsgenie]\napi_key = \"k\"\n[http]\npath = \"metrics\"\n").is_err());
        assert!(from_toml("[opsgenie]\napi_key = \"k\"\nuser_page_size = 1000\n").is_err());
    }

    #[test]
    fn rejects_route_syntax_in_metrics_path() {
        for path in ["/*", "/metrics/*rest", "/:id", "/{x}"] {
            let toml = format!("[opsgenie]\napi_key = \"k\"\n[http]\npath = \"{path}\"\n");
            assert!(from_toml(&toml).is_err(), "accepted {path}");
        }
    }

    #[test]
    fn api_url_keeps_its_base_path() {
        let cfg = from_toml(
            r#"
            [opsgenie]
            api_key = "k"
            api_url = "https://gateway.example.com/opsgenie"
            "#,
        )
        .unwrap();
        let url = &cfg.opsgenie.api_url;
        assert_eq!(url.as_str(), "https://gateway.example.com/opsgenie/");
        assert_eq!(url.join("v2/teams").unwrap().path(), "/opsgenie/v2/teams");
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let cfg = from_toml("[opsgenie]\napi_key = \"super-secret\"\n").unwrap();
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
