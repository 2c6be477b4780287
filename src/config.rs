//! Configuration loader and validator for the portfolio content tools.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub content: Content,
    #[serde(default)]
    pub admin: Admin,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Explicit store URL; overrides `DATABASE_URL` and the data_dir default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

/// Publication GraphQL source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    pub endpoint: String,
    pub host: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Admin area settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Admin {
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,
}

impl Default for Admin {
    fn default() -> Self {
        Self {
            notice_ttl_ms: default_notice_ttl_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    8000
}

fn default_notice_ttl_ms() -> u64 {
    3000
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// `app.database_url`, then `DATABASE_URL`, then a SQLite file inside
    /// `app.data_dir`.
    pub fn database_url(&self) -> String {
        if let Some(url) = self.app.database_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return url.to_string();
        }
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/folio.db", self.app.data_dir))
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.content.endpoint)
            .map_err(|_| ConfigError::Invalid("content.endpoint must be a valid URL"))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.content.timeout_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.admin.notice_ttl_ms)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    let endpoint = cfg.endpoint_url()?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid("content.endpoint must use http or https"));
    }
    if cfg.content.timeout_ms == 0 {
        return Err(ConfigError::Invalid("content.timeout_ms must be > 0"));
    }
    // The host is interpolated into query text, so only plain host names pass.
    if !is_trusted_host(&cfg.content.host) {
        return Err(ConfigError::Invalid(
            "content.host must be a bare host name (letters, digits, '.', '-', optional :port)",
        ));
    }

    if cfg.admin.notice_ttl_ms == 0 {
        return Err(ConfigError::Invalid("admin.notice_ttl_ms must be > 0"));
    }

    Ok(())
}

fn is_trusted_host(host: &str) -> bool {
    let (name, port) = match host.split_once(':') {
        Some((name, port)) => (name, Some(port)),
        None => (host, None),
    };
    if name.is_empty() || name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
        return false;
    }
    let name_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let port_ok = port.map_or(true, |p| !p.is_empty() && p.parse::<u16>().is_ok());
    name_ok && port_ok
}

/// Returns a complete example YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

content:
  endpoint: "https://gql.hashnode.com"
  host: "blog.example.dev"
  timeout_ms: 8000

admin:
  notice_ttl_ms: 3000
"#
}
