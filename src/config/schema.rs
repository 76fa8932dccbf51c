use serde::{Deserialize, Serialize};

/// Default Local REST API ports.
pub const HTTPS_PORT: u16 = 27124;
pub const HTTP_PORT: u16 = 27123;

/// Errors raised while building the configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("OBSIDIAN_API_KEY environment variable is required")]
    MissingApiKey,
    #[error("Invalid OBSIDIAN_PORT value: {0}")]
    InvalidPort(String),
}

/// Server configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub api_key: String,
    #[serde(default)]
    pub use_http: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Configuration with every optional setting at its default.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            use_http: false,
            host: default_host(),
            port: None,
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OBSIDIAN_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);
        config.use_http = lookup("OBSIDIAN_USE_HTTP").as_deref() == Some("true");

        if let Some(host) = lookup("OBSIDIAN_HOST").filter(|h| !h.is_empty()) {
            config.host = host;
        }
        if let Some(port) = lookup("OBSIDIAN_PORT").filter(|p| !p.is_empty()) {
            config.port = Some(
                port.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidPort(port.clone()))?,
            );
        }
        if let Some(level) = lookup("OBSIDIAN_MCP_LOG_LEVEL").filter(|l| !l.is_empty()) {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Base URL of the Local REST API, without a trailing slash.
    pub fn base_url(&self) -> String {
        let (scheme, default_port) = if self.use_http {
            ("http", HTTP_PORT)
        } else {
            ("https", HTTPS_PORT)
        };
        format!("{}://{}:{}", scheme, self.host, self.port.unwrap_or(default_port))
    }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_log_level() -> String { "info".into() }
fn default_request_timeout_secs() -> u64 { 30 }
