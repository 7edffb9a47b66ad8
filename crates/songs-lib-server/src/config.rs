//! Configuration loading and parsing.
//!
//! Defines the server config schema and resolves defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_PAGE_SIZE_LIMIT: u32 = 20;
const DEFAULT_TIMEOUT_SECS: u64 = 4;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Top-level server configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Deployment environment: `local`, `dev` or `prod`.
    pub env: Option<String>,
    /// Bind address (host:port).
    pub bind: Option<String>,
    /// SQLite database file.
    pub db_path: Option<String>,
    /// Base URL of the song info lookup API.
    pub external_api: Option<String>,
    /// Default and maximum page size for song listings.
    pub page_size_limit: Option<u32>,
    /// Outbound request timeout and server client request timeout, in seconds.
    pub timeout_secs: Option<u64>,
    /// Keep-alive timeout for idle connections, in seconds.
    pub idle_timeout_secs: Option<u64>,
    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: Option<u64>,
    /// Basic auth credentials for mutating routes.
    pub auth: Option<AuthConfig>,
}

/// Credentials for HTTP Basic auth.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub user: String,
    pub password: String,
}

impl ServerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<ServerConfig>(raw)?)
    }

    pub fn env(&self) -> &str {
        self.env
            .as_deref()
            .map(str::trim)
            .filter(|env| !env.is_empty())
            .unwrap_or(DEFAULT_ENV)
    }

    pub fn page_size_limit(&self) -> Result<u32> {
        match self.page_size_limit {
            Some(0) => Err(anyhow::anyhow!("page_size_limit must be greater than zero")),
            Some(limit) => Ok(limit),
            None => Ok(DEFAULT_PAGE_SIZE_LIMIT),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS))
    }

    pub fn shutdown_grace_secs(&self) -> u64 {
        self.shutdown_grace_secs.unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS)
    }
}

/// Default log filter for an environment name.
///
/// `local` and `dev` log at debug, everything else at info.
pub fn log_filter_for_env(env: &str) -> &'static str {
    match env {
        "local" | "dev" => "debug,actix_web=info,actix_server=info",
        _ => "info",
    }
}

/// Parse the bind address from config, falling back to the default.
pub fn bind_from_config(cfg: &ServerConfig) -> Result<SocketAddr> {
    let bind = cfg.bind.as_deref().unwrap_or(DEFAULT_BIND);
    bind.parse().with_context(|| format!("parse bind {bind}"))
}

/// Extract the database path from config.
pub fn db_path_from_config(cfg: &ServerConfig) -> Result<PathBuf> {
    cfg.db_path
        .as_deref()
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("db_path is required in config"))
}

/// Extract the lookup API base URL without a trailing slash.
pub fn external_api_from_config(cfg: &ServerConfig) -> Result<String> {
    cfg.external_api
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| url.trim_end_matches('/').to_string())
        .ok_or_else(|| anyhow::anyhow!("external_api is required in config"))
}
