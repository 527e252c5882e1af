// src/config.rs
//! Invocation configuration. Loaded once per run from TOML with env
//! overrides; the process is a short-lived batch job, so there is no hot
//! reload and no mutable global.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";
pub const ENV_CONFIG_PATH: &str = "MACRONEWS_CONFIG";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            backend: Backend::Sqlite,
            url: "news.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub enqueue_limit: u32,
    pub process_limit: u32,
    pub max_attempts: u32,
    /// A `processing` entry older than this is treated as an implicit failure.
    pub stale_after_secs: u64,
    pub rewrite_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            enqueue_limit: 20,
            process_limit: 10,
            max_attempts: 3,
            stale_after_secs: 900,
            rewrite_timeout_secs: 60,
        }
    }
}

impl QueueConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
    pub fn rewrite_timeout(&self) -> Duration {
        Duration::from_secs(self.rewrite_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            request_timeout_secs: 15,
            user_agent: "macronews/0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub fetch: FetchSettings,
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config toml {}", path.display()))?;
        Ok(cfg.with_env_overrides())
    }

    /// Load using env var + fallback:
    /// 1) $MACRONEWS_CONFIG
    /// 2) config/app.toml
    /// 3) built-in defaults (local SQLite)
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load_from(&PathBuf::from(p));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(AppConfig::default().with_env_overrides())
    }

    /// DATABASE_URL wins over the file; the backend is inferred from the
    /// URL scheme, matching how the deployment environments are wired.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_DATABASE_URL) {
            self.database.backend = if url.starts_with("postgres://") || url.starts_with("postgresql://") {
                Backend::Postgres
            } else {
                Backend::Sqlite
            };
            self.database.url = url;
        }
        self
    }
}
