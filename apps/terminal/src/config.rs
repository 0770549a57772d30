use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::anyhow;
use client_core::DEFAULT_GUESS_LIMIT;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "worldle.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub database_url: String,
    pub guess_limit: usize,
    pub resource_dir: PathBuf,
    pub http_timeout_seconds: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".into(),
            database_url: "sqlite://./data/worldle.db".into(),
            guess_limit: DEFAULT_GUESS_LIMIT,
            resource_dir: std::env::temp_dir().join("worldle"),
            http_timeout_seconds: None,
        }
    }
}

impl Settings {
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.guess_limit == 0 {
            return Err(anyhow!("guess_limit must be at least 1"));
        }
        if self.api_url.trim().is_empty() {
            return Err(anyhow!("api_url must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    database_url: Option<String>,
    guess_limit: Option<usize>,
    resource_dir: Option<PathBuf>,
    http_timeout_seconds: Option<u64>,
}

/// Defaults, then the config file (if readable), then environment.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let raw = fs::read_to_string(path).ok();
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

pub fn load_settings_from(raw_file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.api_url {
                    settings.api_url = v;
                }
                if let Some(v) = file_cfg.database_url {
                    settings.database_url = v;
                }
                if let Some(v) = file_cfg.guess_limit {
                    settings.guess_limit = v;
                }
                if let Some(v) = file_cfg.resource_dir {
                    settings.resource_dir = v;
                }
                if let Some(v) = file_cfg.http_timeout_seconds {
                    settings.http_timeout_seconds = Some(v);
                }
            }
            Err(err) => warn!("config: ignoring unparsable config file: {err}"),
        }
    }

    if let Some(v) = env("WORLDLE_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("WORLDLE_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__GUESS_LIMIT") {
        match v.parse::<usize>() {
            Ok(parsed) => settings.guess_limit = parsed,
            Err(_) => warn!("config: ignoring invalid APP__GUESS_LIMIT={v}"),
        }
    }

    if let Some(v) = env("APP__RESOURCE_DIR") {
        settings.resource_dir = PathBuf::from(v);
    }

    if let Some(v) = env("APP__HTTP_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.http_timeout_seconds = Some(parsed);
        }
    }

    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
