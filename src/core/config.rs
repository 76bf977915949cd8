use super::error::Error;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const FETCH_URL_ENV: &str = "EXCHANGE_RATE_API_URL";
pub const SERVE_URL_ENV: &str = "EXTERNAL_API_URL";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub api_url: Option<String>,
    pub timeout_ms: u64,
    pub output_path: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            api_url: None,
            timeout_ms: 300,
            output_path: PathBuf::from("exchange_rate.txt"),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServeConfig {
    pub api_url: Option<String>,
    pub bind: String,
    pub database_path: PathBuf,
    pub fetch_timeout_ms: u64,
    pub persist_timeout_ms: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            api_url: None,
            bind: "0.0.0.0:8080".to_string(),
            database_path: PathBuf::from("./database.db"),
            fetch_timeout_ms: 200,
            persist_timeout_ms: 10,
        }
    }
}

impl ServeConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

impl AppConfig {
    /// Loads the config file at `path`, or the default location when it
    /// exists, falling back to built-in defaults. Environment overrides are
    /// applied last.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from_path(&default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "xrate", "xrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(FETCH_URL_ENV) {
            self.fetch.api_url = Some(url);
        }
        if let Some(url) = lookup(SERVE_URL_ENV) {
            self.serve.api_url = Some(url);
        }
    }

    pub fn require_fetch_url(&self) -> Result<&str, Error> {
        require(self.fetch.api_url.as_deref(), FETCH_URL_ENV)
    }

    pub fn require_serve_url(&self) -> Result<&str, Error> {
        require(self.serve.api_url.as_deref(), SERVE_URL_ENV)
    }
}

fn require<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, Error> {
    match value.map(str::trim) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(Error::ConfigMissing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
fetch:
  api_url: "http://example.com/last/USD"
  timeout_ms: 500
serve:
  api_url: "http://example.com/json/last/USD-BRL"
  bind: "127.0.0.1:9090"
  database_path: "/tmp/rates.db"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(
            config.fetch.api_url.as_deref(),
            Some("http://example.com/last/USD")
        );
        assert_eq!(config.fetch.timeout(), Duration::from_millis(500));
        assert_eq!(config.fetch.output_path, PathBuf::from("exchange_rate.txt"));
        assert_eq!(config.serve.bind, "127.0.0.1:9090");
        assert_eq!(config.serve.database_path, PathBuf::from("/tmp/rates.db"));
        assert_eq!(config.serve.fetch_timeout(), Duration::from_millis(200));
        assert_eq!(config.serve.persist_timeout(), Duration::from_millis(10));
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert!(config.fetch.api_url.is_none());
        assert_eq!(config.fetch.timeout(), Duration::from_millis(300));
        assert_eq!(config.serve.bind, "0.0.0.0:8080");
        assert_eq!(config.serve.database_path, PathBuf::from("./database.db"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config: AppConfig =
            serde_yaml::from_str("fetch:\n  api_url: \"http://file\"\n").unwrap();
        config.apply_env(|key| match key {
            FETCH_URL_ENV => Some("http://env/fetch".to_string()),
            SERVE_URL_ENV => Some("http://env/serve".to_string()),
            _ => None,
        });
        assert_eq!(config.require_fetch_url().unwrap(), "http://env/fetch");
        assert_eq!(config.require_serve_url().unwrap(), "http://env/serve");
    }

    #[test]
    fn test_missing_urls_are_reported_by_env_name() {
        let mut config = AppConfig::default();
        config.apply_env(|_| None);

        match config.require_fetch_url() {
            Err(Error::ConfigMissing(name)) => assert_eq!(name, FETCH_URL_ENV),
            other => panic!("Expected ConfigMissing, got {other:?}"),
        }
        match config.require_serve_url() {
            Err(Error::ConfigMissing(name)) => assert_eq!(name, SERVE_URL_ENV),
            other => panic!("Expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_url_counts_as_missing() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == SERVE_URL_ENV).then(|| "   ".to_string()));
        assert!(matches!(
            config.require_serve_url(),
            Err(Error::ConfigMissing(SERVE_URL_ENV))
        ));
    }
}
