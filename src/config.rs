//! TOML configuration.
//!
//! Every section has defaults, so a config file only needs the keys it
//! changes. Secrets never live here: API keys, the GitHub token and the
//! Ollama endpoint are read from the environment (see
//! [`Credentials`](crate::llm::Credentials) and [`GitHubConfig::token`]).
//!
//! ```toml
//! [db]
//! path = "./data/lens.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//!
//! [github]
//! api_base = "https://api.github.com"
//! per_page = 100
//!
//! [llm]
//! timeout_secs = 30
//! max_attempts = 3
//! initial_backoff_ms = 2000
//! max_backoff_ms = 16000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/lens.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// Settings for the GitHub issues client.
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    /// REST API root. Overridable for GitHub Enterprise or local stubs.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Issues requested per page (GitHub caps this at 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_github_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            per_page: default_per_page(),
            timeout_secs: default_github_timeout_secs(),
        }
    }
}

impl GitHubConfig {
    /// Personal access token from `GITHUB_TOKEN`, if set and non-empty.
    ///
    /// Unauthenticated requests work for public repositories but are
    /// limited to 60 requests per hour.
    pub fn token(&self) -> Option<String> {
        std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty())
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_per_page() -> u32 {
    100
}
fn default_github_timeout_secs() -> u64 {
    30
}

/// Request and retry settings shared by every remote generation backend.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per network call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_llm_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_llm_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    2_000
}
fn default_max_backoff_ms() -> u64 {
    16_000
}

impl Config {
    /// Configuration with every section at its default.
    ///
    /// Used when no config file exists, so `lens` works out of the box.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig::default(),
            server: ServerConfig::default(),
            github: GitHubConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.github.per_page == 0 || config.github.per_page > 100 {
        anyhow::bail!("github.per_page must be in [1, 100]");
    }

    if config.llm.max_attempts == 0 {
        anyhow::bail!("llm.max_attempts must be >= 1");
    }

    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    if config.llm.initial_backoff_ms > config.llm.max_backoff_ms {
        anyhow::bail!("llm.initial_backoff_ms must not exceed llm.max_backoff_ms");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.db.path, PathBuf::from("./data/lens.sqlite"));
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.llm.max_attempts, 3);
        assert_eq!(config.llm.initial_backoff_ms, 2_000);
        assert_eq!(config.llm.max_backoff_ms, 16_000);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[llm]\nmax_attempts = 5\n").unwrap();
        assert_eq!(config.llm.max_attempts, 5);
        assert_eq!(config.llm.timeout_secs, 30);
    }

    #[test]
    fn test_load_rejects_bad_per_page() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[github]\nper_page = 500\n").unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("per_page"));
    }

    #[test]
    fn test_load_rejects_inverted_backoff() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[llm]\ninitial_backoff_ms = 5000\nmax_backoff_ms = 100\n",
        )
        .unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/lens.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
