use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

impl LocalConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    pub owner: String,
    pub repository: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable holding the API token. Unset means anonymous.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_rate_limit_threshold")]
    pub rate_limit_threshold: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_rate_limit_threshold() -> u32 {
    10
}
fn default_per_page() -> u32 {
    100
}
fn default_max_pages() -> u32 {
    10
}

impl RemoteConfig {
    pub fn origin(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }
}

/// Cache and fetch tuning for the remote fetcher, decoupled from the TOML shape.
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub ttl: Duration,
    pub timeout: Duration,
    pub rate_limit_threshold: u32,
    pub max_pages: u32,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(default_ttl_secs()),
            timeout: Duration::from_secs(default_timeout_secs()),
            rate_limit_threshold: default_rate_limit_threshold(),
            max_pages: default_max_pages(),
        }
    }
}

impl From<&RemoteConfig> for FetcherSettings {
    fn from(cfg: &RemoteConfig) -> Self {
        Self {
            ttl: Duration::from_secs(cfg.ttl_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            rate_limit_threshold: cfg.rate_limit_threshold,
            max_pages: cfg.max_pages,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Candidates scoring below this are dropped.
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Minimum normalized Levenshtein similarity for a fuzzy match.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "default_max_query_len")]
    pub max_query_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_score: default_min_score(),
            fuzzy_threshold: default_fuzzy_threshold(),
            max_query_len: default_max_query_len(),
        }
    }
}

fn default_max_results() -> usize {
    20
}
fn default_min_score() -> f64 {
    0.1
}
fn default_fuzzy_threshold() -> f64 {
    0.6
}
fn default_max_query_len() -> usize {
    256
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if let Some(remote) = &config.remote {
        if remote.owner.trim().is_empty() || remote.repository.trim().is_empty() {
            anyhow::bail!("remote.owner and remote.repository must not be empty");
        }
        if remote.timeout_secs == 0 {
            anyhow::bail!("remote.timeout_secs must be > 0");
        }
        if remote.per_page == 0 || remote.per_page > 100 {
            anyhow::bail!("remote.per_page must be in [1, 100]");
        }
        if remote.max_pages == 0 {
            anyhow::bail!("remote.max_pages must be >= 1");
        }
    }

    if config.search.max_results == 0 {
        anyhow::bail!("search.max_results must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.search.min_score) {
        anyhow::bail!("search.min_score must be in [0.0, 1.0]");
    }
    if !(0.0..=1.0).contains(&config.search.fuzzy_threshold) {
        anyhow::bail!("search.fuzzy_threshold must be in [0.0, 1.0]");
    }

    Ok(())
}
