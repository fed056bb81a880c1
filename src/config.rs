//! TOML configuration.
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below. See `config/kdocs.example.toml` for a complete file.

use anyhow::{bail, Context, Result};
use klipper_docs_core::search::SearchSettings;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Location used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/kdocs.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub repository: Option<RepositoryConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocsConfig {
    /// Markdown root. Ignored when `[repository]` is configured.
    #[serde(default = "default_docs_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            root: default_docs_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_docs_root() -> PathBuf {
    PathBuf::from("./docs")
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositoryConfig {
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Docs directory inside the checkout.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,
    #[serde(default = "default_shallow")]
    pub shallow: bool,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Background resync period for `kdocs serve`.
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
}

fn default_branch() -> String {
    "master".to_string()
}
fn default_docs_dir() -> String {
    "docs".to_string()
}
fn default_shallow() -> bool {
    true
}

impl RepositoryConfig {
    /// Checkout location: `cache_dir`, or `./data/repos/<hash of url>`.
    pub fn checkout_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from("./data/repos").join(short_hash(&self.url)),
        }
    }
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
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

pub fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())[..12].to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if given; otherwise the default location if it exists,
/// else built-in defaults.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate search
    if config.search.max_results < 1 {
        bail!("search.max_results must be >= 1");
    }
    if config.search.snippet_length < 20 {
        bail!("search.snippet_length must be >= 20");
    }
    if !config.search.min_score.is_finite() || config.search.min_score < 0.0 {
        bail!("search.min_score must be a non-negative number");
    }

    // Validate docs
    if config.docs.include_globs.is_empty() {
        bail!("docs.include_globs must not be empty");
    }

    // Validate repository
    if let Some(repo) = &config.repository {
        if repo.url.trim().is_empty() {
            bail!("repository.url must not be empty");
        }
        if repo.branch.trim().is_empty() {
            bail!("repository.branch must not be empty");
        }
        if let Some(secs) = repo.sync_interval_secs {
            if secs < 60 {
                bail!("repository.sync_interval_secs must be >= 60");
            }
        }
    }

    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    Ok(())
}
