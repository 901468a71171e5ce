//! `vitrine.toml` loading
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! working configuration backed by the in-memory store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "vitrine.toml";

/// Environment variable consulted when `store.api_key` is not set.
pub const API_KEY_ENV: &str = "VITRINE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process tables, filled from a fixture
    #[default]
    Memory,
    /// PostgREST-style HTTP API
    Rest,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,

    /// Base URL of the REST API. Required for `kind = "rest"`.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds; unset means no client timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Stylesheets handed to the sandbox with every bundle.
    #[serde(default = "default_stylesheets")]
    pub stylesheets: Vec<String>,
}

fn default_stylesheets() -> Vec<String> {
    vec!["https://cdn.tailwindcss.com".to_string()]
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            stylesheets: default_stylesheets(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

const fn default_page_size() -> usize {
    vitrine_registry::catalog::DEFAULT_PAGE_SIZE
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitrineConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub preview: PreviewConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl VitrineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: VitrineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or `./vitrine.toml` when present, or the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let local = PathBuf::from(CONFIG_FILE_NAME);
                if local.exists() {
                    Self::load(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.kind == StoreKind::Rest {
            match self.store.url.as_deref() {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(url) => {
                    return Err(ConfigError::ValidationError(format!(
                        "store.url must be an http(s) URL, got '{}'",
                        url
                    )))
                }
                None => {
                    return Err(ConfigError::ValidationError(
                        "store.url is required when store.kind = \"rest\"".to_string(),
                    ))
                }
            }
        }

        if self.catalog.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "catalog.page_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch.timeout_secs.map(Duration::from_secs)
    }

    /// The configured API key, falling back to `VITRINE_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.store
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
    }
}
