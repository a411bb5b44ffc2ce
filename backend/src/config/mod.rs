//! Application configuration management

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use url::Url;

use crate::query::binder::{DEFAULT_MAX_SIZE, DEFAULT_PAGE_SIZE, PagingPolicy};
use crate::repository::ElasticsearchConfig;

/// Which repository implementation serves queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    Elasticsearch,
    /// Fixture records loaded from `FIXTURES_PATH`
    Memory,
}

impl FromStr for SearchBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "elasticsearch" | "es" => Ok(SearchBackend::Elasticsearch),
            "memory" | "fixtures" => Ok(SearchBackend::Memory),
            other => bail!("unknown search backend `{other}` (expected elasticsearch or memory)"),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    pub backend: SearchBackend,

    /// Elasticsearch base URL
    pub elasticsearch_url: Url,

    pub elasticsearch_username: Option<String>,

    pub elasticsearch_password: Option<String>,

    pub user_index: String,

    pub department_index: String,

    /// Fixture file for the memory backend
    pub fixtures_path: Option<PathBuf>,

    /// Limit for each individual backend call
    pub backend_timeout: Duration,

    /// Page size used when a request gives none
    pub default_page_size: u32,

    /// Upper bound for page sizes; also the size for `size: 0`
    pub max_page_size: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            port: var("PORT", "8080").parse().context("Invalid PORT")?,

            backend: var("SEARCH_BACKEND", "elasticsearch")
                .parse()
                .context("Invalid SEARCH_BACKEND")?,

            elasticsearch_url: Url::parse(&var("ELASTICSEARCH_URL", "http://localhost:9200"))
                .context("Invalid ELASTICSEARCH_URL")?,

            elasticsearch_username: non_empty("ELASTICSEARCH_USERNAME"),

            elasticsearch_password: non_empty("ELASTICSEARCH_PASSWORD"),

            user_index: var("USER_INDEX", "user"),

            department_index: var("DEPARTMENT_INDEX", "department"),

            fixtures_path: non_empty("FIXTURES_PATH").map(PathBuf::from),

            backend_timeout: Duration::from_millis(
                var("BACKEND_TIMEOUT_MS", "5000")
                    .parse()
                    .context("Invalid BACKEND_TIMEOUT_MS")?,
            ),

            default_page_size: var("DEFAULT_PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string())
                .parse()
                .context("Invalid DEFAULT_PAGE_SIZE")?,

            max_page_size: var("MAX_PAGE_SIZE", &DEFAULT_MAX_SIZE.to_string())
                .parse()
                .context("Invalid MAX_PAGE_SIZE")?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_size == 0 {
            bail!("MAX_PAGE_SIZE must be at least 1");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            bail!(
                "DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE ({})",
                self.max_page_size
            );
        }
        if self.backend == SearchBackend::Memory && self.fixtures_path.is_none() {
            bail!("FIXTURES_PATH is required for the memory search backend");
        }
        Ok(())
    }

    pub fn paging(&self) -> PagingPolicy {
        PagingPolicy {
            default_size: self.default_page_size,
            max_size: self.max_page_size,
        }
    }

    pub fn elasticsearch(&self) -> ElasticsearchConfig {
        ElasticsearchConfig {
            url: self.elasticsearch_url.clone(),
            username: self.elasticsearch_username.clone(),
            password: self.elasticsearch_password.clone(),
            user_index: self.user_index.clone(),
            department_index: self.department_index.clone(),
            timeout: self.backend_timeout,
        }
    }
}
