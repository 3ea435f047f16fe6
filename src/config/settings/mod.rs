#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::crawler::{CrawlScope, CrawlerConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// The documentation site to crawl when none is given on the command line
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    /// First page to fetch
    pub seed_url: Option<String>,
    /// Literal prefix every crawled URL must start with; defaults to the seed
    pub base_url: Option<String>,
    /// Substring a discovered link must contain; defaults to the base URL host
    pub domain: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid worker count: {0} (must be between 1 and 256)")]
    InvalidWorkerCount(usize),
    #[error("Invalid request timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry count: {0} (must be between 0 and 10)")]
    InvalidMaxRetries(u32),
    #[error("Invalid retry delay: {0}ms (must be at most 60000ms)")]
    InvalidRetryDelay(u64),
    #[error("Invalid dequeue timeout: {0}ms (must be between 1 and 60000ms)")]
    InvalidDequeueTimeout(u64),
    #[error("Invalid user agent: {0:?} (cannot be empty)")]
    InvalidUserAgent(String),
    #[error("Invalid domain: {0:?} (cannot be empty)")]
    InvalidDomain(String),
    #[error("No seed URL given and none configured in [site]")]
    MissingSeed,
}

impl Config {
    /// Default configuration directory, `~/.docs-crawler`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".docs-crawler"))
            .or_else(|| dirs::data_dir().map(|data| data.join("docs-crawler")))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.site.validate()?;
        validate_crawler(&self.crawler)
    }
}

impl SiteConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.seed_url, &self.base_url].into_iter().flatten() {
            check_site_url(url)?;
        }
        if let Some(domain) = &self.domain {
            if domain.trim().is_empty() {
                return Err(ConfigError::InvalidDomain(domain.clone()));
            }
        }
        Ok(())
    }

    /// Resolve the seed and scope, preferring explicit overrides.
    ///
    /// The base URL falls back to the seed, and the domain to the base URL's host.
    #[inline]
    pub fn resolve(
        &self,
        seed: Option<&str>,
        base_url: Option<&str>,
        domain: Option<&str>,
    ) -> Result<(String, CrawlScope), ConfigError> {
        let seed = seed
            .or(self.seed_url.as_deref())
            .ok_or(ConfigError::MissingSeed)?;
        check_site_url(seed)?;

        let base_url = base_url.or(self.base_url.as_deref()).unwrap_or(seed);
        let base = check_site_url(base_url)?;

        let scope = match domain.or(self.domain.as_deref()) {
            Some(domain) if domain.trim().is_empty() => {
                return Err(ConfigError::InvalidDomain(domain.to_string()));
            }
            Some(domain) => CrawlScope::new(base.as_str(), domain),
            None => CrawlScope::for_base_url(&base),
        };

        Ok((seed.to_string(), scope))
    }
}

fn check_site_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(url.to_string()));
    }
    Ok(parsed)
}

/// Range checks for crawler settings, shared by file and command line input
#[inline]
pub fn validate_crawler(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if !(1..=256).contains(&config.worker_count) {
        return Err(ConfigError::InvalidWorkerCount(config.worker_count));
    }

    if !(1..=300).contains(&config.timeout_seconds) {
        return Err(ConfigError::InvalidTimeout(config.timeout_seconds));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::InvalidMaxRetries(config.max_retries));
    }

    if config.retry_base_delay_ms > 60_000 {
        return Err(ConfigError::InvalidRetryDelay(config.retry_base_delay_ms));
    }

    if !(1..=60_000).contains(&config.dequeue_timeout_ms) {
        return Err(ConfigError::InvalidDequeueTimeout(
            config.dequeue_timeout_ms,
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::InvalidUserAgent(config.user_agent.clone()));
    }

    Ok(())
}
