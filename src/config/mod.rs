// Configuration management module

pub mod settings;

pub use settings::{Config, ConfigError, SiteConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
