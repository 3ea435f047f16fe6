use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.site, SiteConfig::default());
    assert_eq!(config.crawler.worker_count, 10);
    assert_eq!(config.crawler.timeout_seconds, 10);
    assert_eq!(config.crawler.max_retries, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid = config.clone();
    invalid.crawler.worker_count = 0;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidWorkerCount(0))
    ));

    let mut invalid = config.clone();
    invalid.crawler.worker_count = 257;
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.crawler.timeout_seconds = 0;
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidTimeout(0))));

    let mut invalid = config.clone();
    invalid.crawler.max_retries = 11;
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.crawler.retry_base_delay_ms = 60_001;
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.crawler.dequeue_timeout_ms = 0;
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.crawler.user_agent = "  ".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.site.seed_url = Some("ftp://example.com/docs/".to_string());
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidUrl(_))));

    let mut invalid = config;
    invalid.site.domain = Some(String::new());
    assert!(invalid.validate().is_err());
}

#[test]
fn load_missing_config_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing config should load");

    assert_eq!(config.crawler, CrawlerConfig::default());
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.config_file_path(), temp_dir.path().join("config.toml"));
}

#[test]
fn save_then_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_dir = temp_dir.path().join(".docs-crawler");

    let mut config = Config {
        base_dir: config_dir.clone(),
        ..Config::default()
    };
    config.site.seed_url = Some("https://launchdarkly.com/docs/".to_string());
    config.site.domain = Some("launchdarkly.com".to_string());
    config.crawler.worker_count = 4;
    config.crawler.extraction.include_footer = false;

    config.save().expect("config should save");
    assert!(config_dir.join("config.toml").exists());

    let loaded = Config::load(&config_dir).expect("saved config should load");
    assert_eq!(loaded, config);
}

#[test]
fn partial_file_fills_in_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        r#"
            [site]
            seed_url = "https://example.com/docs/"

            [crawler]
            worker_count = 2
        "#,
    )
    .expect("should write config file");

    let config = Config::load(temp_dir.path()).expect("config should load");

    assert_eq!(
        config.site.seed_url.as_deref(),
        Some("https://example.com/docs/")
    );
    assert_eq!(config.crawler.worker_count, 2);
    assert_eq!(config.crawler.max_retries, 3);
    assert!(config.crawler.extraction.preserve_code_blocks);
}

#[test]
fn invalid_files_are_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("config.toml");

    fs::write(&path, "[crawler\nworker_count = 2").expect("should write config file");
    assert!(Config::load(temp_dir.path()).is_err());

    fs::write(&path, "[crawler]\nworker_count = 0\n").expect("should write config file");
    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn resolve_prefers_explicit_arguments() {
    let site = SiteConfig {
        seed_url: Some("https://launchdarkly.com/docs/".to_string()),
        base_url: None,
        domain: Some("launchdarkly.com".to_string()),
    };

    let (seed, scope) = site
        .resolve(None, None, None)
        .expect("configured site should resolve");
    assert_eq!(seed, "https://launchdarkly.com/docs/");
    assert_eq!(
        scope,
        CrawlScope::new("https://launchdarkly.com/docs/", "launchdarkly.com")
    );

    let (seed, scope) = site
        .resolve(
            Some("https://example.com/guide/start"),
            Some("https://example.com/guide/"),
            None,
        )
        .expect("explicit site should resolve");
    assert_eq!(seed, "https://example.com/guide/start");
    assert_eq!(scope.base_url, "https://example.com/guide/");
    assert_eq!(scope.domain, "launchdarkly.com");
}

#[test]
fn resolve_derives_scope_from_seed() {
    let (_, scope) = SiteConfig::default()
        .resolve(Some("https://docs.example.com/v2/"), None, None)
        .expect("seed should resolve");

    assert_eq!(scope.base_url, "https://docs.example.com/v2/");
    assert_eq!(scope.domain, "docs.example.com");
}

#[test]
fn resolve_without_seed_fails() {
    assert!(matches!(
        SiteConfig::default().resolve(None, None, None),
        Err(ConfigError::MissingSeed)
    ));
    assert!(matches!(
        SiteConfig::default().resolve(Some("not a url"), None, None),
        Err(ConfigError::InvalidUrl(_))
    ));
}
