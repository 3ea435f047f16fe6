use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::config::settings::validate_crawler;
use crate::crawler::{CrawlReport, Document, SiteCrawler, SkippedPage};

/// Command line overrides for a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    pub url: Option<String>,
    pub base_url: Option<String>,
    pub domain: Option<String>,
    pub workers: Option<usize>,
    pub json: bool,
    pub output: Option<PathBuf>,
}

/// Hand-off format for the chunking and embedding stages
#[derive(Debug, Serialize)]
pub struct CrawlOutput<'a> {
    pub documents: &'a [Document],
    pub skipped: &'a [SkippedPage],
    pub total_urls: usize,
    pub cancelled: bool,
}

/// Crawl a documentation site and report what was collected
#[inline]
pub async fn crawl_site(config: &Config, options: CrawlOptions) -> Result<CrawlReport> {
    let (seed, scope) = config
        .site
        .resolve(
            options.url.as_deref(),
            options.base_url.as_deref(),
            options.domain.as_deref(),
        )
        .context("Failed to determine which site to crawl")?;

    let mut crawler_config = config.crawler.clone();
    if let Some(workers) = options.workers {
        crawler_config.worker_count = workers;
        validate_crawler(&crawler_config).context("Invalid --workers value")?;
    }
    let crawler = SiteCrawler::new(crawler_config)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping crawl");
            interrupt.cancel();
        }
    });

    let result = crawler.crawl_with_cancellation(&seed, &scope, cancel).await;
    ctrl_c.abort();
    let report = result?;

    print_summary(&report);

    if options.json || options.output.is_some() {
        let json = render_json(&report)?;
        match &options.output {
            Some(path) => {
                fs::write(path, json)
                    .with_context(|| format!("Failed to write output file: {}", path.display()))?;
                info!("Wrote {} documents to {}", report.documents.len(), path.display());
            }
            None => println!("{}", json),
        }
    }

    Ok(report)
}

/// Serialize the documents and skipped pages of a report
#[inline]
pub fn render_json(report: &CrawlReport) -> Result<String> {
    let output = CrawlOutput {
        documents: &report.documents,
        skipped: &report.skipped,
        total_urls: report.stats.total_urls,
        cancelled: report.cancelled,
    };
    serde_json::to_string_pretty(&output).context("Failed to serialize crawl output")
}

fn print_summary(report: &CrawlReport) {
    let stats = &report.stats;
    if report.cancelled {
        eprintln!("{}", style("Crawl cancelled, partial results:").bold().yellow());
    } else {
        eprintln!("{}", style("Crawl completed").bold().green());
    }
    eprintln!("  Documents collected: {}", style(stats.successful_crawls).cyan());
    eprintln!("  Pages skipped: {}", style(stats.skipped_pages).cyan());
    eprintln!("  Total URLs discovered: {}", style(stats.total_urls).cyan());
    eprintln!("  Workers: {}", stats.workers);
    eprintln!("  Duration: {:?}", stats.duration);
}

/// Print the active configuration
#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Site:").bold().yellow());
    eprintln!("  Seed URL: {}", styled_setting(config.site.seed_url.as_deref()));
    eprintln!("  Base URL: {}", styled_setting(config.site.base_url.as_deref()));
    eprintln!("  Domain: {}", styled_setting(config.site.domain.as_deref()));

    let crawler = &config.crawler;
    eprintln!();
    eprintln!("{}", style("Crawler:").bold().yellow());
    eprintln!("  Workers: {}", style(crawler.worker_count).cyan());
    eprintln!("  Timeout: {}s", style(crawler.timeout_seconds).cyan());
    eprintln!(
        "  Retries: {} (base delay {}ms)",
        style(crawler.max_retries).cyan(),
        style(crawler.retry_base_delay_ms).cyan()
    );
    eprintln!("  User Agent: {}", style(&crawler.user_agent).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn styled_setting(value: Option<&str>) -> console::StyledObject<&str> {
    match value {
        Some(value) => style(value).cyan(),
        None => style("(not set)").dim(),
    }
}

/// Write a default configuration file unless one already exists
#[inline]
pub fn init_config(config_dir: &Path) -> Result<PathBuf> {
    let config = Config {
        base_dir: config_dir.to_path_buf(),
        ..Config::default()
    };
    let path = config.config_file_path();

    if path.exists() {
        eprintln!(
            "{}",
            style(format!("Configuration already exists: {}", path.display())).yellow()
        );
        return Ok(path);
    }

    config.save()?;
    eprintln!(
        "{}",
        style(format!("Wrote default configuration to {}", path.display())).green()
    );
    Ok(path)
}
