pub mod extractor;
pub mod fetcher;
pub mod frontier;


use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use self::extractor::{ContentExtractor, ExtractionConfig, HtmlExtractor};
use self::fetcher::{FetchOutcome, HttpClient, PageFetcher};
use self::frontier::{Dequeued, Frontier};
use crate::{DocsError, Result};

pub use self::frontier::{Admission, CrawlScope};

/// Configuration for the web crawler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User agent string to use for requests
    pub user_agent: String,
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Maximum number of retry attempts for retryable errors
    pub max_retries: u32,
    /// First backoff delay in milliseconds, doubled on every retry
    pub retry_base_delay_ms: u64,
    /// Number of parallel workers
    pub worker_count: usize,
    /// How long an idle worker waits for work before re-checking shutdown
    pub dequeue_timeout_ms: u64,
    /// Configuration for text extraction
    pub extraction: ExtractionConfig,
}

impl Default for CrawlerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            user_agent: "docs-crawler/0.1.0 (Documentation Indexer)".to_string(),
            timeout_seconds: 10,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            worker_count: 10,
            dequeue_timeout_ms: 1000,
            extraction: ExtractionConfig::default(),
        }
    }
}

/// Extracted text of one page, ready for chunking and embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub content: String,
    pub source: Url,
}

/// Why a fetched URL produced no document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Status(u16),
    Fetch(String),
    Extraction(String),
    NoContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPage {
    pub url: Url,
    pub reason: SkipReason,
}

/// Terminal state of a URL after it left the in-flight state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Succeeded(Document),
    SkippedStatus(u16),
    SkippedError(String),
    SkippedExtraction(String),
    Empty,
}

/// Statistics about a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlStats {
    /// URLs admitted to the frontier
    pub total_urls: usize,
    /// Pages that produced a document
    pub successful_crawls: usize,
    /// Pages fetched or attempted without producing a document
    pub skipped_pages: usize,
    /// Number of workers that ran
    pub workers: usize,
    /// Duration of crawl session
    pub duration: Duration,
}

/// Everything a crawl produced
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Documents in completion order, which is not deterministic
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedPage>,
    pub stats: CrawlStats,
    /// Set when the crawl was stopped before the frontier drained
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct CrawlResults {
    documents: Vec<Document>,
    skipped: Vec<SkippedPage>,
}

/// Validate and normalize a URL
#[inline]
pub fn validate_url(url_str: &str) -> anyhow::Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}

/// Crawl `seed` with default settings and `worker_count` workers
#[inline]
pub async fn crawl(seed: &str, scope: &CrawlScope, worker_count: usize) -> Result<Vec<Document>> {
    let config = CrawlerConfig {
        worker_count,
        ..CrawlerConfig::default()
    };
    let report = SiteCrawler::new(config)?.crawl(seed, scope).await?;
    Ok(report.documents)
}

/// Worker pool that crawls one site
pub struct SiteCrawler {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    config: CrawlerConfig,
}

impl SiteCrawler {
    /// Create a crawler backed by the HTTP client and HTML extractor
    #[inline]
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let fetcher = Arc::new(HttpClient::new(&config));
        let extractor = Arc::new(HtmlExtractor::new(config.extraction.clone()));
        Self::with_components(config, fetcher, extractor)
    }

    /// Create a crawler with custom collaborators
    #[inline]
    pub fn with_components(
        config: CrawlerConfig,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Result<Self> {
        check_config(&config)?;
        Ok(Self {
            fetcher,
            extractor,
            config,
        })
    }

    /// Crawl everything reachable from `seed` within `scope`
    #[inline]
    pub async fn crawl(&self, seed: &str, scope: &CrawlScope) -> Result<CrawlReport> {
        self.crawl_with_cancellation(seed, scope, CancellationToken::new())
            .await
    }

    /// Crawl until the frontier drains or `cancel` fires.
    ///
    /// Returns once every worker has exited. A cancelled crawl returns what
    /// was collected so far.
    #[inline]
    pub async fn crawl_with_cancellation(
        &self,
        seed: &str,
        scope: &CrawlScope,
        cancel: CancellationToken,
    ) -> Result<CrawlReport> {
        let start_time = Instant::now();
        let seed = validate_url(seed).map_err(|e| DocsError::Crawler(format!("{:#}", e)))?;

        info!(
            "Starting crawl at {} with {} workers (base {}, domain {})",
            seed, self.config.worker_count, scope.base_url, scope.domain
        );

        let frontier = Frontier::new(scope.clone());
        if !frontier.try_enqueue(seed.clone()).await.is_admitted() {
            warn!("Seed {} is outside {}, nothing to crawl", seed, scope.base_url);
            return Ok(CrawlReport {
                stats: CrawlStats {
                    duration: start_time.elapsed(),
                    ..CrawlStats::default()
                },
                ..CrawlReport::default()
            });
        }

        let progress = progress_bar();
        let shared = Arc::new(WorkerShared {
            frontier,
            results: Mutex::new(CrawlResults::default()),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            cancel: cancel.clone(),
            progress: progress.clone(),
            dequeue_timeout: Duration::from_millis(self.config.dequeue_timeout_ms),
        });

        let mut workers = JoinSet::new();
        for id in 0..self.config.worker_count {
            workers.spawn(run_worker(id, Arc::clone(&shared)));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Crawl worker failed: {}", e);
            }
        }
        progress.finish_and_clear();

        let total_urls = shared.frontier.visited_count().await;
        let cancelled = cancel.is_cancelled() && shared.frontier.outstanding().await > 0;
        let results = std::mem::take(&mut *shared.results.lock().await);

        let stats = CrawlStats {
            total_urls,
            successful_crawls: results.documents.len(),
            skipped_pages: results.skipped.len(),
            workers: self.config.worker_count,
            duration: start_time.elapsed(),
        };

        info!(
            "Crawl finished: {} documents, {} skipped, {} URLs discovered, took {:?}{}",
            stats.successful_crawls,
            stats.skipped_pages,
            stats.total_urls,
            stats.duration,
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(CrawlReport {
            documents: results.documents,
            skipped: results.skipped,
            stats,
            cancelled,
        })
    }
}

fn check_config(config: &CrawlerConfig) -> Result<()> {
    if config.worker_count == 0 {
        return Err(DocsError::Config(
            "worker_count must be at least 1".to_string(),
        ));
    }
    if config.dequeue_timeout_ms == 0 {
        return Err(DocsError::Config(
            "dequeue_timeout_ms must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn progress_bar() -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }
    match ProgressStyle::with_template("{spinner} [{pos}/{len}] Crawling {msg}") {
        Ok(style) => ProgressBar::new(1).with_style(style),
        Err(_) => ProgressBar::hidden(),
    }
}

/// State shared by every worker of one crawl
struct WorkerShared {
    frontier: Frontier,
    results: Mutex<CrawlResults>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    cancel: CancellationToken,
    progress: ProgressBar,
    dequeue_timeout: Duration,
}

async fn run_worker(id: usize, shared: Arc<WorkerShared>) {
    debug!("Worker {} started", id);

    loop {
        let next = tokio::select! {
            biased;
            () = shared.cancel.cancelled() => break,
            next = shared.frontier.dequeue(shared.dequeue_timeout) => next,
        };

        let url = match next {
            Dequeued::Url(url) => url,
            Dequeued::Idle => continue,
            Dequeued::Drained => break,
        };

        // Each page runs in its own task so a panic is contained to that page
        // and the outstanding count still reaches zero.
        let page_task = {
            let shared = Arc::clone(&shared);
            let url = url.clone();
            tokio::spawn(async move { shared.process_page(&url).await })
        };
        let abort = page_task.abort_handle();

        let outcome = tokio::select! {
            biased;
            () = shared.cancel.cancelled() => {
                abort.abort();
                debug!("Worker {} abandoned {}", id, url);
                break;
            }
            joined = page_task => joined.unwrap_or_else(|e| {
                error!("Processing {} failed: {}", url, e);
                PageOutcome::SkippedError(format!("page task failed: {}", e))
            }),
        };

        shared.record(&url, outcome).await;
        shared.frontier.done(&url).await;
        shared.progress.inc(1);
    }

    debug!("Worker {} stopped", id);
}

impl WorkerShared {
    /// Fetch and extract one page, offering its links to the frontier
    async fn process_page(&self, url: &Url) -> PageOutcome {
        let depth = self.frontier.queue_len().await;
        info!("[queue: {}] Fetching {}", depth, url);
        self.progress.set_message(url.to_string());

        let html = match self.fetcher.fetch(url).await {
            FetchOutcome::Page(html) => html,
            FetchOutcome::Status(status) => return PageOutcome::SkippedStatus(status),
            FetchOutcome::Failed(e) => return PageOutcome::SkippedError(e.to_string()),
        };

        let page = match self.extractor.extract(&html, url) {
            Ok(page) => page,
            Err(e) => return PageOutcome::SkippedExtraction(e.to_string()),
        };

        let scope = self.frontier.scope();
        for link in page.links {
            if !scope.admits_link(link.as_str()) {
                continue;
            }
            if self.frontier.try_enqueue(link).await.is_admitted() {
                self.progress.inc_length(1);
            }
        }

        if page.text.trim().is_empty() {
            return PageOutcome::Empty;
        }

        PageOutcome::Succeeded(Document {
            content: page.text,
            source: url.clone(),
        })
    }

    async fn record(&self, url: &Url, outcome: PageOutcome) {
        let reason = match outcome {
            PageOutcome::Succeeded(document) => {
                debug!("Collected {} chars from {}", document.content.len(), url);
                self.results.lock().await.documents.push(document);
                return;
            }
            PageOutcome::SkippedStatus(status) => {
                warn!("Skipping {}: HTTP {}", url, status);
                SkipReason::Status(status)
            }
            PageOutcome::SkippedError(message) => {
                warn!("Error fetching {}: {}", url, message);
                SkipReason::Fetch(message)
            }
            PageOutcome::SkippedExtraction(message) => {
                warn!("Could not extract {}: {}", url, message);
                SkipReason::Extraction(message)
            }
            PageOutcome::Empty => {
                debug!("No text content on {}", url);
                SkipReason::NoContent
            }
        };

        self.results.lock().await.skipped.push(SkippedPage {
            url: url.clone(),
            reason,
        });
    }
}
