
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use ureq::Agent;
use url::Url;

use super::CrawlerConfig;

/// Statuses worth retrying; everything else non-200 is final
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Largest shift applied to the backoff base
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Network-level failure for one page
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("gave up after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },
    #[error("{0}")]
    Terminal(String),
}

/// What a fetch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200 response body
    Page(String),
    /// Any other final status; the page is skipped
    Status(u16),
    /// The request never produced a usable response
    Failed(FetchError),
}

/// Source of page bodies for the crawler's workers
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchOutcome;
}

/// Result of a single request, before the retry policy is applied
#[derive(Debug)]
enum Attempt {
    Page(String),
    Status(u16),
    Transient(String),
    Terminal(String),
}

/// Whether an HTTP status should be retried
#[inline]
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Delay before retry number `retry` (zero based): `base * 2^retry`
#[inline]
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(1 << retry.min(MAX_BACKOFF_SHIFT))
}

/// Blocking HTTP client shared by all workers, with bounded retry and
/// exponential backoff
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: Agent,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    #[inline]
    pub fn new(config: &CrawlerConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self {
            agent,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// Perform a GET with the retry policy applied
    #[inline]
    pub async fn get(&self, url: &Url) -> FetchOutcome {
        let mut retry = 0;

        loop {
            let attempt = self.attempt(url).await;
            let retries_left = retry < self.max_retries;

            match attempt {
                Attempt::Page(body) => {
                    debug!("Fetched {} (attempt {})", url, retry + 1);
                    return FetchOutcome::Page(body);
                }
                Attempt::Status(status) if is_retryable_status(status) && retries_left => {
                    warn!("HTTP {} from {}, retrying", status, url);
                }
                Attempt::Status(status) => {
                    debug!("Final status {} for {}", status, url);
                    return FetchOutcome::Status(status);
                }
                Attempt::Transient(message) if retries_left => {
                    warn!("Retryable error for {}: {}", url, message);
                }
                Attempt::Transient(message) => {
                    return FetchOutcome::Failed(FetchError::Exhausted {
                        attempts: retry + 1,
                        message,
                    });
                }
                Attempt::Terminal(message) => {
                    debug!("Non-retryable error for {}: {}", url, message);
                    return FetchOutcome::Failed(FetchError::Terminal(message));
                }
            }

            let delay = backoff_delay(self.retry_base_delay, retry);
            debug!("Retrying {} in {:?}", url, delay);
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        let agent = self.agent.clone();
        let target = url.as_str().to_string();

        tokio::task::spawn_blocking(move || try_get(&agent, &target))
            .await
            .unwrap_or_else(|e| Attempt::Terminal(format!("request task failed: {}", e)))
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    #[inline]
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        self.get(url).await
    }
}

/// A single blocking GET without retry logic
fn try_get(agent: &Agent, url: &str) -> Attempt {
    debug!("Making HTTP GET request to: {}", url);

    match agent.get(url).call() {
        Ok(mut response) => {
            let status = response.status().as_u16();
            if status != 200 {
                return Attempt::Status(status);
            }
            match response.body_mut().read_to_string() {
                Ok(text) => {
                    debug!("Read {} bytes from {}", text.len(), url);
                    Attempt::Page(text)
                }
                Err(e) => classify_transport_error(&e),
            }
        }
        Err(ureq::Error::StatusCode(status)) => Attempt::Status(status),
        Err(e) => classify_transport_error(&e),
    }
}

fn classify_transport_error(error: &ureq::Error) -> Attempt {
    match error {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => Attempt::Transient(error.to_string()),
        _ => Attempt::Terminal(error.to_string()),
    }
}
