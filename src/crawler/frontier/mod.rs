#[cfg(test)]
mod tests;

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};
use url::Url;

/// The prefix/domain rule deciding which URLs may be fetched or enqueued.
///
/// Both checks are literal string comparisons against the serialized URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope {
    /// Prefix every fetched URL must start with
    pub base_url: String,
    /// Substring a discovered link must contain to be considered at all
    pub domain: String,
}

impl CrawlScope {
    #[inline]
    pub fn new(base_url: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            domain: domain.into(),
        }
    }

    /// Build a scope whose domain is the host of `base_url`
    #[inline]
    pub fn for_base_url(base_url: &Url) -> Self {
        Self {
            base_url: base_url.as_str().to_string(),
            domain: base_url.host_str().unwrap_or_default().to_string(),
        }
    }

    /// Whether `url` lies under the base URL prefix
    #[inline]
    pub fn contains(&self, url: &str) -> bool {
        url.starts_with(&self.base_url)
    }

    /// Whether a discovered link is worth offering to the frontier
    #[inline]
    pub fn admits_link(&self, url: &str) -> bool {
        url.contains(&self.domain)
    }
}

/// Result of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    OutOfScope,
    AlreadyVisited,
}

impl Admission {
    #[inline]
    pub fn is_admitted(self) -> bool {
        self == Self::Admitted
    }
}

/// Result of waiting for work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeued {
    /// A URL to process; the caller must report it back with [`Frontier::done`]
    Url(Url),
    /// The wait timed out while other items are still being processed
    Idle,
    /// Nothing queued and nothing in flight: the crawl is finished
    Drained,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<Url>,
    visited: HashSet<String>,
    /// Admitted items not yet reported done
    outstanding: usize,
}

/// Work queue plus visited set, guarded by a single lock.
///
/// Admission (scope check, visited check, insert, push) happens in one
/// critical section, so two workers discovering the same link can never both
/// schedule it. Quiescence is tracked by the outstanding counter rather than
/// the queue length because workers are producers too.
#[derive(Debug)]
pub struct Frontier {
    scope: CrawlScope,
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    #[inline]
    pub fn new(scope: CrawlScope) -> Self {
        Self {
            scope,
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
        }
    }

    #[inline]
    pub fn scope(&self) -> &CrawlScope {
        &self.scope
    }

    /// Schedule `url` unless it is out of scope or was already scheduled
    #[inline]
    pub async fn try_enqueue(&self, url: Url) -> Admission {
        if !self.scope.contains(url.as_str()) {
            trace!("Out of scope: {}", url);
            return Admission::OutOfScope;
        }

        let mut state = self.state.lock().await;
        if !state.visited.insert(url.as_str().to_string()) {
            return Admission::AlreadyVisited;
        }
        debug!("Queued {}", url);
        state.queue.push_back(url);
        state.outstanding += 1;
        drop(state);

        self.notify.notify_one();
        Admission::Admitted
    }

    /// Wait up to `wait` for a URL to become available
    #[inline]
    pub async fn dequeue(&self, wait: Duration) -> Dequeued {
        let deadline = Instant::now() + wait;

        loop {
            // Register before looking at the state so a concurrent enqueue or
            // final `done` cannot slip between the check and the wait.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(url) = state.queue.pop_front() {
                    return Dequeued::Url(url);
                }
                if state.outstanding == 0 {
                    return Dequeued::Drained;
                }
            }

            if timeout_at(deadline, notified).await.is_err() {
                return Dequeued::Idle;
            }
        }
    }

    /// Report that a dequeued URL has been fully processed, including any
    /// links it enqueued
    #[inline]
    pub async fn done(&self, url: &Url) {
        let mut state = self.state.lock().await;
        state.outstanding = state.outstanding.saturating_sub(1);
        let drained = state.outstanding == 0 && state.queue.is_empty();
        drop(state);

        trace!("Finished {}", url);
        if drained {
            debug!("Frontier drained");
            self.notify.notify_waiters();
        }
    }

    #[inline]
    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    #[inline]
    pub async fn outstanding(&self) -> usize {
        self.state.lock().await.outstanding
    }

    #[inline]
    pub async fn visited_count(&self) -> usize {
        self.state.lock().await.visited.len()
    }

    /// Snapshot of every URL scheduled so far, sorted
    #[inline]
    pub async fn visited_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.state.lock().await.visited.iter().cloned().collect();
        urls.sort_unstable();
        urls
    }
}
