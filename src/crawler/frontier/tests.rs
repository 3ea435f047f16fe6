use std::sync::Arc;

use super::*;

fn docs_scope() -> CrawlScope {
    CrawlScope::new("https://example.com/docs/", "example.com")
}

fn url(s: &str) -> Url {
    Url::parse(s).expect("url should parse")
}

#[test]
fn scope_rules_are_literal() {
    let scope = docs_scope();

    assert!(scope.contains("https://example.com/docs/"));
    assert!(scope.contains("https://example.com/docs/a/b"));
    assert!(!scope.contains("https://example.com/blog/"));
    assert!(!scope.contains("http://example.com/docs/"));

    assert!(scope.admits_link("https://example.com/anything"));
    assert!(scope.admits_link("https://cdn.example.com/docs/"));
    assert!(!scope.admits_link("https://other.com/z"));
}

#[test]
fn scope_for_base_url_uses_host() {
    let scope = CrawlScope::for_base_url(&url("https://docs.rs/regex/1.10.6/regex/"));
    assert_eq!(scope.base_url, "https://docs.rs/regex/1.10.6/regex/");
    assert_eq!(scope.domain, "docs.rs");
}

#[tokio::test]
async fn admission_outcomes() {
    let frontier = Frontier::new(docs_scope());

    assert_eq!(
        frontier.try_enqueue(url("https://example.com/docs/a")).await,
        Admission::Admitted
    );
    assert_eq!(
        frontier.try_enqueue(url("https://example.com/docs/a")).await,
        Admission::AlreadyVisited
    );
    assert_eq!(
        frontier.try_enqueue(url("https://example.com/pricing")).await,
        Admission::OutOfScope
    );

    assert_eq!(frontier.queue_len().await, 1);
    assert_eq!(frontier.outstanding().await, 1);
    assert_eq!(frontier.visited_count().await, 1);
}

#[tokio::test]
async fn equivalent_urls_are_deduplicated() {
    let frontier = Frontier::new(docs_scope());

    let first = url("https://EXAMPLE.com:443/docs/./guide");
    let second = url("https://example.com/docs/guide");

    assert!(frontier.try_enqueue(first).await.is_admitted());
    assert!(!frontier.try_enqueue(second).await.is_admitted());
    assert_eq!(
        frontier.visited_urls().await,
        vec!["https://example.com/docs/guide".to_string()]
    );
}

#[tokio::test]
async fn dequeue_is_fifo() {
    let frontier = Frontier::new(docs_scope());
    frontier.try_enqueue(url("https://example.com/docs/1")).await;
    frontier.try_enqueue(url("https://example.com/docs/2")).await;

    assert_eq!(
        frontier.dequeue(Duration::from_millis(10)).await,
        Dequeued::Url(url("https://example.com/docs/1"))
    );
    assert_eq!(
        frontier.dequeue(Duration::from_millis(10)).await,
        Dequeued::Url(url("https://example.com/docs/2"))
    );
}

#[tokio::test]
async fn empty_frontier_is_drained() {
    let frontier = Frontier::new(docs_scope());
    assert_eq!(
        frontier.dequeue(Duration::from_secs(5)).await,
        Dequeued::Drained
    );
}

#[tokio::test]
async fn in_flight_work_makes_dequeue_idle_not_drained() {
    let frontier = Frontier::new(docs_scope());
    let seed = url("https://example.com/docs/");
    frontier.try_enqueue(seed.clone()).await;

    let Dequeued::Url(taken) = frontier.dequeue(Duration::from_millis(10)).await else {
        panic!("seed should be dequeued");
    };
    assert_eq!(taken, seed);

    // The seed is still being processed, so an empty queue is not the end
    assert_eq!(
        frontier.dequeue(Duration::from_millis(20)).await,
        Dequeued::Idle
    );

    frontier.done(&taken).await;
    assert_eq!(
        frontier.dequeue(Duration::from_millis(20)).await,
        Dequeued::Drained
    );
    assert_eq!(frontier.outstanding().await, 0);
}

#[tokio::test]
async fn waiting_consumer_wakes_on_enqueue() {
    let frontier = Arc::new(Frontier::new(docs_scope()));
    let seed = url("https://example.com/docs/");
    frontier.try_enqueue(seed.clone()).await;
    let Dequeued::Url(seed) = frontier.dequeue(Duration::from_millis(10)).await else {
        panic!("seed should be dequeued");
    };

    let consumer = {
        let frontier = Arc::clone(&frontier);
        tokio::spawn(async move { frontier.dequeue(Duration::from_secs(5)).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    frontier
        .try_enqueue(url("https://example.com/docs/child"))
        .await;
    frontier.done(&seed).await;

    let next = consumer.await.expect("consumer should not panic");
    assert_eq!(next, Dequeued::Url(url("https://example.com/docs/child")));
}

#[tokio::test]
async fn every_waiter_sees_drain() {
    let frontier = Arc::new(Frontier::new(docs_scope()));
    let seed = url("https://example.com/docs/");
    frontier.try_enqueue(seed.clone()).await;
    let Dequeued::Url(seed) = frontier.dequeue(Duration::from_millis(10)).await else {
        panic!("seed should be dequeued");
    };

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.dequeue(Duration::from_secs(5)).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    frontier.done(&seed).await;

    for waiter in waiters {
        assert_eq!(
            waiter.await.expect("waiter should not panic"),
            Dequeued::Drained
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_discovery_admits_once() {
    let frontier = Arc::new(Frontier::new(docs_scope()));
    let target = url("https://example.com/docs/shared");

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let frontier = Arc::clone(&frontier);
            let target = target.clone();
            tokio::spawn(async move { frontier.try_enqueue(target).await })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        if task.await.expect("task should not panic").is_admitted() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(frontier.queue_len().await, 1);
    assert_eq!(frontier.outstanding().await, 1);
}
