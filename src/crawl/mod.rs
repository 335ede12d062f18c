// src/crawl/mod.rs
// =============================================================================
// This module drives the crawl.
//
// How it works:
// 1. The seed URL goes into the frontier
// 2. For every URL taken off the frontier we spawn one task that fetches
//    the feed, parses it and updates the registry
// 3. References to feeds we have not seen yet go back into the frontier
// 4. When no task is running and the frontier is empty, nothing can ever be
//    enqueued again, so we close the frontier and hand back a snapshot
//
// There is no crawl-wide deadline. Each fetch has its own timeouts, so every
// task finishes, so the crawl finishes.
//
// Failures:
// - A feed that cannot be fetched is logged and skipped (no retry)
// - A broken registry invariant stops the whole crawl
//
// Rust concepts:
// - tokio::spawn: each feed is an independent task on the runtime
// - FuturesUnordered: the set of in-flight tasks, yielding as they complete
// - tokio::select!: wait for "new URL" or "task done", whichever is first
// - Arc: tasks share the fetcher, parser and registry without copying them
// =============================================================================

mod frontier;

pub use frontier::{Frontier, FrontierHandle};

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::CrawlConfig;
use crate::error::{CrawlError, FetchError};
use crate::fetch::{FetchConfig, FetchOutcome, Fetcher};
use crate::parser::{scan_body, LineParser};
use crate::registry::{Discovery, Registry, RegistrySnapshot};

// Log a progress line every this many visited feeds.
const PROGRESS_EVERY: usize = 100;

/// What a finished crawl hands to the ranking and output stages.
#[derive(Debug)]
pub struct CrawlReport {
    pub snapshot: RegistrySnapshot,
    /// URLs taken off the frontier, whether or not the fetch succeeded
    pub visited: usize,
    pub elapsed: Duration,
}

/// Everything a fetch task needs, shared by all of them.
struct VisitContext {
    fetcher: Fetcher,
    parser: LineParser,
    registry: Arc<Registry>,
    reference_year: u16,
    visited: AtomicUsize,
}

pub struct Crawler {
    seed: String,
    queue_capacity: usize,
    context: Arc<VisitContext>,
}

impl Crawler {
    pub fn new(config: &CrawlConfig) -> Result<Self, FetchError> {
        let context = VisitContext {
            fetcher: Fetcher::new(&FetchConfig::from(config))?,
            parser: LineParser::new(config.deny_hosts.clone()),
            registry: Arc::new(Registry::with_seed(&config.seed)),
            reference_year: config.reference_year,
            visited: AtomicUsize::new(0),
        };

        Ok(Self {
            seed: config.seed.clone(),
            queue_capacity: config.queue_capacity,
            context: Arc::new(context),
        })
    }

    /// Crawls until the frontier is provably empty.
    pub async fn run(self) -> Result<CrawlReport, CrawlError> {
        let start = Instant::now();
        tracing::info!(seed = %self.seed, capacity = self.queue_capacity, "starting crawl");

        // The seed already has a registry record, so it skips the dedup step
        let mut frontier = Frontier::new(self.queue_capacity, Arc::clone(&self.context.registry));
        let handle = frontier.handle();
        handle.schedule(self.seed.clone()).await?;

        // One entry per running fetch task
        let mut in_flight: FuturesUnordered<JoinHandle<Result<(), CrawlError>>> =
            FuturesUnordered::new();

        loop {
            // With nothing running, whatever is queued now is all there will be.
            if in_flight.is_empty() {
                match frontier.try_next() {
                    Some(url) => {
                        in_flight.push(self.dispatch(url, handle.clone()));
                        continue;
                    }
                    None => break,
                }
            }

            // Otherwise take whichever comes first: a new URL or a finished task
            tokio::select! {
                Some(url) = frontier.next() => {
                    in_flight.push(self.dispatch(url, handle.clone()));
                }
                Some(joined) = in_flight.next() => {
                    // A panicked task and a broken invariant are both fatal
                    if let Err(err) = joined.map_err(CrawlError::from).and_then(|done| done) {
                        tracing::error!(error = %err, "aborting crawl");
                        in_flight.iter().for_each(JoinHandle::abort);
                        return Err(err);
                    }
                }
                else => break,
            }
        }

        // Nobody can enqueue any more; close exactly once
        drop(handle);
        frontier.close();

        let snapshot = self.context.registry.snapshot()?;
        let visited = self.context.visited.load(Ordering::Acquire);
        let elapsed = start.elapsed();
        tracing::info!(
            visited,
            feeds = snapshot.feeds.len(),
            megabytes = snapshot.total_bytes / 1024 / 1024,
            elapsed_ms = elapsed.as_millis() as u64,
            "crawl finished"
        );

        Ok(CrawlReport {
            snapshot,
            visited,
            elapsed,
        })
    }

    fn dispatch(&self, url: String, frontier: FrontierHandle) -> JoinHandle<Result<(), CrawlError>> {
        let context = Arc::clone(&self.context);
        tokio::spawn(async move { context.visit(&url, &frontier).await })
    }
}

impl VisitContext {
    /// Fetch, parse and record one feed.
    async fn visit(&self, url: &str, frontier: &FrontierHandle) -> Result<(), CrawlError> {
        // Download the feed; every URL taken off the frontier counts as visited
        let outcome = self.fetcher.fetch(url).await;
        self.record_progress()?;

        // Failed or unsupported fetches end here, with no retry
        let body = match outcome {
            Ok(FetchOutcome::Fetched(body)) => body,
            Ok(FetchOutcome::Skipped) => {
                tracing::debug!(url, "scheme not supported, skipping");
                return Ok(());
            }
            Err(err) => {
                tracing::debug!(url, error = %err, "fetch failed");
                return Ok(());
            }
        };

        self.registry.mark_accessible(url, body.len() as u64)?;

        // Parse every line and decide aliveness over the whole body
        let scan = scan_body(&body, &self.parser, self.reference_year);
        if scan.alive {
            self.registry.mark_alive(url)?;
        }

        let mut discovered = 0usize;
        for line in &scan.lines {
            // Each non-empty line is one post by this feed
            self.registry.increment_activity(url, line.year)?;

            let Some(reference) = line.reference.as_deref() else {
                continue;
            };
            // New feeds are scheduled (their first mention is counted on
            // creation); known feeds just get another mention
            match frontier.enqueue(reference, line.year).await? {
                Discovery::New => discovered += 1,
                Discovery::Known => {
                    self.registry.increment_mention(reference, line.year)?;
                    if scan.alive {
                        self.registry.add_interaction(url, reference)?;
                    }
                }
            }
        }

        tracing::debug!(
            url,
            lines = scan.lines.len(),
            references = scan.references().count(),
            discovered,
            alive = scan.alive,
            "feed recorded"
        );
        Ok(())
    }

    fn record_progress(&self) -> Result<(), CrawlError> {
        let visited = self.visited.fetch_add(1, Ordering::AcqRel) + 1;
        if visited % PROGRESS_EVERY == 0 {
            let discovered = self.registry.feed_count()?;
            tracing::info!(visited, discovered, "crawl progress");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(server: &MockServer, route: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(server)
            .await;
    }

    fn config(seed: &str) -> CrawlConfig {
        CrawlConfig {
            seed: seed.to_string(),
            reference_year: 2022,
            ..CrawlConfig::default()
        }
    }

    #[tokio::test]
    async fn test_three_node_cycle_terminates() {
        let server = MockServer::start().await;
        let a = format!("{}/a/twtxt.txt", server.uri());
        let b = format!("{}/b/twtxt.txt", server.uri());
        let c = format!("{}/c/twtxt.txt", server.uri());

        serve(&server, "/a/twtxt.txt", 200, format!("2022-01-01T10:00:00Z\thi @<b {b}>\n")).await;
        serve(&server, "/b/twtxt.txt", 200, format!("2021-06-01T10:00:00Z\tsee {c}\n")).await;
        serve(&server, "/c/twtxt.txt", 200, format!("2022-02-02T10:00:00Z\t@<a {a}>\n")).await;

        let report = Crawler::new(&config(&a)).unwrap().run().await.unwrap();
        let snapshot = &report.snapshot;

        assert_eq!(report.visited, 3);
        assert_eq!(snapshot.feeds.len(), 3);
        for url in [&a, &b, &c] {
            let feed = snapshot.feed(url).unwrap();
            assert_eq!(feed.mention_sum(), 1, "{url}");
            assert_eq!(feed.activity_sum(), 1, "{url}");
            assert!(feed.accessible, "{url}");
        }
        assert!(snapshot.feed(&a).unwrap().alive);
        assert!(!snapshot.feed(&b).unwrap().alive);
        assert!(snapshot.feed(&c).unwrap().alive);
        assert_eq!(snapshot.feed(&c).unwrap().interacting_with, vec![a.clone()]);
        assert_eq!(snapshot.total_mentions, 3);
        assert_eq!(snapshot.total_activity, 3);
    }

    #[tokio::test]
    async fn test_not_found_feed_is_visited_once_and_stays_inaccessible() {
        let server = MockServer::start().await;
        let seed = format!("{}/seed/twtxt.txt", server.uri());
        let gone = format!("{}/gone/twtxt.txt", server.uri());

        let body = format!("2022-01-01 first {gone}\n2022-01-02 again {gone}\nplain text\n");
        serve(&server, "/seed/twtxt.txt", 200, body).await;
        serve(&server, "/gone/twtxt.txt", 404, String::new()).await;

        let report = Crawler::new(&config(&seed)).unwrap().run().await.unwrap();
        let gone_feed = report.snapshot.feed(&gone).unwrap();

        assert_eq!(report.visited, 2);
        assert!(!gone_feed.accessible);
        assert_eq!(gone_feed.mention_sum(), 2);
        assert_eq!(report.snapshot.feed(&seed).unwrap().activity_sum(), 3);
        assert_eq!(report.snapshot.feed(&seed).unwrap().interacting_with, vec![gone.clone()]);
    }

    #[tokio::test]
    async fn test_gopher_and_hub_references() {
        let server = MockServer::start().await;
        let seed = format!("{}/seed/twtxt.txt", server.uri());
        let gopher = "gopher://hole.example/0/twtxt.txt";

        let body = format!(
            "2020-01-01 {gopher}\n2020-01-02 https://feeds.twtxt.net/everyone/twtxt.txt\n"
        );
        serve(&server, "/seed/twtxt.txt", 200, body).await;

        let report = Crawler::new(&config(&seed)).unwrap().run().await.unwrap();

        assert_eq!(report.visited, 2);
        assert_eq!(report.snapshot.feeds.len(), 2);
        assert!(!report.snapshot.feed(gopher).unwrap().accessible);
        assert!(!report.snapshot.feed(&seed).unwrap().alive);
        assert_eq!(report.snapshot.feed(&seed).unwrap().activity_sum(), 2);
    }

    #[tokio::test]
    async fn test_fan_out_wider_than_queue_capacity() {
        let server = MockServer::start().await;
        let hub = format!("{}/hub/twtxt.txt", server.uri());
        let leaves: Vec<String> = (0..6)
            .map(|i| format!("{}/leaf{i}/twtxt.txt", server.uri()))
            .collect();

        let hub_body: String = leaves.iter().map(|l| format!("2022-03-03 {l}\n")).collect();
        serve(&server, "/hub/twtxt.txt", 200, hub_body).await;
        for i in 0..6 {
            serve(&server, &format!("/leaf{i}/twtxt.txt"), 200, format!("2019-01-01 {hub}\n")).await;
        }

        let config = CrawlConfig {
            queue_capacity: 1,
            ..config(&hub)
        };
        let report = Crawler::new(&config).unwrap().run().await.unwrap();

        assert_eq!(report.visited, 7);
        assert_eq!(report.snapshot.feed(&hub).unwrap().mention_sum(), 6);
        for leaf in &leaves {
            assert_eq!(report.snapshot.feed(leaf).unwrap().mention_sum(), 1);
        }
        assert_eq!(report.snapshot.total_mentions, 12);
    }

    #[tokio::test]
    async fn test_unreachable_seed_ends_crawl() {
        let server = MockServer::start().await;
        let seed = format!("{}/seed/twtxt.txt", server.uri());
        serve(&server, "/seed/twtxt.txt", 500, String::new()).await;

        let report = Crawler::new(&config(&seed)).unwrap().run().await.unwrap();
        assert_eq!(report.visited, 1);
        assert_eq!(report.snapshot.feeds.len(), 1);
        assert_eq!(report.snapshot.accessible().count(), 0);
    }
}
