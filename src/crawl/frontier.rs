// src/crawl/frontier.rs
// =============================================================================
// The frontier: discovered-but-not-yet-fetched feed URLs.
//
// How it works:
// 1. A bounded tokio mpsc channel is the queue (capacity 30 by default)
// 2. Fetch tasks hold a FrontierHandle and call enqueue() for every reference
// 3. enqueue() asks the registry to check-and-create the feed record; only
//    the caller that created it sends the URL into the channel
// 4. When the channel is full, enqueue() waits for a free slot. That wait is
//    the crawl's only backpressure
//
// Dedup lives in the registry, not here: "has a Feed record" and "has been
// scheduled" are the same fact, decided under one lock.
//
// Closing: the Frontier itself is owned by the orchestrator and nobody else.
// close() consumes it, so it can only happen once, and the orchestrator only
// calls it after every task that could still enqueue has finished.
// =============================================================================

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::CrawlError;
use crate::registry::{Discovery, Registry};

pub struct Frontier {
    receiver: mpsc::Receiver<String>,
    handle: FrontierHandle,
}

/// The producer side, cloned into every fetch task.
#[derive(Clone)]
pub struct FrontierHandle {
    sender: mpsc::Sender<String>,
    registry: Arc<Registry>,
}

impl Frontier {
    pub fn new(capacity: usize, registry: Arc<Registry>) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            receiver,
            handle: FrontierHandle { sender, registry },
        }
    }

    pub fn handle(&self) -> FrontierHandle {
        self.handle.clone()
    }

    /// Next URL if one is already waiting. Never blocks.
    pub fn try_next(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// Waits for the next URL. The frontier keeps a sender of its own, so
    /// this only resolves when something is actually enqueued.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Stops accepting work. Any enqueue after this fails with
    /// `CrawlError::FrontierClosed`.
    pub fn close(mut self) {
        self.receiver.close();
    }
}

impl FrontierHandle {
    /// Puts a URL on the queue without touching the registry. Only for the
    /// seed, whose record exists from the start.
    pub async fn schedule(&self, url: String) -> Result<(), CrawlError> {
        self.sender
            .send(url)
            .await
            .map_err(|rejected| CrawlError::FrontierClosed(rejected.0))
    }

    /// Schedules `url` for fetching iff no feed record exists yet for it.
    /// A new record starts with one mention in `year`. For a known URL the
    /// registry is not modified and nothing is queued.
    pub async fn enqueue(&self, url: &str, year: Option<u16>) -> Result<Discovery, CrawlError> {
        let discovery = self.registry.get_or_create(url, year)?;
        if discovery == Discovery::New {
            self.schedule(url.to_string()).await?;
        }
        Ok(discovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "https://seed.example/twtxt.txt";
    const FEED: &str = "https://feed.example/twtxt.txt";

    fn frontier(capacity: usize) -> (Frontier, Arc<Registry>) {
        let registry = Arc::new(Registry::with_seed(SEED));
        (Frontier::new(capacity, Arc::clone(&registry)), registry)
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_of_same_url_schedules_once() {
        let (mut frontier, registry) = frontier(4);
        let first = frontier.handle();
        let second = frontier.handle();

        let (a, b) = tokio::join!(first.enqueue(FEED, Some(2022)), second.enqueue(FEED, Some(2022)));
        let outcomes = [a.unwrap(), b.unwrap()];

        assert_eq!(outcomes.iter().filter(|d| **d == Discovery::New).count(), 1);
        assert_eq!(frontier.try_next().as_deref(), Some(FEED));
        assert_eq!(frontier.try_next(), None);
        assert_eq!(registry.feed_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_across_tasks() {
        let (mut frontier, registry) = frontier(4);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let handle = frontier.handle();
                tokio::spawn(async move { handle.enqueue(FEED, None).await.unwrap() })
            })
            .collect();
        let mut created = 0;
        for task in tasks {
            if task.await.unwrap() == Discovery::New {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(frontier.try_next().as_deref(), Some(FEED));
        assert_eq!(frontier.try_next(), None);
        assert_eq!(registry.feed_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_seed_is_never_rescheduled_by_enqueue() {
        let (mut frontier, _registry) = frontier(4);
        frontier.handle().schedule(SEED.to_string()).await.unwrap();

        let discovery = frontier.handle().enqueue(SEED, Some(2022)).await.unwrap();
        assert_eq!(discovery, Discovery::Known);
        assert_eq!(frontier.try_next().as_deref(), Some(SEED));
        assert_eq!(frontier.try_next(), None);
    }

    #[tokio::test]
    async fn test_full_queue_blocks_until_drained() {
        let (mut frontier, _registry) = frontier(1);
        let handle = frontier.handle();
        handle.enqueue("https://one/twtxt.txt", None).await.unwrap();

        let producer = tokio::spawn(async move {
            handle.enqueue("https://two/twtxt.txt", None).await.unwrap();
        });
        tokio::task::yield_now().await;
        assert!(!producer.is_finished());

        assert_eq!(frontier.next().await.as_deref(), Some("https://one/twtxt.txt"));
        producer.await.unwrap();
        assert_eq!(frontier.next().await.as_deref(), Some("https://two/twtxt.txt"));
    }

    #[tokio::test]
    async fn test_enqueue_after_close_is_an_error() {
        let (frontier, _registry) = frontier(4);
        let handle = frontier.handle();
        frontier.close();

        let result = handle.enqueue(FEED, None).await;
        assert!(matches!(result, Err(CrawlError::FrontierClosed(url)) if url == FEED));
    }
}
