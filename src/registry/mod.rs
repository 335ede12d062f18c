// src/registry/mod.rs
// =============================================================================
// The feed registry: every feed we have ever heard of, plus running totals.
//
// This is the only mutable state shared between fetch tasks. It is owned by
// this module and reached only through methods that each take the lock once,
// change a feed and the matching total together, and release it. So at any
// moment the totals equal the sums over the per-feed tables.
//
// Invariants:
// - exactly one Feed per URL, created at first discovery (the seed counts)
// - feeds are only ever added, never removed
// - alive and accessible only go from false to true
//
// Looking up a feed that does not exist returns RegistryError::MissingFeed.
// The crawl treats that as fatal: it can only happen if the dedup logic is
// wrong, and carrying on would silently miscount.
//
// Rust concepts:
// - Mutex<T>: the lock owns the data, so it is impossible to touch the map
//   without holding the lock
// - MutexGuard: released automatically at the end of each method
// =============================================================================

mod feed;

pub use feed::Feed;

use std::collections::hash_map::{Entry, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::RegistryError;

/// What recording a mention did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// First time this URL was seen; a feed record was created for it
    New,
    /// The URL already had a record; its mention count went up
    Known,
}

#[derive(Debug, Default)]
struct RegistryState {
    feeds: HashMap<String, Feed>,
    total_mentions: u64,
    total_activity: u64,
    total_bytes: u64,
}

impl RegistryState {
    fn feed_mut(&mut self, url: &str) -> Result<&mut Feed, RegistryError> {
        self.feeds
            .get_mut(url)
            .ok_or_else(|| RegistryError::MissingFeed(url.to_string()))
    }
}

#[derive(Debug)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    /// A registry holding just the seed feed, with no mentions.
    pub fn with_seed(seed: &str) -> Self {
        let mut state = RegistryState::default();
        state.feeds.insert(seed.to_string(), Feed::new(seed));
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, RegistryState>, RegistryError> {
        self.state.lock().map_err(|_| RegistryError::Poisoned)
    }

    /// Check-and-create in one step. Of any number of concurrent callers for
    /// the same new URL, exactly one gets `Discovery::New`; only that caller
    /// may schedule the URL for fetching.
    ///
    /// A new feed starts with one mention in `year`, counted in the
    /// process-wide total. A known feed is left alone; the caller follows up
    /// with `increment_mention`.
    pub fn get_or_create(&self, url: &str, year: Option<u16>) -> Result<Discovery, RegistryError> {
        // Take the lock once so the check and the insert cannot interleave
        let mut guard = self.state()?;
        let state = &mut *guard;

        match state.feeds.entry(url.to_string()) {
            // Someone got here first; the caller counts the mention
            Entry::Occupied(_) => Ok(Discovery::Known),
            Entry::Vacant(entry) => {
                // First sighting: the record starts with this one mention
                let mut feed = Feed::new(url);
                feed.mentions_by_year.insert(year, 1);
                entry.insert(feed);
                state.total_mentions += 1;
                Ok(Discovery::New)
            }
        }
    }

    /// Adds one mention to a feed that must already exist.
    pub fn increment_mention(&self, url: &str, year: Option<u16>) -> Result<(), RegistryError> {
        let mut state = self.state()?;
        *state.feed_mut(url)?.mentions_by_year.entry(year).or_insert(0) += 1;
        state.total_mentions += 1;
        Ok(())
    }

    pub fn increment_activity(&self, url: &str, year: Option<u16>) -> Result<(), RegistryError> {
        let mut state = self.state()?;
        *state.feed_mut(url)?.activity_by_year.entry(year).or_insert(0) += 1;
        state.total_activity += 1;
        Ok(())
    }

    /// Records a successful fetch of `bytes` bytes.
    pub fn mark_accessible(&self, url: &str, bytes: u64) -> Result<(), RegistryError> {
        let mut state = self.state()?;
        state.feed_mut(url)?.accessible = true;
        state.total_bytes += bytes;
        Ok(())
    }

    pub fn mark_alive(&self, url: &str) -> Result<(), RegistryError> {
        self.state()?.feed_mut(url)?.alive = true;
        Ok(())
    }

    /// Appends `target` to the interaction list of `source`.
    pub fn add_interaction(&self, source: &str, target: &str) -> Result<(), RegistryError> {
        self.state()?
            .feed_mut(source)?
            .interacting_with
            .push(target.to_string());
        Ok(())
    }

    pub fn feed_count(&self) -> Result<usize, RegistryError> {
        Ok(self.state()?.feeds.len())
    }

    /// Copies the registry out for the read-only ranking pass. Feeds come
    /// back sorted by URL so downstream output is reproducible.
    pub fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        let state = self.state()?;
        let mut feeds: Vec<Feed> = state.feeds.values().cloned().collect();
        feeds.sort_by(|a, b| a.url.cmp(&b.url));

        Ok(RegistrySnapshot {
            feeds,
            total_mentions: state.total_mentions,
            total_activity: state.total_activity,
            total_bytes: state.total_bytes,
        })
    }
}

/// Immutable copy of the registry taken after the crawl has finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub feeds: Vec<Feed>,
    pub total_mentions: u64,
    pub total_activity: u64,
    pub total_bytes: u64,
}

impl RegistrySnapshot {
    #[cfg(test)]
    pub fn feed(&self, url: &str) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.url == url)
    }

    pub fn accessible(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.iter().filter(|f| f.accessible)
    }

    pub fn alive(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.iter().filter(|f| f.alive)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why one Mutex instead of a lock per feed?
//    - Every change touches a feed AND a total; both must move together
//    - One lock makes each method a single all-or-nothing step
//    - The critical sections are tiny (a map lookup and an add), so tasks
//      spend their time waiting on the network, not on this lock
//
// 2. Why std::sync::Mutex and not tokio::sync::Mutex?
//    - We never hold the lock across an .await
//    - The std mutex is cheaper when the lock is not held across awaits
//
// 3. What does lock() returning Err mean?
//    - A thread panicked while holding the lock ("poisoned")
//    - We surface that as RegistryError::Poisoned instead of unwrapping
// -----------------------------------------------------------------------------
