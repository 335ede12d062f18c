// src/registry/feed.rs
// =============================================================================
// One record per discovered feed URL.
//
// Years are keyed as Option<u16>: None is the bucket for lines that carried
// no date stamp. BTreeMap keeps the per-year tables in a stable order for
// logging and tests.
// =============================================================================

use std::collections::BTreeMap;

pub type YearCounts = BTreeMap<Option<u16>, u64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub url: String,
    /// Set once the feed shows activity in the reference year; never reset
    pub alive: bool,
    /// Set once a fetch returned a success status; never reset
    pub accessible: bool,
    pub activity_by_year: YearCounts,
    pub mentions_by_year: YearCounts,
    /// Feeds this one referenced while alive, in the order seen (duplicates kept)
    pub interacting_with: Vec<String>,
}

impl Feed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alive: false,
            accessible: false,
            activity_by_year: YearCounts::new(),
            mentions_by_year: YearCounts::new(),
            interacting_with: Vec::new(),
        }
    }

    pub fn activity_sum(&self) -> u64 {
        self.activity_by_year.values().sum()
    }

    pub fn mention_sum(&self) -> u64 {
        self.mentions_by_year.values().sum()
    }
}
