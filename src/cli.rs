// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Every flag maps onto one field of CrawlConfig (the crawl's settings) or
// onto how results are written and logged. Defaults: seed at niplav.github.io,
// reference year 2022, a queue of 30.
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct
// - ValueEnum: lets an enum be used as a flag value (--log-format json)
// =============================================================================

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{CrawlConfig, DEFAULT_DENY_HOSTS, DEFAULT_SEED, DEFAULT_USER_AGENT};
use crate::output::RankFormat;

#[derive(Parser, Debug)]
#[command(
    name = "twtxt-rank",
    version,
    about = "Crawl twtxt feeds from a seed and rank them by relative activity",
    long_about = "twtxt-rank follows feed references (http, https, gemini) starting from one \
                  twtxt.txt file, counts posts and mentions per feed, and writes a z-score \
                  ranking of every feed it could reach."
)]
pub struct Cli {
    /// Feed URL the crawl starts from
    #[arg(long, default_value = DEFAULT_SEED)]
    pub seed: String,

    /// A feed is "alive" if it posted in this year
    #[arg(long, default_value_t = 2022)]
    pub year: u16,

    /// How many discovered URLs may wait in the queue before producers block
    #[arg(long, default_value_t = 30)]
    pub queue_capacity: usize,

    /// TCP connect timeout per fetch, in seconds
    #[arg(long, default_value_t = 1)]
    pub connect_timeout_secs: u64,

    /// TLS handshake timeout for gemini fetches, in seconds
    #[arg(long, default_value_t = 5)]
    pub handshake_timeout_secs: u64,

    /// Overall timeout per fetch, in seconds
    #[arg(long, default_value_t = 5)]
    pub request_timeout_secs: u64,

    /// Hub host whose references are ignored (repeatable)
    ///
    /// Defaults to feeds.twtxt.net and feeds.twtxt.cc
    #[arg(long = "deny-host", value_name = "HOST")]
    pub deny_hosts: Vec<String>,

    /// Directory for the CSV files (defaults to $HOME)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Write url;z;mention_delta;activity_z;combined instead of url;z
    #[arg(long)]
    pub extended: bool,

    /// Also print the ranking as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Cli {
    pub fn crawl_config(&self) -> CrawlConfig {
        let deny_hosts = if self.deny_hosts.is_empty() {
            DEFAULT_DENY_HOSTS.iter().map(|h| h.to_string()).collect()
        } else {
            self.deny_hosts.clone()
        };

        CrawlConfig {
            seed: self.seed.clone(),
            reference_year: self.year,
            queue_capacity: self.queue_capacity,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            deny_hosts,
        }
    }

    pub fn rank_format(&self) -> RankFormat {
        if self.extended {
            RankFormat::Extended
        } else {
            RankFormat::Basic
        }
    }

    /// --output-dir, else $HOME, else the current directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
