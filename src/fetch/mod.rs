// src/fetch/mod.rs
// =============================================================================
// Protocol-polymorphic retrieval: URL in, raw bytes out.
//
// Dispatch is by URL prefix:
// - http:// and https:// go through reqwest (see http.rs)
// - gemini:// goes through our own small client (see gemini.rs)
// - gopher:// is recognised but not implemented: the fetch is a no-op that
//   produces neither bytes nor an error
//
// A fetch either yields a body or fails. Failures are never retried; the
// caller just logs them and moves on.
// =============================================================================

mod gemini;
mod http;

use std::time::Duration;

use crate::config::CrawlConfig;
use crate::error::FetchError;
use gemini::GeminiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Gemini,
    Gopher,
}

impl Scheme {
    pub fn of(url: &str) -> Option<Scheme> {
        if url.starts_with("http://") || url.starts_with("https://") {
            Some(Scheme::Http)
        } else if url.starts_with("gemini://") {
            Some(Scheme::Gemini)
        } else if url.starts_with("gopher://") {
            Some(Scheme::Gopher)
        } else {
            None
        }
    }
}

/// Result of a fetch that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Success status; the body is ready for the parser
    Fetched(Vec<u8>),
    /// Scheme we recognise but do not speak (gopher) or do not recognise
    Skipped,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&CrawlConfig::default())
    }
}

impl From<&CrawlConfig> for FetchConfig {
    fn from(config: &CrawlConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            handshake_timeout: config.handshake_timeout,
            request_timeout: config.request_timeout,
            user_agent: config.user_agent.clone(),
        }
    }
}

pub struct Fetcher {
    http: reqwest::Client,
    gemini: GeminiClient,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            http: http::build_client(config)?,
            gemini: GeminiClient::new(config)?,
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        match Scheme::of(url) {
            Some(Scheme::Http) => http::get(&self.http, url).await.map(FetchOutcome::Fetched),
            Some(Scheme::Gemini) => {
                let response = self.gemini.request(url).await?;
                if !response.is_success() {
                    tracing::debug!(url, status = response.status, meta = %response.meta, "gemini request refused");
                    return Err(FetchError::Status(u16::from(response.status)));
                }
                Ok(FetchOutcome::Fetched(response.body))
            }
            // TODO: speak gopher selectors (item type 0) instead of skipping
            Some(Scheme::Gopher) | None => Ok(FetchOutcome::Skipped),
        }
    }
}
