// src/error.rs
// =============================================================================
// Typed errors for the crawl core.
//
// There are three kinds of failure and they are handled very differently:
// - FetchError: one feed could not be retrieved. Local, logged and swallowed.
// - RegistryError: a feed record was missing when it must exist. This is a
//   broken invariant, so the crawl stops.
// - CrawlError: what the orchestrator returns. Anything here is fatal.
//
// The application boundary (main.rs, output/) uses anyhow instead, the same
// way link-checking code did before: typed errors inside, anyhow outside.
// =============================================================================

use thiserror::Error;
use tokio_rustls::rustls;

/// Why a single feed could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP status other than 200, or a gemini status outside the 2x class
    #[error("unsuccessful status {0}")]
    Status(u16),

    #[error("malformed gemini response header: {0:?}")]
    GeminiHeader(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("no usable host in {0}")]
    MissingHost(String),

    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out during {0}")]
    Timeout(&'static str),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no feed record for {0}")]
    MissingFeed(String),

    #[error("registry lock poisoned by a panicking task")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("registry invariant violated: {0}")]
    Registry(#[from] RegistryError),

    #[error("frontier closed while {0} was still being enqueued")]
    FrontierClosed(String),

    #[error("crawl task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_converts_into_crawl_error() {
        let err: CrawlError = RegistryError::MissingFeed("https://a/twtxt.txt".to_string()).into();
        assert!(matches!(err, CrawlError::Registry(RegistryError::MissingFeed(_))));
        assert!(err.to_string().contains("https://a/twtxt.txt"));
    }

    #[test]
    fn test_fetch_status_message() {
        assert_eq!(FetchError::Status(404).to_string(), "unsuccessful status 404");
    }
}
