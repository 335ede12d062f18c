// src/fetch/http.rs
// =============================================================================
// Fetches http:// and https:// feeds with reqwest.
//
// Only an exact 200 counts as success. Redirects are followed by reqwest
// before we ever see a status, so a feed that moved is still reachable.
// =============================================================================

use reqwest::{Client, StatusCode};

use super::FetchConfig;
use crate::error::FetchError;

// One client for the whole crawl: it pools connections across tasks.
pub(crate) fn build_client(config: &FetchConfig) -> Result<Client, FetchError> {
    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()?;
    Ok(client)
}

pub(crate) async fn get(client: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = response.bytes().await?;
    Ok(body.to_vec())
}
