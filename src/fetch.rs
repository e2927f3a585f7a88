use crate::config::FetcherConfig;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Fetches a user-supplied image URL. One GET, full body into memory, no
/// retries.
pub struct ImageFetcher {
    client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client })
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
