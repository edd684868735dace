//! Issuer/verifier directory
//!
//! The wallet fetches the entity directory once at startup. The fetch is
//! best effort: any failure falls back to the configured initial entities.

use async_trait::async_trait;
use metrics::counter;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::WalletConfig;
use crate::model::{Entity, EntityDirectory};

/// Directory fetch errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Directory request failed with status {0}")]
    Status(u16),

    #[error("Malformed directory document: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DirectoryError::Malformed(err.to_string())
        } else {
            DirectoryError::Network(err.to_string())
        }
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Source of directory entries
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn fetch(&self) -> DirectoryResult<Vec<Entity>>;
}

/// Fetches `{ "service": [...] }` from a well-known URL
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    url: String,
}

impl HttpDirectory {
    pub fn new(url: impl Into<String>, timeout: Duration) -> DirectoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &WalletConfig) -> DirectoryResult<Self> {
        Self::new(
            config.agent.entities_url.clone(),
            config.directory.request_timeout,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EntitySource for HttpDirectory {
    async fn fetch(&self) -> DirectoryResult<Vec<Entity>> {
        debug!(url = %self.url, "fetching entity directory");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let directory: EntityDirectory = response.json().await?;
        Ok(directory.service)
    }
}

/// Fetch the directory, falling back to `fallback` on any failure
pub async fn load_entities(source: &dyn EntitySource, fallback: &[Entity]) -> Vec<Entity> {
    match source.fetch().await {
        Ok(entities) => {
            debug!(count = entities.len(), "entity directory loaded");
            entities
        }
        Err(e) => {
            warn!(error = %e, fallback = fallback.len(), "entity directory unavailable, using fallback");
            counter!("wallet.directory.fallbacks").increment(1);
            fallback.to_vec()
        }
    }
}
