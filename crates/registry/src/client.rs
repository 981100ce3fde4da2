//! Registry access: the [`RegistryClient`] seam, its HTTP implementation and
//! the paced, rate-limit-aware catalog fetch.

use std::time::Duration;

use async_trait::async_trait;
use grid_core::catalog::CatalogEntry;
use serde::Deserialize;

use crate::error::RegistryError;
use crate::record::RegistryRecord;

/// Read-only view of the external model registry. Indices start at 1.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn count(&self) -> Result<u64, RegistryError>;

    async fn get(&self, index: u64) -> Result<RegistryRecord, RegistryError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

/// JSON-over-HTTP registry client.
///
/// - `GET {base}/models/count` returns `{"count": n}`
/// - `GET {base}/models/{index}` returns one [`RegistryRecord`]
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, RegistryError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(RegistryError::RateLimited);
        }
        if !status.is_success() {
            return Err(RegistryError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| RegistryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn count(&self) -> Result<u64, RegistryError> {
        let response: CountResponse = self.get_json("/models/count").await?;
        Ok(response.count)
    }

    async fn get(&self, index: u64) -> Result<RegistryRecord, RegistryError> {
        self.get_json(&format!("/models/{index}")).await
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Pacing and retry parameters for a full catalog fetch.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Attempts per record when the registry rate-limits.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on the delay between retries.
    pub max_backoff: Duration,
    /// Factor by which the delay grows after each rate-limited attempt.
    pub multiplier: f64,
    /// Pause between consecutive record fetches.
    pub request_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
            request_delay: Duration::from_millis(200),
        }
    }
}

impl FetchPolicy {
    /// No pacing and no backoff delays.
    pub fn immediate() -> Self {
        Self {
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            request_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Calculate the next backoff delay, clamped to [`FetchPolicy::max_backoff`].
pub fn next_delay(current: Duration, policy: &FetchPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_backoff)
}

/// Fetch one record, retrying only on rate limits.
pub async fn fetch_record(
    client: &dyn RegistryClient,
    index: u64,
    policy: &FetchPolicy,
) -> Result<RegistryRecord, RegistryError> {
    let mut delay = policy.initial_backoff;
    let mut attempt = 1u32;

    loop {
        match client.get(index).await {
            Err(RegistryError::RateLimited) if attempt < policy.max_attempts => {
                tracing::debug!(
                    index,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Registry rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, policy);
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Fetch every active record and convert it into a catalog entry.
///
/// Only the count query is fatal. Records that fail to fetch or convert
/// are skipped with a warning.
pub async fn fetch_catalog(
    client: &dyn RegistryClient,
    policy: &FetchPolicy,
) -> Result<Vec<CatalogEntry>, RegistryError> {
    let count = client.count().await?;
    tracing::info!(count, "Fetching models from registry");

    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for index in 1..=count {
        match fetch_record(client, index, policy).await {
            Ok(record) => match record.into_entry(index) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(index, error = %e, "Skipping malformed registry record");
                }
            },
            Err(e) => {
                skipped += 1;
                tracing::warn!(index, error = %e, "Skipping registry record after fetch error");
            }
        }

        if !policy.request_delay.is_zero() && index < count {
            tokio::time::sleep(policy.request_delay).await;
        }
    }

    tracing::info!(active = entries.len(), skipped, "Registry fetch complete");
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
