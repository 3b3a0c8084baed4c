//! Remote store client.
//!
//! The remote store is reached over HTTP: a bulk grid upsert endpoint, a
//! health endpoint used as the reachability probe, and a paginated readings
//! query. [`RemoteStore`] is the seam the storage and sync managers talk
//! through, so tests can swap in a scriptable fake without a network.
//!
//! All calls are bounded by the client timeout configured at construction; a
//! timed-out call is an ordinary failed attempt, never an unbounded stall.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::models::{GridPoint, SensorReading};

// ---

/// Operations the edge device performs against the remote store.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Bulk upsert of grid points, all-or-nothing from the caller's view.
    async fn write_grid(&self, points: &[GridPoint]) -> Result<()>;

    /// Lightweight reachability probe.
    async fn ping(&self) -> Result<()>;

    /// All valid readings for `field_id` newer than `since`.
    async fn fetch_readings(
        &self,
        field_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>>;
}

/// HTTP implementation of [`RemoteStore`] against the platform API.
pub struct HttpRemoteStore {
    // ---
    client: Client,
    base_url: String,
    max_pages: u32,
}

impl HttpRemoteStore {
    /// Build a client with a bounded per-request timeout.
    pub fn new(base_url: &str, timeout: std::time::Duration, max_pages: u32) -> Result<Self> {
        // ---
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_pages,
        })
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn write_grid(&self, points: &[GridPoint]) -> Result<()> {
        // ---
        let url = format!("{}/grid/bulk", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(points)
            .send()
            .await
            .with_context(|| format!("Bulk grid write to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Bulk grid write rejected with status {}",
                response.status()
            ));
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        // ---
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Reachability probe to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("Probe returned status {}", response.status()));
        }

        Ok(())
    }

    /// Fetch readings page by page following the API's cursor, bounded by
    /// `max_pages` as a safety limit.
    async fn fetch_readings(
        &self,
        field_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>> {
        // ---
        let base = format!(
            "{}/readings?field_id={}&since={}",
            self.base_url,
            field_id,
            since.to_rfc3339()
        );

        let mut all_readings = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count = 0;

        loop {
            if page_count >= self.max_pages {
                tracing::debug!(
                    "Hit page limit of {}, stopping pagination. Fetched {} readings so far.",
                    self.max_pages,
                    all_readings.len()
                );
                break;
            }
            page_count += 1;

            let url = if let Some(ref cursor) = cursor {
                format!("{}&cursor={}", base, cursor)
            } else {
                base.clone()
            };

            tracing::debug!("Fetching readings page {} from: {}", page_count, url);

            let response: serde_json::Value =
                self.client.get(&url).send().await?.json().await?;

            if let Some(data) = response.get("results").and_then(|d| d.as_array()) {
                for (i, item) in data.iter().enumerate() {
                    match serde_json::from_value::<SensorReading>(item.clone()) {
                        Ok(reading) => all_readings.push(reading),
                        Err(e) => {
                            tracing::debug!(
                                "Failed to parse reading {} on page {}: {}",
                                i,
                                page_count,
                                e
                            );
                        }
                    }
                }
            } else {
                tracing::debug!(
                    "Page {} response missing 'results' field or not an array",
                    page_count
                );
            }

            cursor = response
                .get("next_cursor")
                .and_then(|c| c.as_str())
                .map(String::from);

            if cursor.is_none() {
                break;
            }
        }

        tracing::debug!(
            "Fetched {} readings from {} pages",
            all_readings.len(),
            page_count
        );
        Ok(all_readings)
    }
}
