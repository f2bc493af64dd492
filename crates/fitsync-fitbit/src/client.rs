//! Bearer-authenticated access to the Fitbit Web API.

use fitsync_core::{DateWindow, ProfileRecord, ResourceKind, SeriesData};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{FitbitError, FitbitResult};
use crate::resources::{ActivityPayload, HeartRatePayload, ProfileEnvelope};

/// Delay assumed when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 3600;

const PROFILE_PATH: &str = "/1/user/-/profile.json";

/// Issues authenticated GETs and classifies failures.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    api_base: String,
}

impl ResourceClient {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// GETs `endpoint` (relative to the API base) and decodes the body.
    ///
    /// # Errors
    ///
    /// - [`FitbitError::RateLimited`] on 429, with the `Retry-After` delay
    /// - [`FitbitError::Upstream`] on any other non-success status
    /// - [`FitbitError::Parse`] if the body does not decode into `T`
    /// - [`FitbitError::Network`] on transport failure
    pub async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, token: &str) -> FitbitResult<T> {
        let url = format!("{}{}", self.api_base, endpoint);
        debug!(url = %url, "fetching");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FitbitError::network(format!("request to {} failed: {}", endpoint, e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            let message = response.text().await.unwrap_or_default();
            warn!(endpoint, retry_after_secs, "rate limited");
            return Err(FitbitError::RateLimited {
                retry_after_secs,
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FitbitError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(FitbitError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| FitbitError::parse(format!("invalid response from {}: {}", endpoint, e)))
    }

    /// The user's profile.
    pub async fn fetch_profile(&self, token: &str) -> FitbitResult<ProfileRecord> {
        let envelope: ProfileEnvelope = self.fetch(PROFILE_PATH, token).await?;
        Ok(envelope.user)
    }

    /// One resource series over `window`, already transformed.
    pub async fn fetch_series(
        &self,
        kind: ResourceKind,
        window: &DateWindow,
        token: &str,
    ) -> FitbitResult<SeriesData> {
        let endpoint = kind.endpoint_path(window);
        match kind {
            ResourceKind::HeartRate => {
                let payload: HeartRatePayload = self.fetch(&endpoint, token).await?;
                Ok(SeriesData::HeartRate(payload.into_series()))
            }
            ResourceKind::Steps | ResourceKind::Calories | ResourceKind::Elevation => {
                let value: serde_json::Value = self.fetch(&endpoint, token).await?;
                let payload = ActivityPayload::from_value(kind, value)?;
                Ok(SeriesData::Count(payload.into_series(kind)))
            }
        }
    }
}
