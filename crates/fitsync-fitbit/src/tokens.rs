//! OAuth token persistence and renewal.
//!
//! [`TokenStore`] owns the single [`TokenRecord`]. Every mutation is written
//! straight back to disk through an atomic rename with owner-only
//! permissions, so a crash never leaves a half-written token file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FitbitError, FitbitResult};
use crate::oauth::{OAuthClient, TokenResponse};

/// An OAuth2 token pair with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    /// Upstream user identifier.
    #[serde(default)]
    pub user_id: String,
}

impl TokenRecord {
    /// Builds a record from a token endpoint response received at `now`.
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            expires_at: expiry(now, response.expires_in),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            user_id: response.user_id.unwrap_or_default(),
        }
    }

    /// True iff `now >= expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Overwrites the token pair and expiry in place after a refresh.
    pub fn apply_refresh(&mut self, response: TokenResponse, now: DateTime<Utc>) {
        self.access_token = response.access_token;
        self.refresh_token = response.refresh_token;
        self.expires_at = expiry(now, response.expires_in);
        if let Some(user_id) = response.user_id {
            self.user_id = user_id;
        }
    }

    /// Time left before expiry (negative once expired).
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

fn expiry(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    Duration::try_seconds(expires_in)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(now)
}

/// File-backed store for the token record.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    record: RwLock<Option<TokenRecord>>,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            record: RwLock::new(None),
        }
    }

    /// Reads the token file into memory.
    ///
    /// Fails with [`FitbitError::TokenNotFound`] if the file is absent and
    /// [`FitbitError::TokenCorrupt`] if it cannot be parsed. Either one means
    /// the caller has to authorize.
    pub fn load(&self) -> FitbitResult<TokenRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no token file");
                return Err(FitbitError::TokenNotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let record: TokenRecord =
            serde_json::from_str(&content).map_err(|e| FitbitError::TokenCorrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        debug!(path = %self.path.display(), user_id = %record.user_id, "loaded token");
        self.set_current(Some(record.clone()));
        Ok(record)
    }

    /// Persists `record` atomically and makes it current.
    pub fn save(&self, record: TokenRecord) -> FitbitResult<()> {
        let content = serde_json::to_string_pretty(&record)
            .map_err(|e| FitbitError::parse(format!("failed to serialize token: {}", e)))?;
        fitsync_core::fs::write_atomic(
            &self.path,
            content.as_bytes(),
            Some(fitsync_core::fs::PRIVATE_MODE),
        )?;
        debug!(path = %self.path.display(), "saved token");
        self.set_current(Some(record));
        Ok(())
    }

    /// The in-memory record, if loaded or saved.
    pub fn current(&self) -> Option<TokenRecord> {
        self.record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forgets the record and deletes the token file.
    ///
    /// Returns true if a file was removed.
    pub fn clear(&self) -> FitbitResult<bool> {
        self.set_current(None);
        let removed = fitsync_core::fs::remove_if_exists(&self.path)?;
        if removed {
            info!(path = %self.path.display(), "removed stored token");
        }
        Ok(removed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exchanges the refresh token for a new pair and persists the result.
    ///
    /// On [`FitbitError::TokenRefresh`] the stored token is left untouched;
    /// the caller decides whether to clear it and re-authorize. Calling this
    /// with an unexpired token is harmless: the new pair simply replaces it.
    pub async fn refresh(&self, oauth: &OAuthClient) -> FitbitResult<TokenRecord> {
        let mut record = match self.current() {
            Some(record) => record,
            None => self.load()?,
        };

        let response = oauth.refresh(&record.refresh_token).await?;
        record.apply_refresh(response, Utc::now());
        self.save(record.clone())?;
        info!(expires_at = %record.expires_at, "refreshed access token");
        Ok(record)
    }

    fn set_current(&self, record: Option<TokenRecord>) {
        *self.record.write().unwrap_or_else(PoisonError::into_inner) = record;
    }
}
