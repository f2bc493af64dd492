//! Obtaining a usable access token.
//!
//! [`Authenticator::access_token`] is the one call the sync pipeline makes:
//! it loads the stored token, refreshes it when expired, and falls back to
//! the interactive flow when no token exists or the refresh is rejected.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{FitbitConfig, build_http_client};
use crate::error::{FitbitError, FitbitResult};
use crate::flow::{AuthorizationFlow, AuthorizationOutcome, AuthorizationState};
use crate::oauth::OAuthClient;
use crate::tokens::{TokenRecord, TokenStore};

#[derive(Debug, Clone)]
pub struct Authenticator {
    tokens: Arc<TokenStore>,
    oauth: OAuthClient,
    flow: AuthorizationFlow,
}

impl Authenticator {
    pub fn new(tokens: Arc<TokenStore>, oauth: OAuthClient, flow: AuthorizationFlow) -> Self {
        Self {
            tokens,
            oauth,
            flow,
        }
    }

    /// Wires the token store, OAuth client, and flow from one config.
    pub fn from_config(config: &FitbitConfig, state: Arc<AuthorizationState>) -> FitbitResult<Self> {
        config.credentials.validate()?;
        let http = build_http_client(config.timeout)?;
        let oauth = OAuthClient::from_config(config, http);
        let tokens = Arc::new(TokenStore::new(&config.token_path));
        let flow = AuthorizationFlow::from_config(config, state, oauth.clone(), Arc::clone(&tokens));
        Ok(Self::new(tokens, oauth, flow))
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn flow(&self) -> &AuthorizationFlow {
        &self.flow
    }

    /// Returns a non-expired access token, authorizing if necessary.
    ///
    /// A rejected refresh deletes the stored token before the interactive
    /// flow starts.
    pub async fn access_token(&self) -> FitbitResult<String> {
        let stored = match self.tokens.current() {
            Some(record) => Ok(record),
            None => self.tokens.load(),
        };

        let record = match stored {
            Ok(record) if !record.is_expired(Utc::now()) => {
                debug!(expires_at = %record.expires_at, "using stored access token");
                record
            }
            Ok(_) => match self.tokens.refresh(&self.oauth).await {
                Ok(record) => record,
                Err(FitbitError::TokenRefresh { status, body }) => {
                    warn!(status, body = %body, "refresh token rejected, re-authorizing");
                    self.tokens.clear()?;
                    self.authorize().await?
                }
                Err(e) => return Err(e),
            },
            Err(FitbitError::TokenNotFound { .. }) => {
                info!("no stored token, starting authorization");
                self.authorize().await?
            }
            Err(FitbitError::TokenCorrupt { reason, .. }) => {
                warn!(reason = %reason, "stored token is unreadable, re-authorizing");
                self.tokens.clear()?;
                self.authorize().await?
            }
            Err(e) => return Err(e),
        };

        Ok(record.access_token)
    }

    /// Runs the interactive flow.
    ///
    /// Fails with [`FitbitError::AuthorizationInProgress`] if another flow
    /// holds the shared state.
    pub async fn authorize(&self) -> FitbitResult<TokenRecord> {
        match self.flow.run().await? {
            AuthorizationOutcome::Authorized(record) => Ok(record),
            AuthorizationOutcome::Skipped => Err(FitbitError::AuthorizationInProgress),
        }
    }

    /// Deletes the stored token. Returns true if one existed.
    pub fn logout(&self) -> FitbitResult<bool> {
        self.tokens.clear()
    }
}
