//! Interactive authorization-code flow.
//!
//! ```text
//! Idle ─▶ AwaitingCallback ─▶ ExchangingCode ─▶ Authorized
//!              │                    │
//!              └────────────────────┴──────────▶ Failed
//! ```
//!
//! At most one flow runs per [`AuthorizationState`]. A second trigger while
//! one is active returns [`AuthorizationOutcome::Skipped`] without binding a
//! listener. The in-progress flag is held by an [`AuthorizationGuard`] and is
//! released on every exit path when the guard drops.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::callback::CallbackListener;
use crate::config::{Credentials, FitbitConfig};
use crate::error::{FitbitError, FitbitResult};
use crate::oauth::OAuthClient;
use crate::tokens::{TokenRecord, TokenStore};

/// Where a flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Idle,
    AwaitingCallback,
    ExchangingCode,
    Authorized,
    Failed,
}

impl AuthPhase {
    /// True while a flow holds the state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::AwaitingCallback | Self::ExchangingCode)
    }
}

/// Shared, process-wide record of the authorization flow.
#[derive(Debug, Default)]
pub struct AuthorizationState {
    phase: Mutex<AuthPhase>,
}

impl AuthorizationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the state if no flow is active.
    ///
    /// Check and set happen under one lock, so two concurrent callers can
    /// never both succeed.
    pub fn try_acquire(self: &Arc<Self>) -> Option<AuthorizationGuard> {
        let mut phase = self.lock();
        if phase.is_active() {
            return None;
        }
        *phase = AuthPhase::AwaitingCallback;
        Some(AuthorizationGuard {
            state: Arc::clone(self),
            succeeded: false,
        })
    }

    /// True while a flow is running.
    pub fn in_progress(&self) -> bool {
        self.lock().is_active()
    }

    pub fn phase(&self) -> AuthPhase {
        *self.lock()
    }

    fn set(&self, phase: AuthPhase) {
        *self.lock() = phase;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuthPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive hold on an [`AuthorizationState`].
///
/// Dropping the guard ends the flow: `Authorized` if [`succeed`] was called,
/// `Failed` otherwise.
///
/// [`succeed`]: AuthorizationGuard::succeed
#[derive(Debug)]
pub struct AuthorizationGuard {
    state: Arc<AuthorizationState>,
    succeeded: bool,
}

impl AuthorizationGuard {
    pub fn advance(&self, phase: AuthPhase) {
        self.state.set(phase);
    }

    pub fn succeed(mut self) {
        self.succeeded = true;
    }
}

impl Drop for AuthorizationGuard {
    fn drop(&mut self) {
        let end = if self.succeeded {
            AuthPhase::Authorized
        } else {
            AuthPhase::Failed
        };
        self.state.set(end);
    }
}

/// Result of [`AuthorizationFlow::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// A new token was obtained and saved.
    Authorized(TokenRecord),
    /// Another flow was already running; nothing was started.
    Skipped,
}

/// Runs the browser consent flow and stores the resulting token.
#[derive(Debug, Clone)]
pub struct AuthorizationFlow {
    state: Arc<AuthorizationState>,
    oauth: OAuthClient,
    tokens: Arc<TokenStore>,
    callback_timeout: Duration,
    open_browser: bool,
}

impl AuthorizationFlow {
    pub fn new(
        state: Arc<AuthorizationState>,
        oauth: OAuthClient,
        tokens: Arc<TokenStore>,
        callback_timeout: Duration,
    ) -> Self {
        Self {
            state,
            oauth,
            tokens,
            callback_timeout,
            open_browser: true,
        }
    }

    pub fn from_config(
        config: &FitbitConfig,
        state: Arc<AuthorizationState>,
        oauth: OAuthClient,
        tokens: Arc<TokenStore>,
    ) -> Self {
        Self::new(state, oauth, tokens, config.callback_timeout)
            .with_open_browser(config.open_browser)
    }

    pub fn with_open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    pub fn state(&self) -> &Arc<AuthorizationState> {
        &self.state
    }

    /// Runs one flow unless another is active.
    ///
    /// # Errors
    ///
    /// [`FitbitError::Auth`] if the listener cannot start, the user denies
    /// consent, or the code exchange is rejected; [`FitbitError::Timeout`]
    /// if no callback arrives within the configured wait.
    pub async fn run(&self) -> FitbitResult<AuthorizationOutcome> {
        let Some(guard) = self.state.try_acquire() else {
            info!("authorization already in progress, skipping");
            return Ok(AuthorizationOutcome::Skipped);
        };

        let credentials = self.oauth.credentials();
        let listener = CallbackListener::bind(
            credentials.redirect_port,
            credentials.redirect_path()?,
        )
        .await?;
        let pending = listener.spawn();

        let url = self.oauth.authorization_url();
        self.present(&url, credentials).await;

        let code = tokio::time::timeout(self.callback_timeout, pending.wait())
            .await
            .map_err(|_| FitbitError::Timeout(self.callback_timeout))??;

        guard.advance(AuthPhase::ExchangingCode);
        info!("received authorization code, exchanging for token");
        let response = self.oauth.exchange_code(&code).await?;
        let record = TokenRecord::from_response(response, Utc::now());
        self.tokens.save(record.clone())?;

        guard.succeed();
        info!(user_id = %record.user_id, "authorization complete");
        Ok(AuthorizationOutcome::Authorized(record))
    }

    /// Shows the consent URL and optionally opens the browser without
    /// blocking the listener.
    async fn present(&self, url: &str, credentials: &Credentials) {
        eprintln!(
            "\nOpen this URL to authorize fitsync (waiting on {}):\n\n{}\n",
            credentials.redirect_uri, url
        );
        if !self.open_browser {
            return;
        }
        let target = url.to_string();
        match tokio::task::spawn_blocking(move || open::that(target)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("failed to open browser: {}", e),
            Err(e) => warn!("browser launcher panicked: {}", e),
        }
    }
}
