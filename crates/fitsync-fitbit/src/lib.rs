//! Fitbit Web API client.
//!
//! This crate covers everything that talks to Fitbit:
//!
//! - [`Credentials`] and [`FitbitConfig`] - application registration and endpoints
//! - [`TokenStore`] - the persisted OAuth2 token with refresh support
//! - [`AuthorizationFlow`] - browser consent plus a one-shot localhost callback
//! - [`Authenticator`] - yields a usable access token, refreshing or re-authorizing
//! - [`ResourceClient`] - bearer-authenticated GETs for the profile and activity series
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────────┐  expired   ┌─────────────┐  rejected  ┌───────────────────┐
//!   │  TokenStore  │──────────▶│ OAuthClient │──────────▶│ AuthorizationFlow │
//!   └──────┬───────┘            └─────────────┘            └─────────┬─────────┘
//!          │ access token                                            │ code
//!          ▼                                                         ▼
//!   ┌────────────────┐                                     ┌──────────────────┐
//!   │ ResourceClient │                                     │ CallbackListener │
//!   └────────────────┘                                     └──────────────────┘
//! ```

pub mod auth;
pub mod callback;
pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod oauth;
pub mod resources;
pub mod tokens;

pub use auth::Authenticator;
pub use callback::{CallbackListener, PendingCallback};
pub use client::{DEFAULT_RETRY_AFTER_SECS, ResourceClient};
pub use config::{Credentials, FitbitConfig, FitbitEndpoints, build_http_client};
pub use error::{FitbitError, FitbitErrorCode, FitbitResult};
pub use flow::{
    AuthPhase, AuthorizationFlow, AuthorizationGuard, AuthorizationOutcome, AuthorizationState,
};
pub use oauth::{OAuthClient, TokenResponse};
pub use tokens::{TokenRecord, TokenStore};
