//! Error types for Fitbit API operations.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// High-level classification of a [`FitbitError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitbitErrorCode {
    /// The authorization flow failed or was denied.
    AuthorizationFailed,
    /// Another authorization flow is already running.
    AuthorizationInProgress,
    /// The refresh token was rejected.
    TokenRejected,
    /// No usable token is stored.
    TokenUnavailable,
    /// Too many requests.
    RateLimited,
    /// Upstream answered with a non-success status.
    UpstreamError,
    /// The response body did not have the expected shape.
    InvalidResponse,
    /// Connection failed, timed out, or similar.
    NetworkError,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// Local filesystem failure.
    IoError,
}

impl FitbitErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::UpstreamError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationFailed => "authorization_failed",
            Self::AuthorizationInProgress => "authorization_in_progress",
            Self::TokenRejected => "token_rejected",
            Self::TokenUnavailable => "token_unavailable",
            Self::RateLimited => "rate_limited",
            Self::UpstreamError => "upstream_error",
            Self::InvalidResponse => "invalid_response",
            Self::NetworkError => "network_error",
            Self::ConfigurationError => "configuration_error",
            Self::IoError => "io_error",
        }
    }
}

impl fmt::Display for FitbitErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors produced while authorizing against or fetching from Fitbit.
#[derive(Debug, Error)]
pub enum FitbitError {
    /// Authorization failed: bad callback, denied consent, rejected code.
    #[error("authorization failed: {0}")]
    Auth(String),

    /// A second flow was requested while one is running.
    #[error("an authorization flow is already in progress")]
    AuthorizationInProgress,

    /// No callback arrived in time.
    #[error("timed out after {}s waiting for the authorization callback", .0.as_secs())]
    Timeout(Duration),

    /// The token endpoint refused the refresh token.
    #[error("token refresh rejected (HTTP {status}): {body}")]
    TokenRefresh { status: u16, body: String },

    /// HTTP 429 from the API.
    #[error("rate limited, retry after {retry_after_secs}s: {message}")]
    RateLimited {
        retry_after_secs: u64,
        message: String,
    },

    /// Any other non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("no token stored at {}", path.display())]
    TokenNotFound { path: PathBuf },

    #[error("token file {} is unreadable: {reason}", path.display())]
    TokenCorrupt { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FitbitError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The category of this error.
    pub fn code(&self) -> FitbitErrorCode {
        match self {
            Self::Auth(_) | Self::Timeout(_) => FitbitErrorCode::AuthorizationFailed,
            Self::AuthorizationInProgress => FitbitErrorCode::AuthorizationInProgress,
            Self::TokenRefresh { .. } => FitbitErrorCode::TokenRejected,
            Self::TokenNotFound { .. } | Self::TokenCorrupt { .. } => {
                FitbitErrorCode::TokenUnavailable
            }
            Self::RateLimited { .. } => FitbitErrorCode::RateLimited,
            Self::Upstream { .. } => FitbitErrorCode::UpstreamError,
            Self::Parse(_) => FitbitErrorCode::InvalidResponse,
            Self::Network(_) => FitbitErrorCode::NetworkError,
            Self::Config(_) => FitbitErrorCode::ConfigurationError,
            Self::Io(_) => FitbitErrorCode::IoError,
        }
    }

    /// Returns true if retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            // Client errors other than 429 will not fix themselves.
            Self::Upstream { status, .. } => *status >= 500,
            other => other.code().is_retryable(),
        }
    }

    /// The server-requested delay for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs, ..
            } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FitbitError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result alias for Fitbit operations.
pub type FitbitResult<T> = Result<T, FitbitError>;
