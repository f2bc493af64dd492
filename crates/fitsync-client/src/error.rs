//! Client error types.

use std::fmt;

use fitsync_engine::EngineError;
use fitsync_fitbit::FitbitError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Authorization or upstream failure.
    Fitbit(FitbitError),
    /// Sync or cache failure.
    Engine(EngineError),
    /// IO error.
    Io(std::io::Error),
    /// No usable credentials or token.
    AuthRequired(String),
    /// Output could not be rendered.
    Output(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Fitbit(err) => write!(f, "{}", err),
            Self::Engine(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
            Self::Output(msg) => write!(f, "output error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fitbit(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<FitbitError> for ClientError {
    fn from(err: FitbitError) -> Self {
        Self::Fitbit(err)
    }
}

impl From<EngineError> for ClientError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Fitbit(inner) => Self::Fitbit(inner),
            other => Self::Engine(other),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}
