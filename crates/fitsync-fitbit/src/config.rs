//! Fitbit application registration and endpoint configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FitbitError, FitbitResult};

/// Default consent page.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.fitbit.com/oauth2/authorize";

/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";

/// Default Web API base.
pub const DEFAULT_API_BASE: &str = "https://api.fitbit.com";

/// Scopes requested during authorization.
pub const DEFAULT_SCOPES: &str =
    "activity heartrate location nutrition profile settings sleep social weight";

/// Default loopback port for the redirect.
pub const DEFAULT_REDIRECT_PORT: u16 = 8080;

/// Client credentials of a registered Fitbit application.
///
/// Users register a "Personal" application on dev.fitbit.com and provide the
/// client ID and secret. The redirect URI must match the one registered.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
}

fn default_redirect_uri() -> String {
    format!("http://localhost:{}/", DEFAULT_REDIRECT_PORT)
}

fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

impl Credentials {
    /// Credentials with the default `http://localhost:8080/` redirect.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: default_redirect_uri(),
            redirect_port: DEFAULT_REDIRECT_PORT,
        }
    }

    /// Sets the redirect URI and the port the callback listener binds.
    pub fn with_redirect(mut self, redirect_uri: impl Into<String>, port: u16) -> Self {
        self.redirect_uri = redirect_uri.into();
        self.redirect_port = port;
        self
    }

    /// Moves the callback listener to `port` and rewrites the port of the
    /// redirect URI to match.
    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        if let Ok(mut url) = Url::parse(&self.redirect_uri)
            && url.set_port(Some(port)).is_ok()
        {
            self.redirect_uri = url.to_string();
        }
        self
    }

    /// Checks that all fields are present, the redirect URI parses, and the
    /// URI points at the port the listener binds.
    pub fn validate(&self) -> FitbitResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(FitbitError::config("client_id is required"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(FitbitError::config("client_secret is required"));
        }
        if self.redirect_port == 0 {
            return Err(FitbitError::config("redirect_port must be non-zero"));
        }
        let url = self.redirect_url()?;
        if let Some(uri_port) = url.port_or_known_default()
            && uri_port != self.redirect_port
        {
            return Err(FitbitError::config(format!(
                "redirect_uri {:?} uses port {} but redirect_port is {}",
                self.redirect_uri, uri_port, self.redirect_port
            )));
        }
        Ok(())
    }

    fn redirect_url(&self) -> FitbitResult<Url> {
        Url::parse(&self.redirect_uri).map_err(|e| {
            FitbitError::config(format!("invalid redirect_uri {:?}: {}", self.redirect_uri, e))
        })
    }

    /// The path component of the redirect URI; the only route the callback
    /// listener serves.
    pub fn redirect_path(&self) -> FitbitResult<String> {
        Ok(self.redirect_url()?.path().to_string())
    }

    /// `Authorization` header value for the token endpoint.
    pub fn basic_authorization(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// Loads credentials from a JSON file.
    pub fn from_file(path: &Path) -> FitbitResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> FitbitResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| FitbitError::config(format!("failed to parse credentials: {}", e)))
    }

    /// Persists credentials as pretty JSON, readable only by the owner.
    pub fn save_to(&self, path: &Path) -> FitbitResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FitbitError::config(format!("failed to serialize credentials: {}", e)))?;
        fitsync_core::fs::write_atomic(
            path,
            json.as_bytes(),
            Some(fitsync_core::fs::PRIVATE_MODE),
        )?;
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("redirect_port", &self.redirect_port)
            .finish()
    }
}

/// Upstream URLs. Overridable so tests can target a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitbitEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for FitbitEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl FitbitEndpoints {
    /// All endpoints rooted at `base`.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{}/oauth2/authorize", base),
            token_url: format!("{}/oauth2/token", base),
            api_base: base.to_string(),
        }
    }
}

/// Everything needed to authorize and fetch.
#[derive(Debug, Clone)]
pub struct FitbitConfig {
    pub credentials: Credentials,
    pub endpoints: FitbitEndpoints,
    /// Space-separated scope string.
    pub scopes: String,
    /// Where the token record is persisted.
    pub token_path: PathBuf,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// How long to wait for the browser redirect.
    pub callback_timeout: Duration,
    /// Launch the system browser for consent.
    pub open_browser: bool,
}

impl FitbitConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 300;

    pub fn new(credentials: Credentials, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials,
            endpoints: FitbitEndpoints::default(),
            scopes: DEFAULT_SCOPES.to_string(),
            token_path: token_path.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            callback_timeout: Duration::from_secs(Self::DEFAULT_CALLBACK_TIMEOUT_SECS),
            open_browser: true,
        }
    }

    pub fn with_endpoints(mut self, endpoints: FitbitEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    pub fn with_open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }
}

/// Builds the shared HTTP client.
pub fn build_http_client(timeout: Duration) -> FitbitResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(format!("fitsync/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FitbitError::config(format!("failed to build HTTP client: {}", e)))
}
