//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/fitsync/config.toml` by default. Every section is optional.
//!
//! Credential values (`client_id`, `client_secret`) support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use fitsync_engine::{SchedulerConfig, SnapshotCache, SyncSettings};
use fitsync_fitbit::{Credentials, FitbitConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Token file name inside the data directory.
pub const TOKEN_FILE_NAME: &str = "token_info.json";

/// Persisted credentials file name inside the data directory.
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Configuration for the fitsync client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Fitbit application settings.
    pub fitbit: FitbitSettings,

    /// Sync window and cache settings.
    pub sync: SyncOptions,

    /// HTTP and browser settings.
    pub http: HttpSettings,
}

/// Fitbit application settings.
///
/// Credentials here take precedence over `credentials.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitbitSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Redirect URI registered with the application.
    pub redirect_uri: Option<String>,

    /// Local port the callback listener binds.
    pub redirect_port: Option<u16>,

    /// Path to token storage.
    pub token_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Directory holding the token, cache, and credentials files.
    pub data_dir: Option<PathBuf>,

    /// Days shown when `--days` is not given.
    pub default_days: u32,

    /// Minimum days fetched on every refill.
    pub max_days: u32,

    /// Cache age limit.
    pub max_age_hours: u64,

    /// Interval of `fitsync watch`.
    pub interval_secs: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_days: 7,
            max_days: SyncSettings::DEFAULT_MAX_DAYS,
            max_age_hours: SyncSettings::DEFAULT_MAX_AGE_HOURS,
            interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// How long to wait for the browser redirect, in seconds.
    pub callback_timeout_secs: u64,

    /// Launch the system browser during authorization.
    pub open_browser: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: FitbitConfig::DEFAULT_TIMEOUT_SECS,
            callback_timeout_secs: FitbitConfig::DEFAULT_CALLBACK_TIMEOUT_SECS,
            open_browser: true,
        }
    }
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `--client-id` and `--client-secret`.
    Cli,
    /// `[fitbit]` section of config.toml.
    Config,
    /// `credentials.json` in the data directory.
    File,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitsync")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitsync")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.sync
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    pub fn token_path(&self) -> PathBuf {
        self.fitbit
            .token_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join(TOKEN_FILE_NAME))
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir().join(CREDENTIALS_FILE_NAME)
    }

    pub fn cache(&self) -> SnapshotCache {
        SnapshotCache::in_dir(&self.data_dir())
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            max_days: self.sync.max_days,
            max_age_hours: self.sync.max_age_hours,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(Duration::from_secs(self.sync.interval_secs))
    }

    /// `days` if given, else the configured default.
    pub fn days_or_default(&self, days: Option<u32>) -> u32 {
        days.unwrap_or(self.sync.default_days)
    }

    /// Builds the Fitbit client configuration around `credentials`.
    pub fn fitbit_config(&self, credentials: Credentials) -> FitbitConfig {
        FitbitConfig::new(credentials, self.token_path())
            .with_timeout(Duration::from_secs(self.http.timeout_secs))
            .with_callback_timeout(Duration::from_secs(self.http.callback_timeout_secs))
            .with_open_browser(self.http.open_browser)
    }

    /// Resolves credentials from, in order: CLI flags, `[fitbit]` in
    /// config.toml, then `credentials.json`.
    ///
    /// Redirect settings from `[fitbit]` apply to every source.
    pub fn resolve_credentials(
        &self,
        cli_client_id: Option<&str>,
        cli_client_secret: Option<&str>,
    ) -> ClientResult<(Credentials, CredentialSource)> {
        let (credentials, source) = match (cli_client_id, cli_client_secret) {
            (Some(id), Some(secret)) => (Credentials::new(id, secret), CredentialSource::Cli),
            (Some(_), None) | (None, Some(_)) => {
                return Err(ClientError::Config(
                    "--client-id and --client-secret must be given together".to_string(),
                ));
            }
            (None, None) => self.stored_credentials()?,
        };

        let credentials = self.apply_redirect(credentials);
        credentials.validate()?;
        Ok((credentials, source))
    }

    fn stored_credentials(&self) -> ClientResult<(Credentials, CredentialSource)> {
        match (&self.fitbit.client_id, &self.fitbit.client_secret) {
            (Some(id), Some(secret)) => {
                let id = crate::secret::resolve(id).map_err(|e| {
                    ClientError::Config(format!("failed to resolve client_id: {}", e))
                })?;
                let secret = crate::secret::resolve(secret).map_err(|e| {
                    ClientError::Config(format!("failed to resolve client_secret: {}", e))
                })?;
                return Ok((Credentials::new(id, secret), CredentialSource::Config));
            }
            (Some(_), None) => {
                return Err(ClientError::Config(
                    "client_secret is missing from [fitbit] section in config.toml".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ClientError::Config(
                    "client_id is missing from [fitbit] section in config.toml".to_string(),
                ));
            }
            (None, None) => {}
        }

        let path = self.credentials_path();
        if path.exists() {
            return Ok((Credentials::from_file(&path)?, CredentialSource::File));
        }

        Err(ClientError::AuthRequired(format!(
            "Fitbit credentials not found. Add to {}:\n  \
             [fitbit]\n  \
             client_id = \"YOUR_CLIENT_ID\"\n  \
             client_secret = \"YOUR_CLIENT_SECRET\"\n\n  \
             Or run: fitsync credentials set --client-id <ID> --client-secret <SECRET>",
            Self::default_path().display()
        )))
    }

    /// A port given without a URI moves the URI's port along with it.
    fn apply_redirect(&self, mut credentials: Credentials) -> Credentials {
        match (&self.fitbit.redirect_uri, self.fitbit.redirect_port) {
            (Some(uri), Some(port)) => credentials.with_redirect(uri.clone(), port),
            (Some(uri), None) => {
                credentials.redirect_uri = uri.clone();
                credentials
            }
            (None, Some(port)) => credentials.with_redirect_port(port),
            (None, None) => credentials,
        }
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.sync.default_days == 0 {
            return Err("sync.default_days must be at least 1".to_string());
        }
        if self.sync.max_days == 0 {
            return Err("sync.max_days must be at least 1".to_string());
        }
        if self.sync.interval_secs == 0 {
            return Err("sync.interval_secs must be greater than 0".to_string());
        }
        if self.http.timeout_secs == 0 {
            return Err("http.timeout_secs must be greater than 0".to_string());
        }
        if self.http.callback_timeout_secs == 0 {
            return Err("http.callback_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.sync.data_dir = Some(dir.to_path_buf());
        config
    }

    #[test]
    fn defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.sync.default_days, 7);
        assert_eq!(config.sync.max_days, 28);
        assert_eq!(config.sync.max_age_hours, 2);
        assert_eq!(config.sync.interval_secs, 3600);
        assert_eq!(config.http.callback_timeout_secs, 300);
        assert!(config.http.open_browser);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
[sync]
max_days = 60

[http]
open_browser = false
"#,
        )
        .unwrap();
        assert_eq!(config.sync.max_days, 60);
        assert_eq!(config.sync.default_days, 7);
        assert!(!config.http.open_browser);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.sync_settings().max_days, 60);
    }

    #[test]
    fn paths_follow_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert_eq!(config.token_path(), dir.path().join("token_info.json"));
        assert_eq!(config.credentials_path(), dir.path().join("credentials.json"));
        assert_eq!(config.cache().path(), dir.path().join("cache.json"));

        let mut custom = config.clone();
        custom.fitbit.token_path = Some(PathBuf::from("/tmp/tok.json"));
        assert_eq!(custom.token_path(), PathBuf::from("/tmp/tok.json"));
    }

    #[test]
    fn cli_credentials_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.fitbit.client_id = Some("from-config".to_string());
        config.fitbit.client_secret = Some("secret".to_string());

        let (creds, source) = config
            .resolve_credentials(Some("from-cli"), Some("cli-secret"))
            .unwrap();
        assert_eq!(source, CredentialSource::Cli);
        assert_eq!(creds.client_id, "from-cli");

        let (creds, source) = config.resolve_credentials(None, None).unwrap();
        assert_eq!(source, CredentialSource::Config);
        assert_eq!(creds.client_id, "from-config");
    }

    #[test]
    fn half_given_cli_pair_is_rejected() {
        let config = ClientConfig::default();
        assert!(matches!(
            config.resolve_credentials(Some("id"), None),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn config_secret_references_are_resolved() {
        unsafe {
            std::env::set_var("_FITSYNC_CFG_TEST_SECRET", "env-secret");
        }
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.fitbit.client_id = Some("23ABCD".to_string());
        config.fitbit.client_secret = Some("env::_FITSYNC_CFG_TEST_SECRET".to_string());

        let (creds, _) = config.resolve_credentials(None, None).unwrap();
        assert_eq!(creds.client_secret, "env-secret");
        unsafe {
            std::env::remove_var("_FITSYNC_CFG_TEST_SECRET");
        }
    }

    #[test]
    fn falls_back_to_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        assert!(matches!(
            config.resolve_credentials(None, None),
            Err(ClientError::AuthRequired(_))
        ));

        Credentials::new("23ABCD", "s3cret")
            .save_to(&config.credentials_path())
            .unwrap();
        config.fitbit.redirect_port = Some(9090);
        config.fitbit.redirect_uri = Some("http://localhost:9090/callback".to_string());

        let (creds, source) = config.resolve_credentials(None, None).unwrap();
        assert_eq!(source, CredentialSource::File);
        assert_eq!(creds.client_id, "23ABCD");
        assert_eq!(creds.redirect_port, 9090);
        assert_eq!(creds.redirect_uri, "http://localhost:9090/callback");
    }

    #[test]
    fn redirect_port_alone_moves_the_uri() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.fitbit.redirect_port = Some(9090);

        let (creds, _) = config.resolve_credentials(Some("23ABCD"), Some("s3cret")).unwrap();
        assert_eq!(creds.redirect_port, 9090);
        assert_eq!(creds.redirect_uri, "http://localhost:9090/");

        config.fitbit.redirect_uri = Some("http://localhost:8080/".to_string());
        assert!(matches!(
            config.resolve_credentials(Some("23ABCD"), Some("s3cret")),
            Err(ClientError::Fitbit(_))
        ));
    }

    #[test]
    fn missing_secret_in_config_errors() {
        let mut config = ClientConfig::default();
        config.fitbit.client_id = Some("23ABCD".to_string());
        let err = config.resolve_credentials(None, None).unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut config = ClientConfig::default();
        config.sync.max_days = 0;
        assert!(config.validate().unwrap_err().contains("max_days"));
    }

    #[test]
    fn fitbit_config_carries_http_settings() {
        let mut config = ClientConfig::default();
        config.http.callback_timeout_secs = 5;
        config.http.open_browser = false;
        let fitbit = config.fitbit_config(Credentials::new("a", "b"));
        assert_eq!(fitbit.callback_timeout, Duration::from_secs(5));
        assert!(!fitbit.open_browser);
        assert_eq!(fitbit.token_path, config.token_path());
    }
}
