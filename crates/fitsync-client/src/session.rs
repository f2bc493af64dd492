//! Wiring from configuration to the engine.

use std::sync::Arc;

use fitsync_engine::{FetchCoordinator, SnapshotRepository, Syncer};
use fitsync_fitbit::{
    Authenticator, AuthorizationState, Credentials, FitbitConfig, ResourceClient,
    build_http_client,
};
use tracing::{debug, info};

use crate::config::{ClientConfig, CredentialSource};
use crate::error::ClientResult;

/// Resolved credentials plus everything built from them.
///
/// One [`AuthorizationState`] is shared by every flow the session starts, so
/// a `watch` loop and a concurrent sync never open two listeners.
#[derive(Debug, Clone)]
pub struct Session {
    config: ClientConfig,
    fitbit: FitbitConfig,
    source: CredentialSource,
    authenticator: Authenticator,
}

impl Session {
    /// Resolves credentials (CLI flags, config.toml, credentials.json).
    pub fn open(
        config: &ClientConfig,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> ClientResult<Self> {
        let (credentials, source) = config.resolve_credentials(client_id, client_secret)?;
        debug!(?source, client_id = %credentials.client_id, "resolved credentials");
        Self::with_fitbit_config(config, config.fitbit_config(credentials), source)
    }

    pub fn with_fitbit_config(
        config: &ClientConfig,
        fitbit: FitbitConfig,
        source: CredentialSource,
    ) -> ClientResult<Self> {
        let authenticator =
            Authenticator::from_config(&fitbit, Arc::new(AuthorizationState::new()))?;
        Ok(Self {
            config: config.clone(),
            fitbit,
            source,
            authenticator,
        })
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn credentials(&self) -> &Credentials {
        &self.fitbit.credentials
    }

    pub fn credential_source(&self) -> CredentialSource {
        self.source
    }

    /// A syncer publishing into a fresh repository.
    pub fn syncer(&self) -> ClientResult<Syncer> {
        let http = build_http_client(self.fitbit.timeout)?;
        let client = ResourceClient::new(http, self.fitbit.endpoints.api_base.clone());
        Ok(Syncer::new(
            self.authenticator.clone(),
            FetchCoordinator::new(client),
            self.config.cache(),
            SnapshotRepository::new(),
            self.config.sync_settings(),
        ))
    }

    /// Saves CLI-given credentials to `credentials.json` so later runs find
    /// them. Returns false when they already came from a persisted source.
    pub fn remember_credentials(&self) -> ClientResult<bool> {
        if self.source != CredentialSource::Cli {
            return Ok(false);
        }
        let path = self.config.credentials_path();
        self.fitbit.credentials.save_to(&path)?;
        info!(path = %path.display(), "saved credentials");
        Ok(true)
    }
}
