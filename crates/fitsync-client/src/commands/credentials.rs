//! Persisted application credentials.

use fitsync_core::fs::remove_if_exists;
use fitsync_fitbit::Credentials;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Save `--client-id`/`--client-secret` to `credentials.json`.
pub fn set(
    config: &ClientConfig,
    client_id: Option<&str>,
    client_secret: Option<&str>,
    redirect_uri: Option<String>,
    redirect_port: Option<u16>,
) -> ClientResult<()> {
    let (Some(id), Some(secret)) = (client_id, client_secret) else {
        return Err(ClientError::Config(
            "credentials set needs --client-id and --client-secret (or FITBIT_CLIENT_ID and FITBIT_CLIENT_SECRET)"
                .to_string(),
        ));
    };
    if crate::secret::is_reference(id) || crate::secret::is_reference(secret) {
        return Err(ClientError::Config(
            "secret references belong in config.toml, not credentials.json".to_string(),
        ));
    }

    let credentials = match (redirect_uri, redirect_port) {
        (Some(uri), Some(port)) => Credentials::new(id, secret).with_redirect(uri, port),
        (Some(uri), None) => {
            let mut credentials = Credentials::new(id, secret);
            credentials.redirect_uri = uri;
            credentials
        }
        (None, Some(port)) => Credentials::new(id, secret).with_redirect_port(port),
        (None, None) => Credentials::new(id, secret),
    };
    credentials.validate()?;

    let path = config.credentials_path();
    credentials.save_to(&path)?;
    info!(path = %path.display(), "saved credentials");
    println!("Credentials saved to {}", path.display());
    Ok(())
}

/// Delete `credentials.json`.
pub fn remove(config: &ClientConfig) -> ClientResult<()> {
    let path = config.credentials_path();
    if remove_if_exists(&path)? {
        println!("Removed {}", path.display());
    } else {
        println!("No credentials file at {}", path.display());
    }
    Ok(())
}
