//! Configuration commands.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    if config.fitbit.client_id.is_some() || config.fitbit.client_secret.is_some() {
        config
            .resolve_credentials(None, None)
            .map_err(|e| ClientError::Config(format!("invalid Fitbit credentials: {}", e)))?;
        println!("Fitbit credentials are valid.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and data file paths.
pub fn path(config: &ClientConfig) -> ClientResult<()> {
    println!("config: {}", ClientConfig::default_path().display());
    println!("data: {}", config.data_dir().display());
    println!("token: {}", config.token_path().display());
    println!("cache: {}", config.cache().path().display());
    Ok(())
}
