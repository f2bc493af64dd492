//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fitsync_core::TracingOutputFormat;

/// fitsync - Your Fitbit activity, synced and cached
#[derive(Debug, Parser)]
#[command(name = "fitsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "FITSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format (pretty, compact, json)
    #[arg(long, env = "FITSYNC_LOG_FORMAT", default_value = "compact")]
    pub log_format: TracingOutputFormat,

    /// Directory for the token, cache, and credentials files
    #[arg(long, env = "FITSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// OAuth client ID (from dev.fitbit.com)
    #[arg(long, global = true, env = "FITBIT_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret (from dev.fitbit.com)
    #[arg(long, global = true, env = "FITBIT_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorization commands
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Fetch data from Fitbit, or reuse a fresh cache
    Sync {
        /// Number of trailing days to publish
        #[arg(long, short)]
        days: Option<u32>,

        /// Ignore the cache and refetch everything
        #[arg(long, short)]
        force: bool,
    },

    /// Print the published data
    Show {
        /// Number of trailing days to show
        #[arg(long, short)]
        days: Option<u32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Read the cache only, never contact Fitbit
        #[arg(long)]
        offline: bool,
    },

    /// Sync periodically in the foreground
    Watch {
        /// Number of trailing days to publish
        #[arg(long, short)]
        days: Option<u32>,

        /// Seconds between syncs (overrides sync.interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Stored application credentials
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authorization actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Authorize with Fitbit in the browser
    Login {
        /// Force re-authorization even if a token exists
        #[arg(long, short)]
        force: bool,
    },

    /// Show the stored token
    Status,

    /// Delete the stored token
    Logout,
}

/// Credential actions.
#[derive(Debug, Subcommand)]
pub enum CredentialsAction {
    /// Save client credentials to credentials.json
    Set {
        /// Redirect URI registered with the application
        #[arg(long)]
        redirect_uri: Option<String>,

        /// Local port for the authorization callback
        #[arg(long)]
        redirect_port: Option<u16>,
    },

    /// Delete credentials.json
    Remove,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sync_flags() {
        let cli = Cli::try_parse_from(["fitsync", "sync", "--days", "14", "--force"]).unwrap();
        match cli.command {
            Some(Command::Sync { days, force }) => {
                assert_eq!(days, Some(14));
                assert!(force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_global_credentials_and_log_format() {
        let cli = Cli::try_parse_from([
            "fitsync",
            "--client-id",
            "23ABCD",
            "--client-secret",
            "s3cret",
            "--log-format",
            "json",
            "auth",
            "login",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.client_id.as_deref(), Some("23ABCD"));
        assert_eq!(cli.log_format, TracingOutputFormat::Json);
        assert!(matches!(
            cli.command,
            Some(Command::Auth {
                action: AuthAction::Login { force: true }
            })
        ));
    }

    #[test]
    fn credentials_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fitsync",
            "credentials",
            "set",
            "--client-id",
            "23ABCD",
            "--client-secret",
            "s3cret",
            "--redirect-port",
            "9090",
        ])
        .unwrap();
        assert_eq!(cli.client_id.as_deref(), Some("23ABCD"));
        assert_eq!(cli.client_secret.as_deref(), Some("s3cret"));
        assert!(matches!(
            cli.command,
            Some(Command::Credentials {
                action: CredentialsAction::Set {
                    redirect_port: Some(9090),
                    ..
                }
            })
        ));
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["fitsync", "--log-format", "xml"]).is_err());
    }
}
