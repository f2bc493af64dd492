//! fitsync CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use fitsync_core::{TracingConfig, init_tracing};

use fitsync_client::cli::{AuthAction, Cli, Command, ConfigAction, CredentialsAction};
use fitsync_client::commands;
use fitsync_client::config::ClientConfig;
use fitsync_client::error::{ClientError, ClientResult};
use fitsync_client::session::Session;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::debug()
    } else if matches!(cli.command, Some(Command::Watch { .. })) {
        TracingConfig::watch()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config.with_format(cli.log_format)) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let mut config = if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().map_err(ClientError::Config)?
    };
    if cli.data_dir.is_some() {
        config.sync.data_dir = cli.data_dir.clone();
    }

    let client_id = cli.client_id.as_deref();
    let client_secret = cli.client_secret.as_deref();

    match cli.command {
        Some(Command::Auth { action }) => match action {
            AuthAction::Login { force } => {
                let session = Session::open(&config, client_id, client_secret)?;
                commands::auth::login(&session, force).await
            }
            AuthAction::Status => commands::auth::status(&config),
            AuthAction::Logout => commands::auth::logout(&config),
        },
        Some(Command::Sync { days, force }) => {
            let session = Session::open(&config, client_id, client_secret)?;
            commands::sync::run(&session, config.days_or_default(days), force).await
        }
        Some(Command::Show {
            days,
            json,
            offline,
        }) => {
            let days = config.days_or_default(days);
            if offline {
                commands::show::offline(&config, days, json)
            } else {
                let session = Session::open(&config, client_id, client_secret)?;
                commands::show::run(&session, days, json).await
            }
        }
        Some(Command::Watch { days, interval }) => {
            let session = Session::open(&config, client_id, client_secret)?;
            let mut scheduler = config.scheduler_config();
            if let Some(secs) = interval {
                scheduler.sync_interval = std::time::Duration::from_secs(secs.max(1));
            }
            commands::watch::run(&session, config.days_or_default(days), scheduler).await
        }
        Some(Command::Credentials { action }) => match action {
            CredentialsAction::Set {
                redirect_uri,
                redirect_port,
            } => commands::credentials::set(
                &config,
                client_id,
                client_secret,
                redirect_uri,
                redirect_port,
            ),
            CredentialsAction::Remove => commands::credentials::remove(&config),
        },
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config),
        },
        None => {
            println!("fitsync - Your Fitbit activity, synced and cached");
            println!();
            println!("Run 'fitsync --help' for usage information.");
            println!();
            println!("Quick start:");
            println!(
                "  1. Save your app credentials: fitsync credentials set --client-id <ID> --client-secret <SECRET>"
            );
            println!("  2. Authorize in the browser:   fitsync auth login");
            println!("  3. Show the last week:         fitsync show");
            Ok(())
        }
    }
}
