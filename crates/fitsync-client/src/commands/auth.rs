//! Authorization commands.

use chrono::{DateTime, Utc};
use fitsync_fitbit::{FitbitError, TokenRecord, TokenStore};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::session::Session;

/// Run the browser authorization flow.
///
/// Skipped when a token already exists, unless `force` is set. Credentials
/// given on the command line are saved to `credentials.json` either way.
pub async fn login(session: &Session, force: bool) -> ClientResult<()> {
    let tokens = session.authenticator().tokens();

    if !force && let Ok(record) = tokens.load() {
        session.remember_credentials()?;
        println!("Already authorized as {}.", user_label(&record));
        println!("Use --force to re-authorize.");
        return Ok(());
    }

    println!("Starting Fitbit authorization...");
    println!();
    println!("Approve access in the browser window that opens.");
    println!("If no browser opens, copy the URL printed below.");
    println!();

    let record = session.authenticator().authorize().await?;
    session.remember_credentials()?;

    info!(user_id = %record.user_id, "authorization successful");
    println!();
    println!("Authorization successful!");
    println!("Token saved to {}", tokens.path().display());

    Ok(())
}

/// Report the stored token.
pub fn status(config: &ClientConfig) -> ClientResult<()> {
    let store = TokenStore::new(config.token_path());
    match store.load() {
        Ok(record) => println!("{}", describe_token(&record, Utc::now())),
        Err(FitbitError::TokenNotFound { path }) => {
            println!("Not authorized (no token at {}).", path.display());
            println!("Run: fitsync auth login");
        }
        Err(FitbitError::TokenCorrupt { path, reason }) => {
            println!("Token at {} is unreadable: {}", path.display(), reason);
            println!("Run: fitsync auth login --force");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Delete the stored token.
pub fn logout(config: &ClientConfig) -> ClientResult<()> {
    let store = TokenStore::new(config.token_path());
    if store.clear()? {
        info!(path = %store.path().display(), "removed token");
        println!("Logged out. Token removed from {}", store.path().display());
    } else {
        println!("Not authorized; nothing to remove.");
    }
    Ok(())
}

/// Human-readable summary of a token record at `now`.
pub fn describe_token(record: &TokenRecord, now: DateTime<Utc>) -> String {
    let expiry = if record.is_expired(now) {
        "expired, refreshed on next sync".to_string()
    } else {
        let left = record.time_until_expiry(now);
        format!("in {}h {:02}m", left.num_hours(), left.num_minutes() % 60)
    };
    format!(
        "Authorized as {}\nExpires: {} ({})",
        user_label(record),
        record.expires_at.format("%Y-%m-%d %H:%M UTC"),
        expiry
    )
}

fn user_label(record: &TokenRecord) -> &str {
    if record.user_id.is_empty() {
        "unknown user"
    } else {
        &record.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record() -> TokenRecord {
        TokenRecord {
            access_token: "tok".to_string(),
            refresh_token: "ref".to_string(),
            expires_at: Utc.with_ymd_and_hms(2024, 9, 10, 9, 0, 0).unwrap(),
            user_id: "ABC123".to_string(),
        }
    }

    #[test]
    fn describes_valid_token() {
        let now = Utc.with_ymd_and_hms(2024, 9, 10, 7, 15, 0).unwrap();
        assert_eq!(
            describe_token(&record(), now),
            "Authorized as ABC123\nExpires: 2024-09-10 09:00 UTC (in 1h 45m)"
        );
    }

    #[test]
    fn describes_expired_token() {
        let record = record();
        let text = describe_token(&record, record.expires_at + Duration::seconds(1));
        assert!(text.ends_with("(expired, refreshed on next sync)"));
    }

    #[test]
    fn missing_user_id() {
        let record = TokenRecord {
            user_id: String::new(),
            ..record()
        };
        assert_eq!(user_label(&record), "unknown user");
    }

    #[test]
    fn status_and_logout_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.sync.data_dir = Some(dir.path().to_path_buf());

        status(&config).unwrap();
        logout(&config).unwrap();

        TokenStore::new(config.token_path()).save(record()).unwrap();
        status(&config).unwrap();
        logout(&config).unwrap();
        assert!(!config.token_path().exists());
    }
}
