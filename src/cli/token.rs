use crate::core::expiry;
use crate::core::models::{mask_token, Credential};
use crate::core::settings::Settings;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct TokenStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issued_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_in: Option<String>,
    refreshed: bool,
}

pub async fn run(json: bool, refresh: bool) -> Result<()> {
    let settings = Settings::load()?;
    let session = super::open_session(&settings)?;

    if refresh {
        session
            .force_refresh()
            .await
            .context("Token refresh failed")?;
    }

    let status = token_status(
        session.store().path().map(PathBuf::from),
        session.current().await.as_ref(),
        refresh,
        Utc::now(),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_text_output(&status);
    }

    Ok(())
}

fn token_status(
    path: Option<PathBuf>,
    credential: Option<&Credential>,
    refreshed: bool,
    now: DateTime<Utc>,
) -> TokenStatus {
    let expired = expiry::needs_refresh(credential, now);

    let Some(credential) = credential else {
        return TokenStatus {
            path,
            stored: false,
            access_token: None,
            issued_at: None,
            expires_at: None,
            expired,
            expires_in: None,
            refreshed,
        };
    };

    let expires_at = expiry::expires_at(credential);

    TokenStatus {
        path,
        stored: true,
        access_token: Some(mask_token(&credential.access_token)),
        issued_at: Some(credential.issued_at),
        expires_at: Some(expires_at),
        expired,
        expires_in: (!expired).then(|| format_remaining(expires_at, now)),
        refreshed,
    }
}

fn format_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = expires_at.signed_duration_since(now);

    if duration.num_seconds() <= 0 {
        return "now".to_string();
    }

    let total_minutes = duration.num_minutes();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn print_text_output(status: &TokenStatus) {
    if let Some(path) = &status.path {
        println!("Token file: {}", path.display());
    }

    if !status.stored {
        println!("No credential stored");
        return;
    }

    if status.refreshed {
        println!("Refreshed just now");
    }

    if let Some(token) = &status.access_token {
        println!("  {:<10} {}", "Access:", token);
    }
    if let Some(issued_at) = status.issued_at {
        println!("  {:<10} {}", "Issued:", issued_at.to_rfc3339());
    }
    match (&status.expires_in, status.expires_at) {
        (Some(remaining), Some(at)) => {
            println!("  {:<10} {} (in {})", "Expires:", at.to_rfc3339(), remaining)
        }
        (None, Some(at)) => println!("  {:<10} {} (expired)", "Expires:", at.to_rfc3339()),
        _ => {}
    }
}
