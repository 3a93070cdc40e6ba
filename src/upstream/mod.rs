//! Client for the upstream order-management API.
//!
//! One host serves both the token exchange and the per-channel order lists.
//! Every request carries the configured timeout.

mod orders;
mod refresh;
pub mod session;

pub use session::{RefreshOutcome, TokenSession};

use crate::core::error::SyncError;
use crate::core::settings::UpstreamSettings;
use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self> {
        Self::with_base_url(&settings.base_url, settings.timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Reads a non-2xx response into a short `HTTP <status>: <body>` message.
async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();

    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

fn malformed(context: &str, err: impl std::fmt::Display) -> SyncError {
    SyncError::MalformedResponse(format!("{context}: {err}"))
}
