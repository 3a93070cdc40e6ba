use super::{describe_failure, malformed, UpstreamClient};
use crate::core::error::SyncError;
use crate::core::models::Credential;
use chrono::Utc;
use reqwest::header::ACCEPT;
use serde::Deserialize;

const REFRESH_PATH: &str = "/refresh_token";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
}

impl UpstreamClient {
    pub fn build_refresh_request(&self, refresh_token: &str) -> reqwest::Result<reqwest::Request> {
        self.client
            .post(self.endpoint(REFRESH_PATH))
            .query(&[("refresh_token", refresh_token)])
            .header(ACCEPT, "application/json")
            .build()
    }

    /// Exchanges `refresh_token` for a new pair. The upstream invalidates the
    /// presented token, so callers must not run two exchanges with the same
    /// value; `TokenSession` serializes them.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential, SyncError> {
        let request = self
            .build_refresh_request(refresh_token)
            .map_err(|e| SyncError::UpstreamUnavailable(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| SyncError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::UpstreamUnavailable(
                describe_failure(response).await,
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::UpstreamUnavailable(e.to_string()))?;

        let parsed: RefreshResponse =
            serde_json::from_str(&body).map_err(|e| malformed("refresh_token", e))?;

        if parsed.access_token.is_empty() || parsed.refresh_token.is_empty() {
            return Err(SyncError::MalformedResponse(
                "refresh_token: empty token in response".to_string(),
            ));
        }

        // stamped after the exchange completed, not when it was sent
        let issued_at = Utc::now();
        tracing::info!(%issued_at, "Exchanged refresh token");

        Ok(Credential::new(
            parsed.access_token,
            parsed.refresh_token,
            issued_at,
        ))
    }
}
