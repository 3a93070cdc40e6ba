use super::UpstreamClient;
use crate::core::error::SyncError;
use crate::core::expiry;
use crate::core::models::Credential;
use crate::core::tokens::TokenStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(Credential),
    StillValid(Credential),
}

impl RefreshOutcome {
    pub fn into_credential(self) -> Credential {
        match self {
            RefreshOutcome::Refreshed(c) | RefreshOutcome::StillValid(c) => c,
        }
    }
}

/// Owns the token store and serializes every exchange against the upstream.
///
/// The upstream burns a refresh token when it is used. Exchanges run one at
/// a time, and a caller that queued behind another exchange for the same
/// token takes the stored result instead of presenting the spent token.
///
/// The exchange and the write that follows run on a task owned by the
/// session, so a caller that goes away mid-request cannot leave the upstream
/// rotated and the store holding the spent token.
pub struct TokenSession {
    store: Arc<TokenStore>,
    upstream: UpstreamClient,
    seed_refresh_token: Option<String>,
    refresh_guard: Arc<Mutex<()>>,
}

impl TokenSession {
    pub fn new(
        store: TokenStore,
        upstream: UpstreamClient,
        seed_refresh_token: Option<String>,
    ) -> Self {
        Self {
            store: Arc::new(store),
            upstream,
            seed_refresh_token: seed_refresh_token.filter(|t| !t.trim().is_empty()),
            refresh_guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    pub async fn current(&self) -> Option<Credential> {
        self.store.get().await
    }

    /// Returns the stored credential while it is inside its validity window,
    /// otherwise exchanges for a new one.
    pub async fn refresh_if_stale(&self, now: DateTime<Utc>) -> Result<RefreshOutcome, SyncError> {
        let current = self.store.get().await;

        if let Some(credential) = current.as_ref() {
            if !expiry::is_expired(credential.issued_at, now) {
                return Ok(RefreshOutcome::StillValid(credential.clone()));
            }
        }

        let observed = self.refresh_token_for(current.as_ref())?;
        tracing::info!(
            has_credential = current.is_some(),
            "Access token missing or expired, refreshing"
        );
        self.refresh_from(&observed).await.map(RefreshOutcome::Refreshed)
    }

    pub async fn valid_credential(&self, now: DateTime<Utc>) -> Result<Credential, SyncError> {
        self.refresh_if_stale(now)
            .await
            .map(RefreshOutcome::into_credential)
    }

    /// Exchanges regardless of the expiry policy.
    pub async fn force_refresh(&self) -> Result<Credential, SyncError> {
        let current = self.store.get().await;
        let observed = self.refresh_token_for(current.as_ref())?;
        self.refresh_from(&observed).await
    }

    /// Exchanges `observed` unless another caller already rotated it while
    /// this one waited for the guard.
    pub async fn refresh_from(&self, observed: &str) -> Result<Credential, SyncError> {
        let guard = Arc::clone(&self.refresh_guard).lock_owned().await;

        if let Some(current) = self.store.get().await {
            if current.refresh_token != observed {
                tracing::debug!("Refresh token already rotated, reusing stored credential");
                return Ok(current);
            }
        }

        let store = Arc::clone(&self.store);
        let upstream = self.upstream.clone();
        let observed = observed.to_string();

        let exchange = tokio::spawn(async move {
            let _guard = guard;
            let credential = upstream.refresh(&observed).await?;

            if let Err(e) = store.set(credential.clone()).await {
                // the new pair is still held in memory; the old one is already spent
                tracing::error!(error = %e, "Failed to persist refreshed credential");
            }

            tracing::info!(
                expires_at = %expiry::expires_at(&credential),
                "Stored refreshed credential"
            );
            Ok(credential)
        });

        exchange
            .await
            .map_err(|e| SyncError::UpstreamUnavailable(format!("Refresh task failed: {e}")))?
    }

    /// Waits until no exchange is in flight.
    pub async fn settle(&self) {
        let _guard = self.refresh_guard.lock().await;
    }

    fn refresh_token_for(&self, current: Option<&Credential>) -> Result<String, SyncError> {
        current
            .map(|c| c.refresh_token.clone())
            .or_else(|| self.seed_refresh_token.clone())
            .ok_or(SyncError::NoRefreshToken)
    }
}
