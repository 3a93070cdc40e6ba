use std::path::PathBuf;
use thiserror::Error;

/// Errors from the token lifecycle and the upstream order API.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Refresh exchange failed at the network or HTTP level.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Order-list request failed at the network or HTTP level.
    #[error("Order fetch failed: {0}")]
    FetchFailed(String),

    /// Upstream answered 2xx with a body we could not interpret.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Nothing stored and no seed configured.
    #[error("No refresh token available - set upstream.seed_refresh_token in config.toml")]
    NoRefreshToken,

    #[error("Token storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token file {} is corrupt: {source}", path.display())]
    CorruptTokenFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SyncError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
