pub mod orders;
pub mod refresh;
pub mod token;

use crate::core::settings::Settings;
use crate::core::tokens::TokenStore;
use crate::upstream::{TokenSession, UpstreamClient};
use anyhow::Result;

/// One-shot session sharing the daemon's token file, so a rotation made
/// here is visible to a running daemon and vice versa.
fn open_session(settings: &Settings) -> Result<TokenSession> {
    let store = match settings.storage.resolved_token_path() {
        Some(path) => TokenStore::open(path)?,
        None => TokenStore::in_memory(),
    };
    let upstream = UpstreamClient::new(&settings.upstream)?;

    Ok(TokenSession::new(
        store,
        upstream,
        settings.upstream.seed_refresh_token.clone(),
    ))
}
