//! Local HTTP passthrough for clients that want a token without talking to
//! the upstream themselves.

use crate::upstream::{RefreshOutcome, TokenSession};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Serialize)]
struct Message {
    message: &'static str,
}

pub fn router(session: Arc<TokenSession>) -> Router {
    Router::new()
        .route("/refreshToken", get(refresh_token_handler))
        .with_state(session)
}

async fn refresh_token_handler(State(session): State<Arc<TokenSession>>) -> Response {
    match session.refresh_if_stale(Utc::now()).await {
        Ok(RefreshOutcome::Refreshed(credential)) => Json(TokenPair {
            access_token: credential.access_token,
            refresh_token: credential.refresh_token,
        })
        .into_response(),
        Ok(RefreshOutcome::StillValid(_)) => Json(Message {
            message: "Token is still valid",
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Passthrough token refresh failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Message {
                    message: "Failed to refresh token",
                }),
            )
                .into_response()
        }
    }
}

pub async fn serve(bind: SocketAddr, session: Arc<TokenSession>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind passthrough server to {bind}"))?;
    tracing::info!(%bind, "Passthrough server listening");

    axum::serve(listener, router(session))
        .await
        .context("Passthrough server stopped")
}
