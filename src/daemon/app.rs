use crate::core::credentials::TokenFileWatcher;
use crate::core::settings::Settings;
use crate::core::store::OrderBook;
use crate::core::tokens::TokenStore;
use crate::daemon::dbus::{
    emit_orders_updated, emit_state_changed, start_dbus_server, OrderSheetService,
};
use crate::daemon::polling::{PollingScheduler, SchedulerEvent};
use crate::daemon::server;
use crate::upstream::{TokenSession, UpstreamClient};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

pub async fn run(settings: Settings) -> Result<()> {
    let store = match settings.storage.resolved_token_path() {
        Some(path) => TokenStore::open(path)?,
        None => {
            tracing::warn!("No data directory available, tokens will not survive a restart");
            TokenStore::in_memory()
        }
    };

    let upstream = UpstreamClient::new(&settings.upstream)?;
    tracing::info!(base_url = upstream.base_url(), "Using upstream order API");

    let session = Arc::new(TokenSession::new(
        store,
        upstream,
        settings.upstream.seed_refresh_token.clone(),
    ));
    let book = OrderBook::new();

    let _token_watcher = match session.store().path() {
        Some(path) => {
            let (watcher, change_rx) = TokenFileWatcher::start(path)?;
            tokio::spawn(reload_token_changes(change_rx, Arc::clone(&session)));
            Some(watcher)
        }
        None => None,
    };

    let (event_tx, event_rx) = mpsc::unbounded_channel::<SchedulerEvent>();
    let scheduler = PollingScheduler::new(Arc::clone(&session), book.clone(), &settings.polling)
        .with_events(event_tx)
        .spawn();

    let dbus_connection =
        match start_dbus_server(OrderSheetService::new(scheduler.controller(), book.clone())).await
        {
            Ok(connection) => Some(connection),
            Err(e) => {
                tracing::warn!(error = %e, "D-Bus unavailable, continuing without control surface");
                None
            }
        };

    tokio::spawn(forward_scheduler_events(event_rx, dbus_connection.clone()));

    let server_task = if settings.server.enabled {
        let session = Arc::clone(&session);
        let bind = settings.server.bind;
        Some(tokio::spawn(async move {
            if let Err(e) = server::serve(bind, session).await {
                tracing::error!(error = %e, "Passthrough server failed");
            }
        }))
    } else {
        None
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");

    scheduler.shutdown().await;
    if let Some(task) = server_task {
        task.abort();
    }
    // an exchange already sent must land in the token file before exit
    session.settle().await;

    Ok(())
}

async fn reload_token_changes(
    mut change_rx: mpsc::UnboundedReceiver<PathBuf>,
    session: Arc<TokenSession>,
) {
    while let Some(path) = change_rx.recv().await {
        match session.store().reload().await {
            Ok(true) => tracing::info!(?path, "Picked up credential rotated by another process"),
            Ok(false) => {}
            Err(e) => tracing::warn!(?path, error = %e, "Ignoring unreadable token file"),
        }
    }
}

async fn forward_scheduler_events(
    mut event_rx: mpsc::UnboundedReceiver<SchedulerEvent>,
    connection: Option<zbus::Connection>,
) {
    while let Some(event) = event_rx.recv().await {
        let Some(connection) = connection.as_ref() else {
            continue;
        };

        let result = match event {
            SchedulerEvent::OrdersUpdated { channel, count } => {
                emit_orders_updated(connection, channel, count).await
            }
            SchedulerEvent::CycleFailed { .. } => emit_state_changed(connection).await,
        };

        if let Err(e) = result {
            tracing::debug!(error = %e, "Failed to emit D-Bus signal");
        }
    }
}
