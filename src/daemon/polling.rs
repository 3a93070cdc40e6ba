use crate::core::error::SyncError;
use crate::core::expiry;
use crate::core::models::{Channel, Credential, DateWindow};
use crate::core::settings::PollingSettings;
use crate::core::store::OrderBook;
use crate::upstream::TokenSession;
use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Initializing,
    Polling,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Initializing => "initializing",
            SchedulerState::Polling => "polling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Run a full cycle now: new token, new fetch.
    Refresh,
    /// Switch channel and fetch it with the current token.
    SelectChannel(Channel),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    OrdersUpdated { channel: Channel, count: usize },
    CycleFailed { channel: Channel, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenMode {
    IfStale,
    Force,
}

pub struct PollingScheduler {
    session: Arc<TokenSession>,
    book: OrderBook,
    interval: Duration,
    lookback_days: u32,
    lead_days: u32,
    channel: watch::Sender<Channel>,
    state: watch::Sender<SchedulerState>,
    events: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

impl PollingScheduler {
    pub fn new(session: Arc<TokenSession>, book: OrderBook, settings: &PollingSettings) -> Self {
        let (channel, _) = watch::channel(settings.channel);
        let (state, _) = watch::channel(SchedulerState::Idle);

        Self {
            session,
            book,
            interval: settings.interval(),
            lookback_days: settings.lookback_days,
            lead_days: settings.lead_days,
            channel,
            state,
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<SchedulerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Window used by a cycle starting on `today`.
    pub fn window_for(&self, today: NaiveDate) -> DateWindow {
        DateWindow::trailing(today, self.lookback_days, self.lead_days)
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let controller = SchedulerController {
            commands,
            channel: self.channel.subscribe(),
            state: self.state.subscribe(),
        };

        let task = tokio::spawn(self.run(command_rx));

        SchedulerHandle { task, controller }
    }

    async fn run(self, mut commands: mpsc::UnboundedReceiver<SchedulerCommand>) {
        let channel = *self.channel.borrow();
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            %channel,
            "Polling scheduler starting"
        );

        self.state.send_replace(SchedulerState::Initializing);
        self.cycle(TokenMode::IfStale).await;
        self.state.send_replace(SchedulerState::Polling);

        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.cycle(TokenMode::Force).await;
                }
                Some(command) = commands.recv() => {
                    match command {
                        SchedulerCommand::Refresh => {
                            tracing::info!("Manual refresh requested");
                            self.cycle(TokenMode::Force).await;
                            interval.reset();
                        }
                        SchedulerCommand::SelectChannel(channel) => {
                            tracing::info!(%channel, "Channel selected");
                            self.channel.send_replace(channel);
                            self.cycle(TokenMode::IfStale).await;
                        }
                    }
                }
            }
        }
    }

    async fn cycle(&self, mode: TokenMode) {
        let channel = *self.channel.borrow();

        self.book.set_loading(true).await;
        let result = self.run_cycle(channel, mode).await;
        self.book.set_loading(false).await;

        let event = match result {
            Ok(count) => {
                tracing::info!(%channel, count, "Orders updated");
                SchedulerEvent::OrdersUpdated { channel, count }
            }
            Err(e) => {
                let error = e.to_string();
                let failures = self.book.record_failure(error.clone()).await;
                tracing::warn!(
                    %channel,
                    error = %error,
                    consecutive_failures = failures,
                    "Order cycle failed, keeping previous orders until next tick"
                );
                SchedulerEvent::CycleFailed { channel, error }
            }
        };

        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    async fn run_cycle(&self, channel: Channel, mode: TokenMode) -> Result<usize, SyncError> {
        let credential = self.credential(mode).await?;

        // recomputed every cycle so a long-running daemon follows the calendar
        let window = self.window_for(Local::now().date_naive());

        let orders = self
            .session
            .upstream()
            .fetch_orders(&credential.access_token, channel, &window)
            .await?;

        let count = orders.len();
        self.book.publish(channel, window, orders).await;
        Ok(count)
    }

    async fn credential(&self, mode: TokenMode) -> Result<Credential, SyncError> {
        match mode {
            TokenMode::IfStale => self.session.valid_credential(Utc::now()).await,
            TokenMode::Force => match self.session.force_refresh().await {
                Ok(credential) => Ok(credential),
                Err(e) => {
                    let fallback = self
                        .session
                        .current()
                        .await
                        .filter(|c| !expiry::is_expired(c.issued_at, Utc::now()));
                    match fallback {
                        Some(credential) => {
                            tracing::warn!(
                                error = %e,
                                "Token refresh failed, fetching with the still-valid token"
                            );
                            Ok(credential)
                        }
                        None => Err(e),
                    }
                }
            },
        }
    }
}

/// Cloneable control surface for a running scheduler.
#[derive(Clone)]
pub struct SchedulerController {
    commands: mpsc::UnboundedSender<SchedulerCommand>,
    channel: watch::Receiver<Channel>,
    state: watch::Receiver<SchedulerState>,
}

impl SchedulerController {
    pub fn refresh(&self) -> Result<()> {
        self.send(SchedulerCommand::Refresh)
    }

    pub fn select_channel(&self, channel: Channel) -> Result<()> {
        self.send(SchedulerCommand::SelectChannel(channel))
    }

    pub fn channel(&self) -> Channel {
        *self.channel.borrow()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    fn send(&self, command: SchedulerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow::anyhow!("Polling scheduler is not running"))
    }
}

/// Owns the scheduler task. Dropping it cancels the timer together with any
/// request in flight.
pub struct SchedulerHandle {
    task: JoinHandle<()>,
    controller: SchedulerController,
}

impl SchedulerHandle {
    pub fn controller(&self) -> SchedulerController {
        self.controller.clone()
    }

    pub async fn shutdown(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        tracing::info!("Polling scheduler stopped");
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
