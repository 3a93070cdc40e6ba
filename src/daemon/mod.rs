mod app;
pub mod dbus;
pub mod polling;
pub mod server;

use crate::core::settings::Settings;
use anyhow::Result;

pub use dbus::{DBUS_NAME, DBUS_PATH};

pub async fn run(settings: Settings) -> Result<()> {
    tracing::info!(
        channel = %settings.polling.channel,
        interval_secs = settings.polling.interval_secs,
        "Starting order-sheet daemon"
    );

    app::run(settings).await
}
