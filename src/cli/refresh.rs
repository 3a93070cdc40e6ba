use crate::core::models::Channel;
use crate::daemon::{DBUS_NAME, DBUS_PATH};
use anyhow::{Context, Result};

pub async fn run(channel: Option<Channel>) -> Result<()> {
    let connection = zbus::Connection::session()
        .await
        .context("Failed to connect to session D-Bus")?;

    let (method, confirmation) = match channel {
        Some(channel) => (
            "SelectChannel",
            format!("Switched daemon to {channel}, fetching orders"),
        ),
        None => ("Refresh", "Refresh triggered successfully".to_string()),
    };

    let reply = match channel {
        Some(channel) => {
            let arg = channel.name().to_lowercase();
            connection
                .call_method(Some(DBUS_NAME), DBUS_PATH, Some(DBUS_NAME), method, &(arg,))
                .await
        }
        None => {
            connection
                .call_method(Some(DBUS_NAME), DBUS_PATH, Some(DBUS_NAME), method, &())
                .await
        }
    };

    let _reply: () = reply
        .with_context(|| format!("Failed to call {method} method - is the daemon running?"))?
        .body()
        .deserialize()
        .context("Failed to deserialize response")?;

    println!("{confirmation}");
    Ok(())
}
