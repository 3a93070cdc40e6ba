use crate::core::models::Channel;
use crate::core::store::OrderBook;
use crate::daemon::polling::SchedulerController;
use zbus::{interface, Connection};

pub const DBUS_NAME: &str = "com.github.ordersheet.OrderSheet";
pub const DBUS_PATH: &str = "/com/github/ordersheet/OrderSheet";

pub struct OrderSheetService {
    scheduler: SchedulerController,
    book: OrderBook,
}

impl OrderSheetService {
    pub fn new(scheduler: SchedulerController, book: OrderBook) -> Self {
        Self { scheduler, book }
    }
}

#[interface(name = "com.github.ordersheet.OrderSheet")]
impl OrderSheetService {
    async fn refresh(&self) -> zbus::fdo::Result<()> {
        tracing::info!("D-Bus Refresh called");
        self.scheduler
            .refresh()
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    async fn select_channel(&self, channel: &str) -> zbus::fdo::Result<()> {
        let channel: Channel = channel
            .parse()
            .map_err(|e: anyhow::Error| zbus::fdo::Error::InvalidArgs(e.to_string()))?;

        tracing::info!(%channel, "D-Bus SelectChannel called");
        self.scheduler
            .select_channel(channel)
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Current order book as JSON.
    async fn snapshot(&self) -> zbus::fdo::Result<String> {
        let snapshot = self.book.snapshot().await;
        serde_json::to_string(&snapshot).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    #[zbus(property)]
    fn channel(&self) -> String {
        self.scheduler.channel().name().to_string()
    }

    #[zbus(property)]
    async fn is_refreshing(&self) -> bool {
        self.book.is_loading().await
    }

    #[zbus(property)]
    async fn order_count(&self) -> u32 {
        u32::try_from(self.book.order_count().await).unwrap_or(u32::MAX)
    }

    #[zbus(property)]
    fn state(&self) -> String {
        self.scheduler.state().as_str().to_string()
    }

    #[zbus(signal)]
    async fn orders_updated(
        ctx: &zbus::SignalContext<'_>,
        channel: &str,
        count: u32,
    ) -> zbus::Result<()>;
}

pub async fn start_dbus_server(service: OrderSheetService) -> zbus::Result<Connection> {
    let connection = zbus::connection::Builder::session()?
        .name(DBUS_NAME)?
        .serve_at(DBUS_PATH, service)?
        .build()
        .await?;

    tracing::info!(name = DBUS_NAME, path = DBUS_PATH, "D-Bus service registered");
    Ok(connection)
}

pub async fn emit_orders_updated(
    connection: &Connection,
    channel: Channel,
    count: usize,
) -> zbus::Result<()> {
    let iface = connection
        .object_server()
        .interface::<_, OrderSheetService>(DBUS_PATH)
        .await?;
    let ctx = iface.signal_context();

    OrderSheetService::orders_updated(ctx, channel.name(), u32::try_from(count).unwrap_or(u32::MAX))
        .await?;

    emit_state_changed(connection).await
}

/// Notifies property watchers after a cycle finished either way.
pub async fn emit_state_changed(connection: &Connection) -> zbus::Result<()> {
    let iface = connection
        .object_server()
        .interface::<_, OrderSheetService>(DBUS_PATH)
        .await?;
    let ctx = iface.signal_context();

    let service = iface.get().await;
    service.channel_changed(ctx).await?;
    service.state_changed(ctx).await?;
    service.order_count_changed(ctx).await?;
    service.is_refreshing_changed(ctx).await
}
