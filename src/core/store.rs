use crate::core::models::{Channel, DateWindow, Order};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct BookInner {
    channel: Option<Channel>,
    orders: Vec<Order>,
    window: Option<DateWindow>,
    fetched_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    consecutive_failures: u32,
    loading: bool,
}

/// Point-in-time copy of what the presentation layer shows.
#[derive(Debug, Clone, Serialize)]
pub struct BookSnapshot {
    /// Channel the `orders` were fetched for.
    pub channel: Option<Channel>,
    pub orders: Vec<Order>,
    pub window: Option<DateWindow>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub loading: bool,
}

/// Last successful order fetch plus loading/error state. A failed cycle
/// leaves the previous orders in place.
#[derive(Clone, Default)]
pub struct OrderBook {
    inner: Arc<RwLock<BookInner>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> BookSnapshot {
        let inner = self.inner.read().await;
        BookSnapshot {
            channel: inner.channel,
            orders: inner.orders.clone(),
            window: inner.window,
            fetched_at: inner.fetched_at,
            last_error: inner.last_error.clone(),
            consecutive_failures: inner.consecutive_failures,
            loading: inner.loading,
        }
    }

    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.read().await.loading
    }

    pub async fn set_loading(&self, loading: bool) {
        self.inner.write().await.loading = loading;
    }

    /// Replaces the whole collection; nothing carries over between fetches.
    pub async fn publish(&self, channel: Channel, window: DateWindow, orders: Vec<Order>) {
        let mut inner = self.inner.write().await;
        inner.channel = Some(channel);
        inner.orders = orders;
        inner.window = Some(window);
        inner.fetched_at = Some(Utc::now());
        inner.last_error = None;
        inner.consecutive_failures = 0;
    }

    pub async fn record_failure(&self, error: String) -> u32 {
        let mut inner = self.inner.write().await;
        inner.last_error = Some(error);
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.consecutive_failures
    }
}
