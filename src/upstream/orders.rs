use super::{describe_failure, malformed, UpstreamClient};
use crate::core::error::SyncError;
use crate::core::models::{Channel, DateWindow, Order};
use serde::Deserialize;

const ORDER_STATUS: &str = "READY_TO_SHIP";
const OPTIONAL_FIELDS: &str = "buyer_username,pay_time,item_list";

#[derive(Debug, Deserialize)]
struct OrderListResponse {
    #[serde(default)]
    order_detail: Option<Vec<Order>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl UpstreamClient {
    pub fn build_orders_request(
        &self,
        access_token: &str,
        channel: Channel,
        window: &DateWindow,
    ) -> reqwest::Result<reqwest::Request> {
        let start_date = window.start_param();
        let end_date = window.end_param();

        self.client
            .post(self.endpoint(channel.orders_path()))
            .query(&[
                ("access_token", access_token),
                ("start_date", start_date.as_str()),
                ("end_date", end_date.as_str()),
                ("order_status", ORDER_STATUS),
                ("request_order_status_pending", "false"),
                ("response_optional_fields", OPTIONAL_FIELDS),
            ])
            .build()
    }

    /// Fetches the ready-to-ship orders for `channel` in `window`. A response
    /// without an order list yields an empty vector.
    pub async fn fetch_orders(
        &self,
        access_token: &str,
        channel: Channel,
        window: &DateWindow,
    ) -> Result<Vec<Order>, SyncError> {
        let request = self
            .build_orders_request(access_token, channel, window)
            .map_err(|e| SyncError::FetchFailed(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| SyncError::FetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::FetchFailed(describe_failure(response).await));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::FetchFailed(e.to_string()))?;

        let parsed: OrderListResponse =
            serde_json::from_str(&body).map_err(|e| malformed(channel.orders_path(), e))?;

        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            let message = parsed.message.unwrap_or_default();
            return Err(SyncError::FetchFailed(format!("{error}: {message}")));
        }

        let orders = parsed.order_detail.unwrap_or_default();
        tracing::debug!(?channel, %window, count = orders.len(), "Fetched orders");
        Ok(orders)
    }
}
