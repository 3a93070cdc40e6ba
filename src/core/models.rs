use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Shopee,
    Lazada,
    #[serde(rename = "tiktok")]
    TikTok,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Shopee, Channel::Lazada, Channel::TikTok];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Shopee => "Shopee",
            Channel::Lazada => "Lazada",
            Channel::TikTok => "TikTok",
        }
    }

    pub fn orders_path(&self) -> &'static str {
        match self {
            Channel::Shopee => "/get_all_orders",
            Channel::Lazada => "/get_all_orders_lazada",
            Channel::TikTok => "/get_all_orders_tiktok",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Channel::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown channel: {}. Valid channels: shopee, lazada, tiktok",
                    wanted.to_lowercase()
                )
            })
    }
}

/// Access/refresh token pair as issued by the upstream API.
///
/// Field names on disk are fixed so a token file written by one version
/// stays readable by the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshTokenValue")]
    pub refresh_token: String,
    #[serde(rename = "tokenTimestamp", with = "chrono::serde::ts_milliseconds")]
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: String, refresh_token: String, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            refresh_token,
            issued_at,
        }
    }
}

/// Shortens a token for display, keeping only the first few characters.
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(6).collect();
    if visible.len() == token.len() {
        visible
    } else {
        format!("{visible}…")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unpaid,
    ReadyToShip,
    Processed,
    RetryShip,
    Shipped,
    ToConfirmReceive,
    InCancel,
    Cancelled,
    ToReturn,
    Completed,
    InvoicePending,
    #[serde(other)]
    Unknown,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "order_sn")]
    pub order_id: String,
    #[serde(rename = "create_time", with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "buyer_username", default)]
    pub buyer_name: String,
    #[serde(rename = "cod", default)]
    pub is_cash_on_delivery: bool,
    #[serde(rename = "order_status", default)]
    pub status: OrderStatus,
    #[serde(rename = "item_list", default)]
    pub line_items: Vec<Item>,
}

impl Order {
    pub fn first_item(&self) -> Option<&Item> {
        self.line_items.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "model_sku", default)]
    pub sku: String,
    #[serde(rename = "model_name", default)]
    pub name: String,
    #[serde(
        rename = "model_discounted_price",
        with = "rust_decimal::serde::float",
        default
    )]
    pub discounted_price: Decimal,
    #[serde(rename = "image_info", default)]
    pub image: ImageInfo,
}

impl Item {
    pub fn image_url(&self) -> &str {
        &self.image.image_url
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub image_url: String,
}

/// Inclusive range of calendar days sent as `start_date`/`end_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window ending `lead_days` after `today` and starting `lookback_days`
    /// before that end.
    pub fn trailing(today: NaiveDate, lookback_days: u32, lead_days: u32) -> Self {
        let end = today + chrono::Duration::days(i64::from(lead_days));
        let start = end - chrono::Duration::days(i64::from(lookback_days));
        Self::new(start, end)
    }

    pub fn start_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_param(), self.end_param())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ORDER_JSON: &str = r#"{
        "order_sn": "240101ABCDEF",
        "create_time": 1704103200,
        "buyer_username": "somchai.k",
        "cod": true,
        "order_status": "READY_TO_SHIP",
        "item_list": [
            {
                "model_sku": "TS-RED-L",
                "model_name": "Red,L",
                "model_discounted_price": 259.5,
                "image_info": { "image_url": "https://cf.example.com/file/abc" }
            }
        ]
    }"#;

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::Shopee.name(), "Shopee");
        assert_eq!(Channel::Lazada.name(), "Lazada");
        assert_eq!(Channel::TikTok.name(), "TikTok");
    }

    #[test]
    fn test_channel_paths() {
        assert_eq!(Channel::Shopee.orders_path(), "/get_all_orders");
        assert_eq!(Channel::Lazada.orders_path(), "/get_all_orders_lazada");
        assert_eq!(Channel::TikTok.orders_path(), "/get_all_orders_tiktok");
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!("Shopee".parse::<Channel>().unwrap(), Channel::Shopee);
        assert_eq!(" lazada ".parse::<Channel>().unwrap(), Channel::Lazada);
        assert_eq!("TIKTOK".parse::<Channel>().unwrap(), Channel::TikTok);
        assert!("amazon".parse::<Channel>().is_err());
    }

    #[test]
    fn test_channel_config_names() {
        assert_eq!(serde_json::to_string(&Channel::TikTok).unwrap(), "\"tiktok\"");
        let channel: Channel = serde_json::from_str("\"lazada\"").unwrap();
        assert_eq!(channel, Channel::Lazada);
    }

    #[test]
    fn test_parse_upstream_order() {
        let order: Order = serde_json::from_str(ORDER_JSON).unwrap();

        assert_eq!(order.order_id, "240101ABCDEF");
        assert_eq!(
            order.created_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(order.buyer_name, "somchai.k");
        assert!(order.is_cash_on_delivery);
        assert_eq!(order.status, OrderStatus::ReadyToShip);

        let item = order.first_item().unwrap();
        assert_eq!(item.sku, "TS-RED-L");
        assert_eq!(item.name, "Red,L");
        assert_eq!(item.discounted_price, Decimal::new(2595, 1));
        assert_eq!(item.image_url(), "https://cf.example.com/file/abc");
    }

    #[test]
    fn test_parse_order_with_missing_optional_fields() {
        let order: Order =
            serde_json::from_str(r#"{"order_sn": "X1", "create_time": 0}"#).unwrap();

        assert_eq!(order.buyer_name, "");
        assert!(!order.is_cash_on_delivery);
        assert_eq!(order.status, OrderStatus::Unknown);
        assert!(order.first_item().is_none());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let order: Order = serde_json::from_str(
            r#"{"order_sn": "X2", "create_time": 0, "order_status": "LOST_IN_TRANSIT"}"#,
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Unknown);
    }

    #[test]
    fn test_integer_price_parses() {
        let item: Item =
            serde_json::from_str(r#"{"model_sku": "A", "model_discounted_price": 120}"#).unwrap();
        assert_eq!(item.discounted_price, Decimal::new(120, 0));
    }

    #[test]
    fn test_credential_storage_keys() {
        let credential = Credential::new(
            "X".to_string(),
            "Y".to_string(),
            Utc.timestamp_millis_opt(1_704_103_200_123).unwrap(),
        );

        let value = serde_json::to_value(&credential).unwrap();
        assert_eq!(value["accessToken"], "X");
        assert_eq!(value["refreshTokenValue"], "Y");
        assert_eq!(value["tokenTimestamp"], 1_704_103_200_123_i64);
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("7164624357736c55"), "716462…");
        assert_eq!(mask_token("abc"), "abc");
    }

    #[test]
    fn test_trailing_window() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        let window = DateWindow::trailing(today, 10, 1);

        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(window.start_param(), "2023-12-31");
        assert_eq!(window.end_param(), "2024-01-10");
    }

    #[test]
    fn test_trailing_window_crosses_month() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let window = DateWindow::trailing(today, 10, 1);
        assert_eq!(window.to_string(), "2024-02-23..2024-03-04");
    }
}
