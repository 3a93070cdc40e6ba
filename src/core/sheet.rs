//! Printable order sheet: orders oldest first, padded with blank rows up to a
//! minimum so a short day still prints a full form, then split into pages.

use crate::core::models::{Channel, Order};
use chrono::TimeZone;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Display;

pub struct OrderSheet {
    rows: Vec<Option<Order>>,
    channel: Channel,
    rows_per_page: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SheetRow<'a> {
    pub number: usize,
    pub order: Option<&'a Order>,
    channel: Channel,
}

#[derive(Debug)]
pub struct SheetPage<'a> {
    pub number: usize,
    pub total_pages: usize,
    pub rows: Vec<SheetRow<'a>>,
}

/// Text of one sheet row. Placeholder rows keep their number and leave
/// everything else blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowCells {
    pub number: usize,
    pub date: String,
    pub time: String,
    pub channel: String,
    pub buyer: String,
    pub order_id: String,
    pub sku: String,
    pub variation: String,
    pub price: String,
    pub payment: String,
    pub image_url: String,
}

impl OrderSheet {
    pub fn new(orders: &[Order], channel: Channel, rows_per_page: usize, min_rows: usize) -> Self {
        let mut sorted: Vec<Order> = orders.to_vec();
        sorted.sort_by_key(|o| o.created_at);

        let mut rows: Vec<Option<Order>> = sorted.into_iter().map(Some).collect();
        if rows.len() < min_rows {
            rows.resize(min_rows, None);
        }

        Self {
            rows,
            channel,
            rows_per_page: rows_per_page.max(1),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn total_pages(&self) -> usize {
        self.rows.len().div_ceil(self.rows_per_page).max(1)
    }

    /// Page `number` (1-based), clamped into the valid range.
    pub fn page(&self, number: usize) -> SheetPage<'_> {
        let total_pages = self.total_pages();
        let number = number.clamp(1, total_pages);
        let offset = (number - 1) * self.rows_per_page;

        let rows = self
            .rows
            .iter()
            .enumerate()
            .skip(offset)
            .take(self.rows_per_page)
            .map(|(index, order)| SheetRow {
                number: index + 1,
                order: order.as_ref(),
                channel: self.channel,
            })
            .collect();

        SheetPage {
            number,
            total_pages,
            rows,
        }
    }
}

impl SheetRow<'_> {
    pub fn cells<Tz>(&self, tz: &Tz) -> RowCells
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let Some(order) = self.order else {
            return RowCells::blank(self.number);
        };

        let created = order.created_at.with_timezone(tz);
        let item = order.first_item();

        RowCells {
            number: self.number,
            date: created.format("%d/%m/%Y").to_string(),
            time: created.format("%H:%M:%S").to_string(),
            channel: self.channel.name().to_string(),
            buyer: order.buyer_name.clone(),
            order_id: order.order_id.clone(),
            sku: item.map(|i| i.sku.clone()).unwrap_or_default(),
            variation: item.map(|i| i.name.clone()).unwrap_or_default(),
            price: item
                .map(|i| format_price(i.discounted_price))
                .unwrap_or_default(),
            payment: if order.is_cash_on_delivery {
                "COD".to_string()
            } else {
                String::new()
            },
            image_url: item.map(|i| i.image_url().to_string()).unwrap_or_default(),
        }
    }
}

impl RowCells {
    fn blank(number: usize) -> Self {
        Self {
            number,
            date: String::new(),
            time: String::new(),
            channel: String::new(),
            buyer: String::new(),
            order_id: String::new(),
            sku: String::new(),
            variation: String::new(),
            price: String::new(),
            payment: String::new(),
            image_url: String::new(),
        }
    }
}

fn format_price(price: Decimal) -> String {
    if price.is_zero() {
        String::new()
    } else {
        price.normalize().to_string()
    }
}
