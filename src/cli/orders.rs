use crate::core::models::{Channel, DateWindow};
use crate::core::settings::Settings;
use crate::core::sheet::{OrderSheet, RowCells};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct OrdersOutput {
    channel: Channel,
    window: DateWindow,
    order_count: usize,
    sheet_rows: usize,
    page: usize,
    total_pages: usize,
    rows: Vec<RowCells>,
    #[serde(with = "chrono::serde::ts_seconds")]
    fetched_at: DateTime<Utc>,
}

const HEADERS: [&str; 10] = [
    "#", "Date", "Time", "Channel", "Buyer", "Order", "SKU", "Variation", "Price", "Payment",
];

pub async fn run(json: bool, channel: Option<Channel>, page: usize) -> Result<()> {
    let settings = Settings::load()?;
    let channel = channel.unwrap_or(settings.polling.channel);
    let session = super::open_session(&settings)?;

    let credential = session
        .valid_credential(Utc::now())
        .await
        .context("Could not obtain an access token")?;

    let window = DateWindow::trailing(
        Local::now().date_naive(),
        settings.polling.lookback_days,
        settings.polling.lead_days,
    );

    let orders = session
        .upstream()
        .fetch_orders(&credential.access_token, channel, &window)
        .await
        .with_context(|| format!("Failed to fetch {channel} orders for {window}"))?;

    let sheet = OrderSheet::new(
        &orders,
        channel,
        settings.sheet.rows_per_page,
        settings.sheet.min_rows,
    );
    let sheet_page = sheet.page(page);
    let rows: Vec<RowCells> = sheet_page.rows.iter().map(|r| r.cells(&Local)).collect();

    let output = OrdersOutput {
        channel,
        window,
        order_count: orders.len(),
        sheet_rows: sheet.row_count(),
        page: sheet_page.number,
        total_pages: sheet_page.total_pages,
        rows,
        fetched_at: Utc::now(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

fn print_text_output(output: &OrdersOutput) {
    println!(
        "{} orders {} ({} ready to ship) page {}/{}",
        output.channel, output.window, output.order_count, output.page, output.total_pages
    );
    println!();
    print!("{}", render_table(&output.rows));
}

fn render_table(rows: &[RowCells]) -> String {
    let cells: Vec<[&str; 10]> = rows.iter().map(row_fields).collect();
    let numbers: Vec<String> = rows.iter().map(|r| r.number.to_string()).collect();

    let mut widths = HEADERS.map(str::len);
    for (fields, number) in cells.iter().zip(&numbers) {
        widths[0] = widths[0].max(number.len());
        for (i, field) in fields.iter().enumerate().skip(1) {
            widths[i] = widths[i].max(field.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&join_line(&HEADERS, &widths));
    for (fields, number) in cells.iter().zip(&numbers) {
        let mut line = *fields;
        line[0] = number.as_str();
        out.push_str(&join_line(&line, &widths));
    }
    out
}

fn row_fields(row: &RowCells) -> [&str; 10] {
    [
        "",
        row.date.as_str(),
        row.time.as_str(),
        row.channel.as_str(),
        row.buyer.as_str(),
        row.order_id.as_str(),
        row.sku.as_str(),
        row.variation.as_str(),
        row.price.as_str(),
        row.payment.as_str(),
    ]
}

fn join_line(fields: &[&str; 10], widths: &[usize; 10]) -> String {
    let line = fields
        .iter()
        .zip(widths)
        .map(|(field, width)| {
            let pad = width.saturating_sub(field.chars().count());
            format!("{field}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    format!("{}\n", line.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(number: usize, order_id: &str) -> RowCells {
        RowCells {
            number,
            date: "01/01/2024".to_string(),
            time: "17:00:00".to_string(),
            channel: "Shopee".to_string(),
            buyer: "nok".to_string(),
            order_id: order_id.to_string(),
            sku: "SKU-1".to_string(),
            variation: "Black,M".to_string(),
            price: "199".to_string(),
            payment: "COD".to_string(),
            image_url: String::new(),
        }
    }

    fn blank(number: usize) -> RowCells {
        RowCells {
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

    #[test]
    fn test_render_table_aligns_columns() {
        let table = render_table(&[cells(1, "240101ABC"), blank(2)]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("#  Date"));
        assert!(lines[1].starts_with("1  01/01/2024  17:00:00  Shopee"));
        assert!(lines[1].ends_with("COD"));
        // placeholder rows keep only their number
        assert_eq!(lines[2], "2");

        let order_column = lines[0].find("Order").unwrap();
        assert_eq!(&lines[1][order_column..order_column + 9], "240101ABC");
    }

    #[test]
    fn test_render_table_widens_number_column() {
        let table = render_table(&[blank(9), blank(10)]);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("#   Date"));
        assert_eq!(lines[1], "9");
        assert_eq!(lines[2], "10");
    }
}
