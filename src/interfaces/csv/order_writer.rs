use crate::application::engine::OrderView;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

const HEADER: [&str; 9] = [
    "id",
    "order_number",
    "user_id",
    "status",
    "payment_status",
    "total",
    "items",
    "tracking_number",
    "needs_manual_refund",
];

#[derive(Serialize)]
struct OrderRow<'a> {
    id: u64,
    order_number: &'a str,
    user_id: u64,
    status: &'static str,
    payment_status: &'static str,
    total: String,
    items: u64,
    tracking_number: &'a str,
    needs_manual_refund: bool,
}

/// Writes one summary row per order.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(sink),
        }
    }

    /// Writes the header, then one row per order. `items` is the total
    /// quantity across the order's lines.
    pub fn write_orders(&mut self, orders: &[OrderView]) -> Result<()> {
        self.writer.write_record(HEADER)?;
        for view in orders {
            let order = &view.order;
            self.writer.serialize(OrderRow {
                id: order.id.0,
                order_number: order.order_number.as_str(),
                user_id: order.user_id.0,
                status: order.status.as_str(),
                payment_status: order.payment_status.as_str(),
                total: order.amounts.total.to_string(),
                items: view.items.iter().map(|i| u64::from(i.quantity)).sum(),
                tracking_number: order.tracking_number.as_deref().unwrap_or(""),
                needs_manual_refund: order.needs_manual_refund,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
