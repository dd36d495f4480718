use super::item::OrderItem;
use super::order::{Order, OrderStatus};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderConfirmation,
    OrderStatusChange,
    PasswordReset,
    Verification,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderConfirmation => "order_confirmation",
            NotificationKind::OrderStatusChange => "order_status_change",
            NotificationKind::PasswordReset => "password_reset",
            NotificationKind::Verification => "verification",
        }
    }
}

/// A rendered message addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn order_confirmation(order: &Order, items: &[OrderItem]) -> Self {
        let mut body = format!(
            "Hello {},\n\nThank you for your order! Here are the details:\n\n\
             Order number: {}\nOrder date: {}\nStatus: {}\n\nItems:\n",
            order.shipping.name,
            order.order_number,
            order.created_at.format("%Y-%m-%d"),
            order.status,
        );
        for item in items {
            let _ = writeln!(
                body,
                "- {} x{} - {}",
                item.product_name, item.quantity, item.total_price
            );
        }
        let _ = write!(
            body,
            "\nSubtotal: {}\nShipping: {}\nTotal: {}\n\nShipping address:\n{}\n{}, {} {}\n\n\
             Estimated delivery: {}\n",
            order.amounts.subtotal,
            order.amounts.shipping,
            order.amounts.total,
            order.shipping.address,
            order.shipping.city,
            order.shipping.postal_code,
            order.shipping.country,
            order.estimated_delivery_date.format("%Y-%m-%d"),
        );

        Self {
            kind: NotificationKind::OrderConfirmation,
            recipient: order.shipping.email.clone(),
            subject: format!("Order confirmation {}", order.order_number),
            body,
        }
    }

    pub fn order_status_change(order: &Order) -> Self {
        let message = match order.status {
            OrderStatus::Confirmed => "Your order has been confirmed and is being prepared.".to_string(),
            OrderStatus::Processing => "Your order is being processed.".to_string(),
            OrderStatus::Shipped => format!(
                "Your order has shipped! Tracking number: {}",
                order.tracking_number.as_deref().unwrap_or("unavailable")
            ),
            OrderStatus::Delivered => "Your order has been delivered.".to_string(),
            OrderStatus::Cancelled => "Your order has been cancelled.".to_string(),
            OrderStatus::Refunded => "Your order has been refunded.".to_string(),
            OrderStatus::Pending => "The status of your order has been updated.".to_string(),
        };

        Self {
            kind: NotificationKind::OrderStatusChange,
            recipient: order.shipping.email.clone(),
            subject: format!("Update on your order {}", order.order_number),
            body: format!(
                "Hello {},\n\nAn update about your order {}:\n\n{}\n",
                order.shipping.name, order.order_number, message
            ),
        }
    }

    pub fn password_reset(recipient: &str, token: &str, base_url: &str) -> Self {
        Self {
            kind: NotificationKind::PasswordReset,
            recipient: recipient.to_string(),
            subject: "Reset your password".to_string(),
            body: format!(
                "Hello,\n\nFollow this link to reset your password:\n{base_url}/reset-password?token={token}\n\n\
                 The link expires in 1 hour. If you did not ask for a reset you can ignore this message.\n"
            ),
        }
    }

    pub fn verification(recipient: &str, token: &str, base_url: &str) -> Self {
        Self {
            kind: NotificationKind::Verification,
            recipient: recipient.to_string(),
            subject: "Verify your account".to_string(),
            body: format!(
                "Hello,\n\nThanks for signing up! Verify your account here:\n{base_url}/verify-email?token={token}\n"
            ),
        }
    }
}
