use super::money::OrderAmounts;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-facing order identifier, distinct from the surrogate [`OrderId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// `{prefix}-{yyyymmddHHMMSS}-{6 uppercase alphanumerics}`.
    pub fn generate(prefix: &str, at: DateTime<Utc>) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        Self(format!("{}-{}-{}", prefix, at.format("%Y%m%d%H%M%S"), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderNumber {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    /// Administrative transition table.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed | Processing | Cancelled)
                | (Confirmed, Processing | Shipped | Cancelled)
                | (Processing, Shipped | Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Refunded)
                | (Cancelled, Refunded)
        )
    }

    /// Statuses that still accept a payment.
    pub fn accepts_payment(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown order status '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::PartiallyRefunded => "PARTIALLY_REFUNDED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery speed derived from the free-text shipping method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverySpeed {
    Premium,
    Express,
    Standard,
}

impl DeliverySpeed {
    /// Case-insensitive; unrecognized methods ship standard.
    pub fn from_method(method: &str) -> Self {
        match method.trim().to_ascii_lowercase().as_str() {
            "premium" => DeliverySpeed::Premium,
            "express" => DeliverySpeed::Express,
            _ => DeliverySpeed::Standard,
        }
    }

    pub fn transit_time(&self) -> Duration {
        match self {
            DeliverySpeed::Premium => Duration::days(1),
            DeliverySpeed::Express => Duration::days(2),
            DeliverySpeed::Standard => Duration::days(5),
        }
    }

    pub fn estimate_from(method: &str, placed_at: DateTime<Utc>) -> DateTime<Utc> {
        placed_at + Self::from_method(method).transit_time()
    }
}

/// Shipping snapshot copied from the checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub method: String,
}

pub fn generate_tracking_number() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("TRK-{}", id[..8].to_ascii_uppercase())
}

/// An order as written by the workflow, before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub amounts: OrderAmounts,
    pub payment_method: String,
    pub shipping: ShippingDetails,
    pub estimated_delivery_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            order_number: self.order_number,
            user_id: self.user_id,
            amounts: self.amounts,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: self.payment_method,
            payment_transaction_id: None,
            payment_attempts: 0,
            refund_id: None,
            needs_manual_refund: false,
            shipping: self.shipping,
            tracking_number: None,
            estimated_delivery_date: self.estimated_delivery_date,
            delivered_at: None,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 0,
        }
    }
}

/// A persisted order.
///
/// `version` is owned by the store: every successful update increments it and
/// an update carrying a stale version is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub amounts: OrderAmounts,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub payment_transaction_id: Option<String>,
    pub payment_attempts: u32,
    pub refund_id: Option<String>,
    pub needs_manual_refund: bool,
    pub shipping: ShippingDetails,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Order {
    /// A gateway authorization has been claimed but not settled yet.
    pub fn payment_in_flight(&self) -> bool {
        self.payment_status == PaymentStatus::Pending && self.payment_attempts > 0
    }

    /// Whether a new authorization may start under the given retry budget.
    pub fn can_start_payment(&self, max_attempts: u32) -> bool {
        if !self.status.accepts_payment() || self.needs_manual_refund {
            return false;
        }
        match self.payment_status {
            PaymentStatus::Pending => self.payment_attempts == 0,
            PaymentStatus::Failed => self.payment_attempts < max_attempts,
            _ => false,
        }
    }

    pub fn begin_payment_attempt(&mut self, at: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Pending;
        self.payment_attempts += 1;
        self.updated_at = at;
    }

    pub fn mark_paid(&mut self, transaction_id: String, at: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Paid;
        self.payment_transaction_id = Some(transaction_id);
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Confirmed;
        }
        self.updated_at = at;
    }

    pub fn mark_payment_failed(&mut self, at: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Failed;
        self.updated_at = at;
    }

    /// Moves to a closing status (cancelled or refunded). A paid order is
    /// flagged as owing a refund until the gateway confirms it.
    pub fn close(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        if self.payment_status == PaymentStatus::Paid {
            self.needs_manual_refund = true;
        }
        self.updated_at = at;
    }

    /// Records a captured charge that was reversed because the approval could
    /// not be saved. Without a `refund_id` the charge still has to be refunded.
    pub fn record_reversed_charge(
        &mut self,
        transaction_id: String,
        refund_id: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.payment_status = PaymentStatus::Failed;
        self.payment_transaction_id = Some(transaction_id);
        self.needs_manual_refund = refund_id.is_none();
        self.refund_id = refund_id;
        self.updated_at = at;
    }

    /// A claim older than `timeout` whose gateway call never settled.
    pub fn payment_claim_expired(&self, timeout: std::time::Duration, now: DateTime<Utc>) -> bool {
        self.payment_in_flight()
            && (now - self.updated_at)
                .to_std()
                .is_ok_and(|age| age > timeout)
    }

    /// A reversed charge that was never recorded as paid keeps its `FAILED`
    /// payment status.
    pub fn mark_refunded(&mut self, refund_id: String, at: DateTime<Utc>) {
        if self.payment_status == PaymentStatus::Paid {
            self.payment_status = PaymentStatus::Refunded;
        }
        self.refund_id = Some(refund_id);
        self.needs_manual_refund = false;
        self.updated_at = at;
    }

    /// Applies a non-closing administrative transition.
    pub fn advance(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = status;
        match status {
            OrderStatus::Shipped => self.tracking_number = Some(generate_tracking_number()),
            OrderStatus::Delivered => self.delivered_at = Some(at),
            _ => {}
        }
        self.updated_at = at;
    }

    /// A captured charge is flagged and not yet refunded.
    pub fn owes_refund(&self) -> bool {
        self.needs_manual_refund
            && self.payment_transaction_id.is_some()
            && self.payment_status != PaymentStatus::Refunded
    }
}
