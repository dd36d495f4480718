use super::item::{NewOrderItem, OrderItem, ProductId, ProductSnapshot};
use super::money::Money;
use super::notification::Notification;
use super::order::{NewOrder, Order, OrderId, OrderNumber, OrderStatus, UserId};
use super::payment::{PaymentResult, PaymentToken, RefundResult};
use crate::error::Result;
use async_trait::async_trait;

/// Durable storage for orders and their items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the order row and then every item row as one atomic unit.
    ///
    /// Fails with `DuplicateOrderNumber` when the number is already used, in
    /// which case nothing is written.
    async fn create(&self, order: NewOrder, items: Vec<NewOrderItem>)
    -> Result<(Order, Vec<OrderItem>)>;

    /// Conditional write: succeeds only if `order.version` matches the stored
    /// version, and returns the order with its version bumped. A stale version
    /// yields `Conflict`.
    async fn update(&self, order: Order) -> Result<Order>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>>;
    async fn get_for_user(&self, id: OrderId, user_id: UserId) -> Result<Option<Order>>;
    async fn find_by_number_for_user(
        &self,
        number: &OrderNumber,
        user_id: UserId,
    ) -> Result<Option<Order>>;

    /// Newest first.
    async fn find_by_user(&self, user_id: UserId, status: Option<OrderStatus>)
    -> Result<Vec<Order>>;

    /// Oldest first.
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>>;

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Every order, by ascending id.
    async fn get_all(&self) -> Result<Vec<Order>>;
}

/// Read access to the live product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn store(&self, product: ProductSnapshot) -> Result<()>;
    async fn find(&self, id: ProductId) -> Result<Option<ProductSnapshot>>;
}

/// An external payment processor.
///
/// Neither call is idempotent; callers must not authorize an order twice.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, order: &Order, token: &PaymentToken) -> Result<PaymentResult>;
    async fn refund(&self, transaction_id: &str, amount: Money) -> Result<RefundResult>;
}

/// Delivery mechanism behind the notification queue (email, webhook, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

pub type OrderStoreBox = Box<dyn OrderStore>;
pub type ProductCatalogBox = Box<dyn ProductCatalog>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type NotificationChannelBox = Box<dyn NotificationChannel>;
