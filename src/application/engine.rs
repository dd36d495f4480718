use super::notifier::Notifier;
use crate::config::WorkflowConfig;
use crate::domain::checkout::CheckoutRequest;
use crate::domain::identity::Identity;
use crate::domain::item::{NewOrderItem, OrderItem};
use crate::domain::money::Money;
use crate::domain::notification::Notification;
use crate::domain::order::{
    DeliverySpeed, NewOrder, Order, OrderId, OrderNumber, OrderStatus, PaymentStatus,
};
use crate::domain::payment::{PaymentResult, PaymentToken, RefundResult};
use crate::domain::ports::{OrderStoreBox, PaymentGatewayBox, ProductCatalogBox};
use crate::error::{OrderError, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

/// Fresh order numbers tried before a collision is reported.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// Writes tried when recording an approved charge before it is reversed.
const SETTLEMENT_WRITE_ATTEMPTS: usize = 3;

/// An order together with its items.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderView {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderStats {
    pub order_count: usize,
    pub by_status: BTreeMap<OrderStatus, usize>,
    /// Sum of the totals of orders whose payment is currently `PAID`.
    pub revenue: Money,
}

/// The order lifecycle and payment-settlement workflow.
///
/// `OrderWorkflow` owns its collaborators behind trait objects and is
/// `Send + Sync`; share it with `Arc` to serve concurrent requests. Per-order
/// consistency comes from the store's versioned conditional writes, not from
/// locks held here.
pub struct OrderWorkflow {
    orders: OrderStoreBox,
    catalog: ProductCatalogBox,
    gateway: PaymentGatewayBox,
    notifier: Notifier,
    config: WorkflowConfig,
}

impl OrderWorkflow {
    /// Creates a new `OrderWorkflow`.
    ///
    /// # Arguments
    ///
    /// * `orders` - The store for orders and order items.
    /// * `catalog` - The product catalog used for item snapshots.
    /// * `gateway` - The payment processor adapter.
    /// * `notifier` - The sending half of the notification queue.
    /// * `config` - Timeouts and retry policy.
    pub fn new(
        orders: OrderStoreBox,
        catalog: ProductCatalogBox,
        gateway: PaymentGatewayBox,
        notifier: Notifier,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            orders,
            catalog,
            gateway,
            notifier,
            config,
        }
    }

    /// Turns a cart submission into a `PENDING` order.
    ///
    /// Every line is resolved against the catalog before anything is written;
    /// the order and all of its items are then persisted in one atomic store
    /// write, so a failure leaves no trace.
    #[instrument(skip_all, fields(user_id = %identity.user_id))]
    pub async fn create_order(
        &self,
        identity: &Identity,
        request: CheckoutRequest,
    ) -> Result<OrderView> {
        let checkout = request.validate()?;

        let mut items = Vec::with_capacity(checkout.lines.len());
        for line in checkout.lines {
            let product = self
                .catalog
                .find(line.product_id)
                .await?
                .ok_or_else(|| OrderError::not_found("product", line.product_id))?;
            items.push(NewOrderItem::new(
                product,
                line.quantity,
                line.unit_price,
                line.customizations,
                line.preview_image_url,
            )?);
        }

        let placed_at = Utc::now();
        let mut attempt = 0;
        let (order, items) = loop {
            attempt += 1;
            let draft = NewOrder {
                order_number: OrderNumber::generate(&self.config.order_number_prefix, placed_at),
                user_id: identity.user_id,
                amounts: checkout.amounts,
                payment_method: checkout.payment_method.clone(),
                shipping: checkout.shipping.clone(),
                estimated_delivery_date: DeliverySpeed::estimate_from(
                    &checkout.shipping.method,
                    placed_at,
                ),
                notes: checkout.notes.clone(),
                created_at: placed_at,
            };
            match self.orders.create(draft, items.clone()).await {
                Ok(created) => break created,
                Err(OrderError::DuplicateOrderNumber(number)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    warn!(%number, "order number collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            items = items.len(),
            total = %order.amounts.total,
            "order created"
        );
        self.notifier
            .send(Notification::order_confirmation(&order, &items));
        Ok(OrderView { order, items })
    }

    /// Authorizes the order total with the payment gateway.
    ///
    /// The attempt is claimed with a conditional write before the gateway is
    /// called, so concurrent submissions for the same order cannot both reach
    /// the gateway: the loser gets `Conflict`.
    #[instrument(skip_all, fields(user_id = %identity.user_id, order_id = %order_id))]
    pub async fn process_payment(
        &self,
        identity: &Identity,
        order_id: OrderId,
        token: PaymentToken,
    ) -> Result<OrderView> {
        let mut order = self.owned_order(identity, order_id).await?;
        if order.payment_in_flight() {
            return Err(OrderError::Conflict(format!(
                "payment for order {} is already in progress",
                order.order_number
            )));
        }
        if !order.can_start_payment(self.config.max_payment_attempts) {
            return Err(OrderError::Conflict(format!(
                "order {} has already been processed (status {}, payment {})",
                order.order_number, order.status, order.payment_status
            )));
        }

        order.begin_payment_attempt(Utc::now());
        let mut order = self.orders.update(order).await?;

        let result = self.authorize(&order, &token).await;
        let amount = result.amount();
        match result {
            PaymentResult::Approved { transaction_id, .. } => {
                let order = match self.record_charge(order, &transaction_id).await {
                    Ok(order) => order,
                    Err(e) => {
                        error!(error = %e, %transaction_id, "authorized payment could not be recorded, reversing it");
                        self.reverse_charge(order_id, &transaction_id, amount).await;
                        return Err(e);
                    }
                };
                info!(
                    order_number = %order.order_number,
                    amount = %amount,
                    attempt = order.payment_attempts,
                    "payment authorized"
                );
                self.notifier.send(Notification::order_status_change(&order));
                self.view(order).await
            }
            PaymentResult::Declined { reason, .. } => {
                order.mark_payment_failed(Utc::now());
                let order = self.orders.update(order).await?;
                warn!(
                    order_number = %order.order_number,
                    amount = %amount,
                    attempt = order.payment_attempts,
                    %reason,
                    "payment declined"
                );
                Err(OrderError::PaymentDeclined {
                    order_number: order.order_number.to_string(),
                    reason,
                })
            }
        }
    }

    /// Administrative status change, checked against
    /// [`OrderStatus::can_transition_to`].
    #[instrument(skip_all, fields(admin = %identity.user_id, order_id = %order_id))]
    pub async fn update_order_status(
        &self,
        identity: &Identity,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        identity.require_admin("update order status")?;
        let mut order = self.existing_order(order_id).await?;
        if !order.status.can_transition_to(status) {
            return Err(OrderError::Conflict(format!(
                "order {} cannot move from {} to {}",
                order.order_number, order.status, status
            )));
        }

        if status == OrderStatus::Refunded
            && !matches!(order.payment_status, PaymentStatus::Paid | PaymentStatus::Refunded)
        {
            return Err(OrderError::Conflict(format!(
                "order {} was never paid and cannot be marked {} (payment {})",
                order.order_number, status, order.payment_status
            )));
        }

        match status {
            OrderStatus::Cancelled | OrderStatus::Refunded => self.close(order, status).await,
            _ => {
                Self::ensure_settled(&order)?;
                let previous = order.status;
                order.advance(status, Utc::now());
                let order = self.orders.update(order).await?;
                info!(
                    order_number = %order.order_number,
                    from = %previous,
                    to = %order.status,
                    tracking = order.tracking_number.as_deref().unwrap_or(""),
                    "order status updated"
                );
                self.notifier.send(Notification::order_status_change(&order));
                Ok(order)
            }
        }
    }

    /// Cancels one of the caller's orders, refunding it if it was paid.
    ///
    /// A failed refund still leaves the order `CANCELLED`, with the payment
    /// `PAID` and `needs_manual_refund` set, and is reported as
    /// `RefundFailed`.
    #[instrument(skip_all, fields(user_id = %identity.user_id, order_id = %order_id))]
    pub async fn cancel_order(&self, identity: &Identity, order_id: OrderId) -> Result<Order> {
        let order = self.owned_order(identity, order_id).await?;
        match order.status {
            OrderStatus::Shipped | OrderStatus::Delivered => Err(OrderError::Conflict(format!(
                "order {} has already shipped and can no longer be cancelled",
                order.order_number
            ))),
            OrderStatus::Cancelled | OrderStatus::Refunded => Err(OrderError::Conflict(format!(
                "order {} is already {}",
                order.order_number, order.status
            ))),
            _ => self.close(order, OrderStatus::Cancelled).await,
        }
    }

    /// Re-issues the refund for an order left with `needs_manual_refund`.
    #[instrument(skip_all, fields(admin = %identity.user_id, order_id = %order_id))]
    pub async fn retry_refund(&self, identity: &Identity, order_id: OrderId) -> Result<Order> {
        identity.require_admin("retry refunds")?;
        let order = self.existing_order(order_id).await?;
        if !order.owes_refund() {
            return Err(OrderError::Conflict(format!(
                "order {} has no outstanding refund",
                order.order_number
            )));
        }
        self.settle_refund(order).await
    }

    /// Releases a payment claim whose gateway call never settled, for
    /// instance after a crash between the claim and its outcome.
    ///
    /// The claim must be older than the gateway timeout. The attempt is
    /// recorded as `FAILED`; whether the processor captured anything has to
    /// be reconciled with the processor directly.
    #[instrument(skip_all, fields(admin = %identity.user_id, order_id = %order_id))]
    pub async fn resolve_payment(&self, identity: &Identity, order_id: OrderId) -> Result<Order> {
        identity.require_admin("resolve payments")?;
        let mut order = self.existing_order(order_id).await?;
        if !order.payment_in_flight() {
            return Err(OrderError::Conflict(format!(
                "order {} has no payment in progress",
                order.order_number
            )));
        }
        if !order.payment_claim_expired(self.config.gateway_timeout, Utc::now()) {
            return Err(OrderError::Conflict(format!(
                "payment for order {} may still be answered by the gateway",
                order.order_number
            )));
        }

        order.mark_payment_failed(Utc::now());
        let order = self.orders.update(order).await?;
        warn!(
            order_number = %order.order_number,
            attempt = order.payment_attempts,
            "stale payment claim released"
        );
        Ok(order)
    }

    pub async fn get_order(&self, identity: &Identity, order_id: OrderId) -> Result<OrderView> {
        let order = self.owned_order(identity, order_id).await?;
        self.view(order).await
    }

    pub async fn get_order_by_number(
        &self,
        identity: &Identity,
        number: &OrderNumber,
    ) -> Result<OrderView> {
        let order = self
            .orders
            .find_by_number_for_user(number, identity.user_id)
            .await?
            .ok_or_else(|| OrderError::not_found("order", number))?;
        self.view(order).await
    }

    /// The caller's orders, newest first, optionally filtered by status.
    pub async fn list_orders(
        &self,
        identity: &Identity,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        self.orders.find_by_user(identity.user_id, status).await
    }

    /// Fulfilment queue: every order in `status`, oldest first.
    pub async fn orders_by_status(
        &self,
        identity: &Identity,
        status: OrderStatus,
    ) -> Result<Vec<Order>> {
        identity.require_admin("list orders by status")?;
        self.orders.find_by_status(status).await
    }

    pub async fn stats(&self, identity: &Identity) -> Result<OrderStats> {
        identity.require_admin("read order statistics")?;
        let orders = self.orders.get_all().await?;
        let mut stats = OrderStats {
            order_count: orders.len(),
            ..OrderStats::default()
        };
        for order in &orders {
            *stats.by_status.entry(order.status).or_default() += 1;
            if order.payment_status == PaymentStatus::Paid {
                stats.revenue = stats.revenue.checked_add(order.amounts.total)?;
            }
        }
        Ok(stats)
    }

    /// Consumes the workflow and returns every order with its items.
    ///
    /// Dropping the workflow releases its `Notifier`, letting the dispatcher
    /// drain and stop.
    pub async fn into_orders(self) -> Result<Vec<OrderView>> {
        let orders = self.orders.get_all().await?;
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(self.view(order).await?);
        }
        Ok(views)
    }

    async fn view(&self, order: Order) -> Result<OrderView> {
        let items = self.orders.items(order.id).await?;
        Ok(OrderView { order, items })
    }

    async fn owned_order(&self, identity: &Identity, order_id: OrderId) -> Result<Order> {
        self.orders
            .get_for_user(order_id, identity.user_id)
            .await?
            .ok_or_else(|| OrderError::not_found("order", order_id))
    }

    async fn existing_order(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::not_found("order", order_id))
    }

    fn ensure_settled(order: &Order) -> Result<()> {
        if order.payment_in_flight() {
            Err(OrderError::Conflict(format!(
                "payment for order {} is still in progress",
                order.order_number
            )))
        } else {
            Ok(())
        }
    }

    /// Persists a closing status, then settles any refund it made owing.
    ///
    /// The closing write happens first so that two concurrent closes cannot
    /// both reach the refund call.
    async fn close(&self, mut order: Order, status: OrderStatus) -> Result<Order> {
        Self::ensure_settled(&order)?;
        let previous = order.status;
        order.close(status, Utc::now());
        let order = self.orders.update(order).await?;
        info!(
            order_number = %order.order_number,
            from = %previous,
            to = %order.status,
            "order closed"
        );
        self.notifier.send(Notification::order_status_change(&order));

        if order.owes_refund() {
            self.settle_refund(order).await
        } else {
            Ok(order)
        }
    }

    async fn settle_refund(&self, mut order: Order) -> Result<Order> {
        let total = order.amounts.total;
        let result = match order.payment_transaction_id.as_deref() {
            Some(transaction_id) => self.refund_charge(transaction_id, total).await,
            None => RefundResult::failed(total, "order has no payment transaction"),
        };

        match result {
            RefundResult::Refunded { refund_id, amount } => {
                order.mark_refunded(refund_id, Utc::now());
                let order = self.orders.update(order).await?;
                info!(
                    order_number = %order.order_number,
                    amount = %amount,
                    refund_id = order.refund_id.as_deref().unwrap_or(""),
                    "payment refunded"
                );
                Ok(order)
            }
            RefundResult::Failed { reason, .. } => {
                error!(
                    order_number = %order.order_number,
                    amount = %total,
                    %reason,
                    "refund failed, order needs a manual refund"
                );
                Err(OrderError::RefundFailed {
                    order_number: order.order_number.to_string(),
                    reason,
                })
            }
        }
    }

    /// Saves the approved charge, reloading the order between attempts.
    async fn record_charge(&self, claimed: Order, transaction_id: &str) -> Result<Order> {
        let mut current = claimed;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut paid = current.clone();
            paid.mark_paid(transaction_id.to_string(), Utc::now());
            let err = match self.orders.update(paid).await {
                Ok(order) => return Ok(order),
                Err(e) => e,
            };
            warn!(attempt, error = %err, "approved payment write failed");
            if attempt >= SETTLEMENT_WRITE_ATTEMPTS {
                return Err(err);
            }
            current = match self.orders.get(current.id).await {
                Ok(Some(order)) if order.payment_in_flight() => order,
                _ => return Err(err),
            };
        }
    }

    /// Refunds a charge whose approval was never saved, then records the
    /// outcome on the order. A failed refund leaves `needs_manual_refund` set
    /// for [`retry_refund`](Self::retry_refund).
    async fn reverse_charge(&self, order_id: OrderId, transaction_id: &str, amount: Money) {
        let refund_id = match self.refund_charge(transaction_id, amount).await {
            RefundResult::Refunded { refund_id, .. } => {
                info!(%transaction_id, %refund_id, %amount, "unrecorded charge reversed");
                Some(refund_id)
            }
            RefundResult::Failed { reason, .. } => {
                error!(%transaction_id, %amount, %reason, "unrecorded charge could not be reversed");
                None
            }
        };

        let recorded = match self.orders.get(order_id).await {
            Ok(Some(mut order)) => {
                order.record_reversed_charge(transaction_id.to_string(), refund_id, Utc::now());
                self.orders.update(order).await.map(|_| ())
            }
            Ok(None) => Err(OrderError::not_found("order", order_id)),
            Err(e) => Err(e),
        };
        if let Err(e) = recorded {
            error!(
                error = %e,
                %transaction_id,
                "reversed charge could not be recorded, order needs reconciliation"
            );
        }
    }

    async fn refund_charge(&self, transaction_id: &str, amount: Money) -> RefundResult {
        match timeout(
            self.config.gateway_timeout,
            self.gateway.refund(transaction_id, amount),
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => RefundResult::failed(amount, format!("gateway error: {e}")),
            Err(_) => RefundResult::failed(
                amount,
                format!(
                    "gateway did not answer within {:?}",
                    self.config.gateway_timeout
                ),
            ),
        }
    }

    async fn authorize(&self, order: &Order, token: &PaymentToken) -> PaymentResult {
        let total = order.amounts.total;
        match timeout(
            self.config.gateway_timeout,
            self.gateway.authorize(order, token),
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => PaymentResult::declined(total, format!("gateway error: {e}")),
            Err(_) => PaymentResult::declined(
                total,
                format!(
                    "gateway did not answer within {:?}",
                    self.config.gateway_timeout
                ),
            ),
        }
    }
}
