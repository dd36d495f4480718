use async_trait::async_trait;
use order_workflow::application::engine::OrderWorkflow;
use order_workflow::application::notifier::Notifier;
use order_workflow::config::WorkflowConfig;
use order_workflow::domain::identity::Identity;
use order_workflow::domain::item::{NewOrderItem, OrderItem};
use order_workflow::domain::money::Money;
use order_workflow::domain::order::{
    NewOrder, Order, OrderId, OrderNumber, OrderStatus, PaymentStatus, UserId,
};
use order_workflow::domain::payment::PaymentToken;
use order_workflow::domain::ports::OrderStore;
use order_workflow::error::{ErrorKind, OrderError, Result};
use order_workflow::infrastructure::fake_gateway::FakeGateway;
use order_workflow::infrastructure::in_memory::InMemoryOrderStore;
use order_workflow::infrastructure::notification::RecordingChannel;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

mod common;

#[derive(Clone, Copy, PartialEq)]
enum Outage {
    /// Writes recording a `PAID` payment fail.
    PaidWrites,
    /// Every write that settles a claimed payment fails.
    Settlements,
}

/// Store whose writes fail for settled payments while `down` is set.
struct DiskFullStore {
    inner: InMemoryOrderStore,
    outage: Outage,
    down: Arc<AtomicBool>,
}

impl DiskFullStore {
    fn rejects(&self, order: &Order) -> bool {
        if !self.down.load(Ordering::SeqCst) {
            return false;
        }
        match self.outage {
            Outage::PaidWrites => order.payment_status == PaymentStatus::Paid,
            Outage::Settlements => order.payment_attempts > 0 && !order.payment_in_flight(),
        }
    }
}

#[async_trait]
impl OrderStore for DiskFullStore {
    async fn create(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        self.inner.create(order, items).await
    }

    async fn update(&self, order: Order) -> Result<Order> {
        if self.rejects(&order) {
            return Err(OrderError::storage("disk full"));
        }
        self.inner.update(order).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.inner.get(id).await
    }

    async fn get_for_user(&self, id: OrderId, user_id: UserId) -> Result<Option<Order>> {
        self.inner.get_for_user(id, user_id).await
    }

    async fn find_by_number_for_user(
        &self,
        number: &OrderNumber,
        user_id: UserId,
    ) -> Result<Option<Order>> {
        self.inner.find_by_number_for_user(number, user_id).await
    }

    async fn find_by_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        self.inner.find_by_user(user_id, status).await
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        self.inner.find_by_status(status).await
    }

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        self.inner.items(order_id).await
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        self.inner.get_all().await
    }
}

struct Setup {
    workflow: OrderWorkflow,
    gateway: FakeGateway,
    down: Arc<AtomicBool>,
}

async fn setup(outage: Outage, config: WorkflowConfig) -> Setup {
    let gateway = FakeGateway::new();
    let down = Arc::new(AtomicBool::new(true));
    let (notifier, _dispatcher) = Notifier::spawn(Box::new(RecordingChannel::new()), 8);
    let workflow = OrderWorkflow::new(
        Box::new(DiskFullStore {
            inner: InMemoryOrderStore::new(),
            outage,
            down: Arc::clone(&down),
        }),
        Box::new(common::seeded_catalog(3).await),
        Box::new(gateway.clone()),
        notifier,
        config,
    );
    Setup {
        workflow,
        gateway,
        down,
    }
}

async fn place(workflow: &OrderWorkflow, user: &Identity) -> OrderId {
    workflow
        .create_order(user, common::checkout(&[(1, 2, dec!(10.00))]))
        .await
        .unwrap()
        .order
        .id
}

#[tokio::test]
async fn test_unrecorded_charge_is_reversed() {
    let s = setup(Outage::PaidWrites, WorkflowConfig::default()).await;
    let user = Identity::customer(7);
    let id = place(&s.workflow, &user).await;

    let err = s
        .workflow
        .process_payment(&user, id, PaymentToken::new("tok_visa"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(s.gateway.authorizations(), 1);
    assert_eq!(s.gateway.refunds().await, vec![Money::new(dec!(20.00)).unwrap()]);

    let order = s.workflow.get_order(&user, id).await.unwrap().order;
    assert!(!order.payment_in_flight());
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert!(order.payment_transaction_id.is_some());
    assert!(order.refund_id.is_some());
    assert!(!order.needs_manual_refund);

    // The order is no longer stuck and closing it issues no second refund.
    let cancelled = s.workflow.cancel_order(&user, id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(s.gateway.refunds().await.len(), 1);
}

#[tokio::test]
async fn test_unreversed_charge_is_left_for_retry_refund() {
    let s = setup(Outage::PaidWrites, WorkflowConfig::default()).await;
    let user = Identity::customer(7);
    let admin = Identity::admin(1);
    let id = place(&s.workflow, &user).await;

    s.gateway.set_fail_refunds(true);
    let err = s
        .workflow
        .process_payment(&user, id, PaymentToken::new("tok_visa"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    let order = s.workflow.get_order(&user, id).await.unwrap().order;
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert!(order.needs_manual_refund);
    assert!(order.owes_refund());

    // No new charge while the captured one is still owed back.
    let err = s
        .workflow
        .process_payment(&user, id, PaymentToken::new("tok_visa"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(s.gateway.authorizations(), 1);

    s.gateway.set_fail_refunds(false);
    let order = s.workflow.retry_refund(&admin, id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert!(order.refund_id.is_some());
    assert!(!order.needs_manual_refund);
    assert_eq!(s.gateway.refunds().await.len(), 1);
}

#[tokio::test]
async fn test_stale_claim_is_released_by_admin() {
    let config = WorkflowConfig {
        gateway_timeout: Duration::from_millis(100),
        ..WorkflowConfig::default()
    };
    let s = setup(Outage::Settlements, config).await;
    let user = Identity::customer(7);
    let admin = Identity::admin(1);
    let id = place(&s.workflow, &user).await;

    let err = s
        .workflow
        .process_payment(&user, id, PaymentToken::new("tok_visa"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    let order = s.workflow.get_order(&user, id).await.unwrap().order;
    assert!(order.payment_in_flight());

    s.down.store(false, Ordering::SeqCst);

    let err = s.workflow.resolve_payment(&user, id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = s.workflow.resolve_payment(&admin, id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let order = s.workflow.resolve_payment(&admin, id).await.unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert!(!order.payment_in_flight());

    let cancelled = s.workflow.cancel_order(&user, id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let err = s.workflow.resolve_payment(&admin, id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
