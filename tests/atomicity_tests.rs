use async_trait::async_trait;
use order_workflow::config::WorkflowConfig;
use order_workflow::domain::identity::Identity;
use order_workflow::domain::item::{NewOrderItem, OrderItem, ProductId, ProductSnapshot};
use order_workflow::domain::order::{NewOrder, Order, OrderId, OrderNumber, OrderStatus, UserId};
use order_workflow::domain::ports::{OrderStore, ProductCatalog};
use order_workflow::error::{ErrorKind, OrderError, Result};
use order_workflow::infrastructure::fake_gateway::FakeGateway;
use order_workflow::infrastructure::in_memory::InMemoryOrderStore;
use order_workflow::infrastructure::notification::RecordingChannel;
use order_workflow::application::engine::OrderWorkflow;
use order_workflow::application::notifier::Notifier;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

mod common;

/// Catalog that fails on the n-th lookup.
struct FlakyCatalog {
    inner: order_workflow::infrastructure::in_memory::InMemoryProductCatalog,
    fail_on: usize,
    lookups: AtomicUsize,
}

#[async_trait]
impl ProductCatalog for FlakyCatalog {
    async fn store(&self, product: ProductSnapshot) -> Result<()> {
        self.inner.store(product).await
    }

    async fn find(&self, id: ProductId) -> Result<Option<ProductSnapshot>> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(OrderError::storage("catalog connection lost"));
        }
        self.inner.find(id).await
    }
}

/// Store that reports a number collision for its first `collisions` creates.
struct CollidingStore {
    inner: InMemoryOrderStore,
    collisions: usize,
    creates: Arc<AtomicUsize>,
}

#[async_trait]
impl OrderStore for CollidingStore {
    async fn create(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        if self.creates.fetch_add(1, Ordering::SeqCst) < self.collisions {
            return Err(OrderError::DuplicateOrderNumber(
                order.order_number.to_string(),
            ));
        }
        self.inner.create(order, items).await
    }

    async fn update(&self, order: Order) -> Result<Order> {
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

async fn workflow_over(store: CollidingStore) -> OrderWorkflow {
    let (notifier, _dispatcher) = Notifier::spawn(Box::new(RecordingChannel::new()), 8);
    OrderWorkflow::new(
        Box::new(store),
        Box::new(common::seeded_catalog(3).await),
        Box::new(FakeGateway::new()),
        notifier,
        WorkflowConfig::default(),
    )
}

#[tokio::test]
async fn test_failure_midway_through_lines_leaves_no_order() {
    let catalog = FlakyCatalog {
        inner: common::seeded_catalog(6).await,
        fail_on: 3,
        lookups: AtomicUsize::new(0),
    };
    let h = common::harness_with_catalog(
        FakeGateway::new(),
        WorkflowConfig::default(),
        Box::new(catalog),
    );
    let user = Identity::customer(7);

    let lines: Vec<(u64, u32, rust_decimal::Decimal)> =
        (1..=6).map(|id| (id, 1, dec!(4.00))).collect();
    let err = h
        .workflow
        .create_order(&user, common::checkout(&lines))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    assert!(h.workflow.list_orders(&user, None).await.unwrap().is_empty());
    let orders = h.workflow.into_orders().await.unwrap();
    assert!(orders.is_empty());

    // Nothing was confirmed, so nothing was announced.
    h.dispatcher.await.unwrap();
    assert!(h.channel.sent().await.is_empty());
}

#[tokio::test]
async fn test_order_number_collision_is_retried() {
    let creates = Arc::new(AtomicUsize::new(0));
    let workflow = workflow_over(CollidingStore {
        inner: InMemoryOrderStore::new(),
        collisions: 1,
        creates: Arc::clone(&creates),
    })
    .await;

    let view = workflow
        .create_order(&Identity::customer(7), common::checkout(&[(1, 2, dec!(3.00))]))
        .await
        .unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(creates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_persistent_collisions_surface_as_conflict() {
    let creates = Arc::new(AtomicUsize::new(0));
    let workflow = workflow_over(CollidingStore {
        inner: InMemoryOrderStore::new(),
        collisions: usize::MAX,
        creates: Arc::clone(&creates),
    })
    .await;

    let err = workflow
        .create_order(&Identity::customer(7), common::checkout(&[(1, 1, dec!(3.00))]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::DuplicateOrderNumber(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(creates.load(Ordering::SeqCst), 3);
    assert!(workflow.into_orders().await.unwrap().is_empty());
}
