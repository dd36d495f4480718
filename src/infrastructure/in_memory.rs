use crate::domain::item::{NewOrderItem, OrderItem, OrderItemId, ProductId, ProductSnapshot};
use crate::domain::order::{NewOrder, Order, OrderId, OrderNumber, OrderStatus, UserId};
use crate::domain::ports::{OrderStore, ProductCatalog};
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct OrderTables {
    orders: BTreeMap<OrderId, Order>,
    numbers: HashMap<OrderNumber, OrderId>,
    items: BTreeMap<OrderId, Vec<OrderItem>>,
    next_order_id: u64,
    next_item_id: u64,
}

/// A thread-safe in-memory store for orders and their items.
///
/// All tables sit behind one `RwLock`, so an order and its items become
/// visible together and the version check of `update` cannot race.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<OrderTables>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        let mut tables = self.tables.write().await;
        if tables.numbers.contains_key(&order.order_number) {
            return Err(OrderError::DuplicateOrderNumber(
                order.order_number.to_string(),
            ));
        }

        tables.next_order_id += 1;
        let order = order.into_order(OrderId(tables.next_order_id));
        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            tables.next_item_id += 1;
            stored.push(item.into_item(OrderItemId(tables.next_item_id), order.id));
        }

        tables.numbers.insert(order.order_number.clone(), order.id);
        tables.items.insert(order.id, stored.clone());
        tables.orders.insert(order.id, order.clone());
        Ok((order, stored))
    }

    async fn update(&self, mut order: Order) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let current = tables
            .orders
            .get(&order.id)
            .ok_or_else(|| OrderError::not_found("order", order.id))?;
        if current.version != order.version {
            return Err(OrderError::Conflict(format!(
                "order {} was modified concurrently",
                order.order_number
            )));
        }
        order.version += 1;
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&id).cloned())
    }

    async fn get_for_user(&self, id: OrderId, user_id: UserId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .get(&id)
            .filter(|o| o.user_id == user_id)
            .cloned())
    }

    async fn find_by_number_for_user(
        &self,
        number: &OrderNumber,
        user_id: UserId,
    ) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .numbers
            .get(number)
            .and_then(|id| tables.orders.get(id))
            .filter(|o| o.user_id == user_id)
            .cloned())
    }

    async fn find_by_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id && status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let tables = self.tables.read().await;
        Ok(tables.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.values().cloned().collect())
    }
}

/// A thread-safe in-memory product catalog.
#[derive(Default, Clone)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, ProductSnapshot>>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn store(&self, product: ProductSnapshot) -> Result<()> {
        let mut products = self.products.write().await;
        products.insert(product.id, product);
        Ok(())
    }

    async fn find(&self, id: ProductId) -> Result<Option<ProductSnapshot>> {
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }
}
