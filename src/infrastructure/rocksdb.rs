use crate::domain::item::{NewOrderItem, OrderItem, OrderItemId, ProductId, ProductSnapshot};
use crate::domain::order::{NewOrder, Order, OrderId, OrderNumber, OrderStatus, UserId};
use crate::domain::ports::{OrderStore, ProductCatalog};
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for order rows, keyed by big-endian order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for item rows, keyed by order id followed by item id.
pub const CF_ORDER_ITEMS: &str = "order_items";
/// Column Family mapping order numbers to order ids.
pub const CF_ORDER_NUMBERS: &str = "order_numbers";
/// Column Family for catalog snapshots.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for id counters.
pub const CF_META: &str = "meta";

const NEXT_ORDER_ID: &[u8] = b"next_order_id";
const NEXT_ITEM_ID: &[u8] = b"next_item_id";

/// A persistent store implementation using RocksDB.
///
/// Creation writes the order row, its item rows, the number index and the
/// counters in a single `WriteBatch`. Writers are serialized by `write_lock`
/// so the uniqueness and version checks see a stable view.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_ORDERS, CF_ORDER_ITEMS, CF_ORDER_NUMBERS, CF_PRODUCTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| OrderError::storage(format!("{name} column family not found")))
    }

    fn read_counter(&self, key: &[u8]) -> Result<u64> {
        match self.db.get_cf(self.cf(CF_META)?, key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| OrderError::storage("corrupt id counter"))?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(self.cf(cf)?, key, bytes)?;
        Ok(())
    }

    fn scan_orders(&self, mut keep: impl FnMut(&Order) -> bool) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for entry in self.db.iterator_cf(self.cf(CF_ORDERS)?, IteratorMode::Start) {
            let (_key, value) = entry?;
            let order: Order = serde_json::from_slice(&value)?;
            if keep(&order) {
                orders.push(order);
            }
        }
        Ok(orders)
    }
}

fn item_key(order_id: OrderId, item_id: OrderItemId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&order_id.0.to_be_bytes());
    key[8..].copy_from_slice(&item_id.0.to_be_bytes());
    key
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn create(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        let _guard = self.write_lock.lock().await;

        let numbers = self.cf(CF_ORDER_NUMBERS)?;
        if self.db.get_cf(numbers, order.order_number.as_str())?.is_some() {
            return Err(OrderError::DuplicateOrderNumber(
                order.order_number.to_string(),
            ));
        }

        let order_id = self.read_counter(NEXT_ORDER_ID)? + 1;
        let mut item_id = self.read_counter(NEXT_ITEM_ID)?;
        let order = order.into_order(OrderId(order_id));

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_ORDERS)?,
            order.id.0.to_be_bytes(),
            serde_json::to_vec(&order)?,
        );
        let item_cf = self.cf(CF_ORDER_ITEMS)?;
        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            item_id += 1;
            let item = item.into_item(OrderItemId(item_id), order.id);
            batch.put_cf(item_cf, item_key(order.id, item.id), serde_json::to_vec(&item)?);
            stored.push(item);
        }
        batch.put_cf(numbers, order.order_number.as_str(), order.id.0.to_be_bytes());
        let meta = self.cf(CF_META)?;
        batch.put_cf(meta, NEXT_ORDER_ID, order_id.to_be_bytes());
        batch.put_cf(meta, NEXT_ITEM_ID, item_id.to_be_bytes());
        self.db.write(batch)?;

        Ok((order, stored))
    }

    async fn update(&self, mut order: Order) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let key = order.id.0.to_be_bytes();
        let current: Order = self
            .get_json(CF_ORDERS, &key)?
            .ok_or_else(|| OrderError::not_found("order", order.id))?;
        if current.version != order.version {
            return Err(OrderError::Conflict(format!(
                "order {} was modified concurrently",
                order.order_number
            )));
        }
        order.version += 1;
        self.put_json(CF_ORDERS, &key, &order)?;
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, &id.0.to_be_bytes())
    }

    async fn get_for_user(&self, id: OrderId, user_id: UserId) -> Result<Option<Order>> {
        Ok(self.get(id).await?.filter(|o| o.user_id == user_id))
    }

    async fn find_by_number_for_user(
        &self,
        number: &OrderNumber,
        user_id: UserId,
    ) -> Result<Option<Order>> {
        let Some(raw) = self.db.get_cf(self.cf(CF_ORDER_NUMBERS)?, number.as_str())? else {
            return Ok(None);
        };
        let raw: [u8; 8] = raw
            .as_slice()
            .try_into()
            .map_err(|_| OrderError::storage("corrupt order number index"))?;
        self.get_for_user(OrderId(u64::from_be_bytes(raw)), user_id)
            .await
    }

    async fn find_by_user(
        &self,
        user_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let mut orders = self.scan_orders(|o| {
            o.user_id == user_id && status.is_none_or(|s| o.status == s)
        })?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        let mut orders = self.scan_orders(|o| o.status == status)?;
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let prefix = order_id.0.to_be_bytes();
        let mut items = Vec::new();
        let iter = self.db.iterator_cf(
            self.cf(CF_ORDER_ITEMS)?,
            IteratorMode::From(&prefix, Direction::Forward),
        );
        for entry in iter {
            let (key, value) = entry?;
            if !key.starts_with(&prefix) {
                break;
            }
            items.push(serde_json::from_slice(&value)?);
        }
        Ok(items)
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        self.scan_orders(|_| true)
    }
}

#[async_trait]
impl ProductCatalog for RocksDBStore {
    async fn store(&self, product: ProductSnapshot) -> Result<()> {
        self.put_json(CF_PRODUCTS, &product.id.0.to_be_bytes(), &product)
    }

    async fn find(&self, id: ProductId) -> Result<Option<ProductSnapshot>> {
        self.get_json(CF_PRODUCTS, &id.0.to_be_bytes())
    }
}
