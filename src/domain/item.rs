use super::money::{Money, Price};
use super::order::OrderId;
use crate::error::OrderError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderItemId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog fields copied onto an item when the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub image_url: Option<String>,
}

/// An order line ready to be written, still without ids.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product: ProductSnapshot,
    pub quantity: u32,
    pub unit_price: Price,
    pub total_price: Money,
    pub customizations: Option<serde_json::Value>,
    pub preview_image_url: Option<String>,
}

impl NewOrderItem {
    pub fn new(
        product: ProductSnapshot,
        quantity: u32,
        unit_price: Price,
        customizations: Option<serde_json::Value>,
        preview_image_url: Option<String>,
    ) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::ValidationError(format!(
                "Quantity for product {} must be at least 1",
                product.id
            )));
        }
        Ok(Self {
            total_price: unit_price.times(quantity)?,
            product,
            quantity,
            unit_price,
            customizations,
            preview_image_url,
        })
    }

    pub fn into_item(self, id: OrderItemId, order_id: OrderId) -> OrderItem {
        OrderItem {
            id,
            order_id,
            product_id: self.product.id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price: self.total_price,
            product_name: self.product.name,
            product_sku: self.product.sku,
            product_image_url: self.product.image_url,
            customizations: self.customizations,
            preview_image_url: self.preview_image_url,
        }
    }
}

/// A persisted order line. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
    pub total_price: Money,
    pub product_name: String,
    pub product_sku: String,
    pub product_image_url: Option<String>,
    /// Opaque customization payload, kept verbatim.
    pub customizations: Option<serde_json::Value>,
    pub preview_image_url: Option<String>,
}
