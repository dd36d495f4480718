use super::item::ProductId;
use super::money::{Money, OrderAmounts, Price};
use super::order::ShippingDetails;
use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One requested line of a cart submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub customizations: Option<serde_json::Value>,
    #[serde(default)]
    pub preview_image_url: Option<String>,
}

/// A cart submission as received from the outer layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub subtotal_amount: Option<Decimal>,
    #[serde(default)]
    pub shipping_amount: Option<Decimal>,
    #[serde(default)]
    pub tax_amount: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    pub payment_method: String,
    pub shipping: ShippingDetails,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A line that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
    pub customizations: Option<serde_json::Value>,
    pub preview_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidCheckout {
    pub lines: Vec<ValidLine>,
    pub amounts: OrderAmounts,
    pub payment_method: String,
    pub shipping: ShippingDetails,
    pub notes: Option<String>,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(OrderError::ValidationError(format!("{field} must not be blank")))
    } else {
        Ok(())
    }
}

fn optional_money(field: &str, value: Option<Decimal>) -> Result<Money> {
    match value {
        Some(v) => Money::new(v)
            .map_err(|_| OrderError::ValidationError(format!("{field} must not be negative"))),
        None => Ok(Money::ZERO),
    }
}

impl CheckoutRequest {
    /// Checks everything that can be checked without touching storage.
    ///
    /// Missing shipping, tax and discount amounts count as zero; a missing
    /// subtotal is taken from the lines, a given one must match them.
    pub fn validate(self) -> Result<ValidCheckout> {
        if self.items.is_empty() {
            return Err(OrderError::ValidationError(
                "An order needs at least one item".to_string(),
            ));
        }

        require("payment_method", &self.payment_method)?;
        require("shipping.name", &self.shipping.name)?;
        require("shipping.email", &self.shipping.email)?;
        require("shipping.address", &self.shipping.address)?;
        require("shipping.city", &self.shipping.city)?;
        require("shipping.postal_code", &self.shipping.postal_code)?;
        require("shipping.country", &self.shipping.country)?;
        require("shipping.method", &self.shipping.method)?;

        let mut lines = Vec::with_capacity(self.items.len());
        for line in self.items {
            if line.quantity == 0 {
                return Err(OrderError::ValidationError(format!(
                    "Quantity for product {} must be at least 1",
                    line.product_id
                )));
            }
            lines.push(ValidLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: Price::new(line.unit_price)?,
                customizations: line.customizations,
                preview_image_url: line.preview_image_url,
            });
        }

        let line_total = Money::checked_sum(
            lines
                .iter()
                .map(|l| l.unit_price.times(l.quantity))
                .collect::<Result<Vec<_>>>()?,
        )?;
        let subtotal = match self.subtotal_amount {
            Some(v) => {
                let given = optional_money("subtotal_amount", Some(v))?;
                if !given.reconciles_with(line_total) {
                    return Err(OrderError::ValidationError(format!(
                        "Subtotal {given} does not match the item total {line_total}"
                    )));
                }
                given
            }
            None => line_total,
        };

        let amounts = OrderAmounts::new(
            subtotal,
            optional_money("shipping_amount", self.shipping_amount)?,
            optional_money("tax_amount", self.tax_amount)?,
            optional_money("discount_amount", self.discount_amount)?,
            optional_money("total_amount", Some(self.total_amount))?,
        )?;

        Ok(ValidCheckout {
            lines,
            amounts,
            payment_method: self.payment_method,
            shipping: self.shipping,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        })
    }
}
