use crate::error::OrderError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// Scale used when comparing monetary values.
pub const MONEY_SCALE: u32 = 2;

/// A non-negative monetary value.
///
/// Wraps `rust_decimal::Decimal` so amounts never go through floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

/// A strictly positive unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, OrderError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(OrderError::ValidationError(format!(
                "Amount must not be negative, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Sum of two amounts, or `ValidationError` if it exceeds what a
    /// `Decimal` can hold.
    pub fn checked_add(self, rhs: Money) -> Result<Money, OrderError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| OrderError::ValidationError(format!("Amount overflow adding {self} and {rhs}")))
    }

    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Result<Money, OrderError> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }

    /// Equality at [`MONEY_SCALE`], absorbing sub-cent rounding noise.
    pub fn reconciles_with(&self, other: Money) -> bool {
        self.0.round_dp(MONEY_SCALE) == other.0.round_dp(MONEY_SCALE)
    }
}

impl Price {
    pub fn new(value: Decimal) -> Result<Self, OrderError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(OrderError::ValidationError(format!(
                "Unit price must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units; overflow is a `ValidationError`.
    pub fn times(self, quantity: u32) -> Result<Money, OrderError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money)
            .ok_or_else(|| {
                OrderError::ValidationError(format!(
                    "Line total overflows for {quantity} x {}",
                    self.0
                ))
            })
    }
}

impl TryFrom<Decimal> for Money {
    type Error = OrderError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = OrderError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl From<Price> for Money {
    fn from(price: Price) -> Self {
        Self(price.0)
    }
}

// Signed result: the caller decides whether a negative difference is an error.
impl Sub for Money {
    type Output = Decimal;
    fn sub(self, rhs: Self) -> Decimal {
        self.0 - rhs.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monetary breakdown of an order.
///
/// Constructed only through [`OrderAmounts::new`], which enforces
/// `total == subtotal + shipping + tax - discount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAmounts {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderAmounts {
    pub fn new(
        subtotal: Money,
        shipping: Money,
        tax: Money,
        discount: Money,
        total: Money,
    ) -> Result<Self, OrderError> {
        if total.value() <= Decimal::ZERO {
            return Err(OrderError::ValidationError(
                "Total amount must be positive".to_string(),
            ));
        }
        let expected = Self::expected_total(subtotal, shipping, tax, discount).ok_or_else(|| {
            OrderError::ValidationError(format!(
                "Amounts overflow: subtotal {subtotal} + shipping {shipping} + tax {tax} - discount {discount}"
            ))
        })?;
        if expected.round_dp(MONEY_SCALE) != total.value().round_dp(MONEY_SCALE) {
            return Err(OrderError::ValidationError(format!(
                "Total {total} does not match subtotal {subtotal} + shipping {shipping} + tax {tax} - discount {discount} = {expected}"
            )));
        }
        Ok(Self {
            subtotal,
            shipping,
            tax,
            discount,
            total,
        })
    }

    /// Re-checks the breakdown invariant on an already constructed value.
    pub fn is_balanced(&self) -> bool {
        Self::expected_total(self.subtotal, self.shipping, self.tax, self.discount)
            .is_some_and(|expected| Money(expected).reconciles_with(self.total))
    }

    fn expected_total(
        subtotal: Money,
        shipping: Money,
        tax: Money,
        discount: Money,
    ) -> Option<Decimal> {
        subtotal
            .0
            .checked_add(shipping.0)?
            .checked_add(tax.0)?
            .checked_sub(discount.0)
    }
}
