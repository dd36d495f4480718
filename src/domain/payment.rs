use super::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque payment-method token obtained by the client from the processor.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentToken(String);

impl PaymentToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for PaymentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PaymentToken(***)")
    }
}

/// Outcome of a gateway authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResult {
    Approved { transaction_id: String, amount: Money },
    Declined { amount: Money, reason: String },
}

impl PaymentResult {
    pub fn declined(amount: Money, reason: impl Into<String>) -> Self {
        PaymentResult::Declined {
            amount,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PaymentResult::Approved { .. })
    }

    pub fn amount(&self) -> Money {
        match self {
            PaymentResult::Approved { amount, .. } | PaymentResult::Declined { amount, .. } => {
                *amount
            }
        }
    }
}

/// Outcome of a gateway refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundResult {
    Refunded { refund_id: String, amount: Money },
    Failed { amount: Money, reason: String },
}

impl RefundResult {
    pub fn failed(amount: Money, reason: impl Into<String>) -> Self {
        RefundResult::Failed {
            amount,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RefundResult::Refunded { .. })
    }
}
