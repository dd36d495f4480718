use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Stable, machine-readable classification of an [`OrderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    PaymentDeclined,
    RefundFailed,
    Forbidden,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PaymentDeclined => "payment_declined",
            ErrorKind::RefundFailed => "refund_failed",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Diagnostic)]
pub enum OrderError {
    #[error("Validation error: {0}")]
    #[diagnostic(code(order::validation))]
    ValidationError(String),

    #[error("{entity} {id} not found")]
    #[diagnostic(code(order::not_found))]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    #[diagnostic(code(order::conflict))]
    Conflict(String),

    #[error("Order number {0} is already taken")]
    #[diagnostic(code(order::conflict))]
    DuplicateOrderNumber(String),

    #[error("Payment declined for order {order_number}: {reason}")]
    #[diagnostic(code(order::payment_declined))]
    PaymentDeclined { order_number: String, reason: String },

    #[error("Refund failed for order {order_number}: {reason}")]
    #[diagnostic(
        code(order::refund_failed),
        help("the order is flagged for manual refund; retry it once the gateway recovers")
    )]
    RefundFailed { order_number: String, reason: String },

    #[error("Forbidden: {0}")]
    #[diagnostic(code(order::forbidden))]
    Forbidden(String),

    #[error("Storage error: {0}")]
    #[diagnostic(code(order::storage))]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl OrderError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        OrderError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        OrderError::InternalError(Box::new(std::io::Error::other(message.into())))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ValidationError(_) => ErrorKind::Validation,
            OrderError::NotFound { .. } => ErrorKind::NotFound,
            OrderError::Conflict(_) | OrderError::DuplicateOrderNumber(_) => ErrorKind::Conflict,
            OrderError::PaymentDeclined { .. } => ErrorKind::PaymentDeclined,
            OrderError::RefundFailed { .. } => ErrorKind::RefundFailed,
            OrderError::Forbidden(_) => ErrorKind::Forbidden,
            OrderError::InternalError(_) => ErrorKind::Storage,
        }
    }
}

impl From<std::io::Error> for OrderError {
    fn from(err: std::io::Error) -> Self {
        OrderError::InternalError(Box::new(err))
    }
}

impl From<csv::Error> for OrderError {
    fn from(err: csv::Error) -> Self {
        OrderError::InternalError(Box::new(err))
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(err: serde_json::Error) -> Self {
        OrderError::InternalError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for OrderError {
    fn from(err: rocksdb::Error) -> Self {
        OrderError::InternalError(Box::new(err))
    }
}

#[cfg(feature = "gateway-http")]
impl From<reqwest::Error> for OrderError {
    fn from(err: reqwest::Error) -> Self {
        OrderError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(
            OrderError::ValidationError("x".into()).kind().as_str(),
            "validation"
        );
        assert_eq!(OrderError::not_found("order", 7).kind(), ErrorKind::NotFound);
        assert_eq!(
            OrderError::DuplicateOrderNumber("ORD-1".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(OrderError::storage("disk").kind().as_str(), "storage");
    }

    #[test]
    fn test_not_found_message() {
        let err = OrderError::not_found("order", 42);
        assert_eq!(err.to_string(), "order 42 not found");
    }
}
