use crate::domain::money::Money;
use crate::domain::order::Order;
use crate::domain::payment::{PaymentResult, PaymentToken, RefundResult};
use crate::domain::ports::PaymentGateway;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens with this prefix are declined.
pub const DECLINE_PREFIX: &str = "tok_decline";
/// Tokens with this prefix fail with a transport error.
pub const ERROR_PREFIX: &str = "tok_error";

#[derive(Default)]
struct GatewayState {
    latency: Duration,
    fail_refunds: AtomicBool,
    authorizations: AtomicUsize,
    refunds: Mutex<Vec<Money>>,
}

/// Deterministic in-process payment processor.
///
/// Clones share their counters, so a test can keep one handle and give the
/// other to the workflow.
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<GatewayState>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Arc::new(GatewayState {
                latency,
                ..GatewayState::default()
            }),
        }
    }

    pub fn set_fail_refunds(&self, fail: bool) {
        self.state.fail_refunds.store(fail, Ordering::SeqCst);
    }

    /// Number of authorization calls received.
    pub fn authorizations(&self) -> usize {
        self.state.authorizations.load(Ordering::SeqCst)
    }

    /// Amounts of the refunds that went through.
    pub async fn refunds(&self) -> Vec<Money> {
        self.state.refunds.lock().await.clone()
    }

    async fn delay(&self) {
        if !self.state.latency.is_zero() {
            tokio::time::sleep(self.state.latency).await;
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn authorize(&self, order: &Order, token: &PaymentToken) -> Result<PaymentResult> {
        self.state.authorizations.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let amount = order.amounts.total;
        let token = token.as_str();
        if token.starts_with(ERROR_PREFIX) {
            return Err(OrderError::InternalError(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by payment processor",
            ))));
        }
        if token.starts_with(DECLINE_PREFIX) {
            debug!(order_number = %order.order_number, "fake gateway declining");
            return Ok(PaymentResult::declined(amount, "card declined"));
        }
        Ok(PaymentResult::Approved {
            transaction_id: format!("txn_{}", uuid::Uuid::new_v4().simple()),
            amount,
        })
    }

    async fn refund(&self, transaction_id: &str, amount: Money) -> Result<RefundResult> {
        self.delay().await;
        if self.state.fail_refunds.load(Ordering::SeqCst) {
            debug!(transaction_id, "fake gateway rejecting refund");
            return Ok(RefundResult::failed(amount, "refund rejected by processor"));
        }
        self.state.refunds.lock().await.push(amount);
        Ok(RefundResult::Refunded {
            refund_id: format!("re_{}", uuid::Uuid::new_v4().simple()),
            amount,
        })
    }
}
