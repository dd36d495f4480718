use crate::application::engine::OrderWorkflow;
use crate::domain::checkout::CheckoutRequest;
use crate::domain::identity::Identity;
use crate::domain::order::{OrderId, OrderStatus};
use crate::domain::payment::PaymentToken;
use crate::error::{OrderError, Result};
use serde::Deserialize;
use std::io::BufRead;
use tracing::info;

/// One line of a command file.
///
/// ```json
/// {"op":"pay","user_id":7,"order_id":1,"token":"tok_visa"}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Checkout {
        user_id: u64,
        request: CheckoutRequest,
    },
    Pay {
        user_id: u64,
        order_id: OrderId,
        token: PaymentToken,
    },
    Cancel {
        user_id: u64,
        order_id: OrderId,
    },
    SetStatus {
        admin_id: u64,
        order_id: OrderId,
        status: OrderStatus,
    },
    RetryRefund {
        admin_id: u64,
        order_id: OrderId,
    },
    ResolvePayment {
        admin_id: u64,
        order_id: OrderId,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Checkout { .. } => "checkout",
            Command::Pay { .. } => "pay",
            Command::Cancel { .. } => "cancel",
            Command::SetStatus { .. } => "set_status",
            Command::RetryRefund { .. } => "retry_refund",
            Command::ResolvePayment { .. } => "resolve_payment",
        }
    }

    /// Runs the command against `workflow` on behalf of the identity it names.
    pub async fn apply(self, workflow: &OrderWorkflow) -> Result<()> {
        match self {
            Command::Checkout { user_id, request } => {
                let view = workflow
                    .create_order(&Identity::customer(user_id), request)
                    .await?;
                info!(order_id = %view.order.id, order_number = %view.order.order_number, "checkout applied");
            }
            Command::Pay {
                user_id,
                order_id,
                token,
            } => {
                workflow
                    .process_payment(&Identity::customer(user_id), order_id, token)
                    .await?;
            }
            Command::Cancel { user_id, order_id } => {
                workflow
                    .cancel_order(&Identity::customer(user_id), order_id)
                    .await?;
            }
            Command::SetStatus {
                admin_id,
                order_id,
                status,
            } => {
                workflow
                    .update_order_status(&Identity::admin(admin_id), order_id, status)
                    .await?;
            }
            Command::RetryRefund { admin_id, order_id } => {
                workflow
                    .retry_refund(&Identity::admin(admin_id), order_id)
                    .await?;
            }
            Command::ResolvePayment { admin_id, order_id } => {
                workflow
                    .resolve_payment(&Identity::admin(admin_id), order_id)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Reads commands from a JSON-lines source. Blank lines are skipped.
pub struct CommandReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Lazily parses commands; a malformed line yields a `ValidationError`
    /// naming its line number and does not stop the stream.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.source
            .lines()
            .enumerate()
            .filter_map(|(index, line)| match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(serde_json::from_str(&line).map_err(|e| {
                    OrderError::ValidationError(format!("line {}: {e}", index + 1))
                })),
                Err(e) => Some(Err(OrderError::from(e))),
            })
    }
}
