use std::time::Duration;

/// Tunables of the order workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Upper bound on a single gateway call. A timed-out authorization counts
    /// as a decline.
    pub gateway_timeout: Duration,
    /// Authorizations allowed per order, counting the first. `1` disables
    /// retries after a decline.
    pub max_payment_attempts: u32,
    /// Capacity of the notification queue; messages beyond it are dropped.
    pub notification_capacity: usize,
    pub order_number_prefix: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(5),
            max_payment_attempts: 1,
            notification_capacity: 256,
            order_number_prefix: "ORD".to_string(),
        }
    }
}
