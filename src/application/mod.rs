//! Application layer orchestrating the order workflow.
//!
//! `OrderWorkflow` drives checkout, payment, fulfilment and cancellation over
//! the domain ports; `Notifier` hands messages to a background dispatcher so
//! that delivery never blocks or fails a workflow operation.

pub mod engine;
pub mod notifier;
