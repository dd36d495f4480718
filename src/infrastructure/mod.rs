//! Adapters implementing the domain ports: storage backends, payment
//! gateways and notification channels.

pub mod fake_gateway;
#[cfg(feature = "gateway-http")]
pub mod http_gateway;
pub mod in_memory;
pub mod notification;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
