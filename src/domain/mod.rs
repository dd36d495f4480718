//! Domain model: orders, items, money and the ports the workflow depends on.

pub mod checkout;
pub mod identity;
pub mod item;
pub mod money;
pub mod notification;
pub mod order;
pub mod payment;
pub mod ports;
