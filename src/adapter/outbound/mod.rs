//! Outbound adapters (driven side).

pub mod memory;
pub mod mqtt;
pub mod notifier;
#[cfg(feature = "redis")]
pub mod redis;
