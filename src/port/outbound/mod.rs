//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the broker transport, the cache store, alert
//! persistence, the building directory and notifications.

pub mod alert;
pub mod directory;
pub mod notifier;
pub mod publisher;
pub mod store;
pub mod transport;
