//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`] - `MockTransport` and a scriptable `ChannelStream` for
//!   driving the topic bus without a broker.
//! - [`publisher`] - `RecordingPublisher`, captures outbound JSON.
//! - [`notifier`] - `RecordingNotifier`, captures notification events.
//! - [`store`] - Cache stores that misbehave on purpose.
//! - [`domain`] - Builders for readings, status reports and alerts.
//! - [`config`] - Canonical test configurations.

pub mod config;
pub mod domain;
pub mod notifier;
pub mod publisher;
pub mod store;
pub mod transport;
