//! Edifice - building telemetry ingestion, alerting and live distribution.
//!
//! Devices publish readings and equipment status over MQTT. Edifice routes
//! them through a wildcard topic bus, keeps a short history per source,
//! evaluates threshold alerts with deduplication, and pushes live updates
//! to WebSocket observers grouped into building and zone rooms. Operator
//! control commands are admitted by a fixed-window rate limiter before they
//! reach the broker.
//!
//! # Modules
//!
//! - [`domain`] - Topics, readings, equipment, alerts, rooms and pure analytics
//! - [`port`] - Outbound traits: transport, cache store, alert repository,
//!   directory, notifier
//! - [`application`] - Topic bus, cache and rate limiter, broadcast hub,
//!   alert engine, ingestion, control gateway, energy reports
//! - [`adapter`] - MQTT, Redis, in-memory, webhook and WebSocket adapters
//! - [`infrastructure`] - Configuration and the composition root
//! - [`cli`] - `edifice run` / `edifice check`
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `webhook` (default) - POST alerts to `EDIFICE_WEBHOOK_URL`
//! - `redis` - Shared Redis cache backend
//! - `testkit` - Test doubles for integration tests
//!
//! # Example
//!
//! ```
//! use edifice::domain::topic_matches;
//!
//! assert!(topic_matches("sensors/+/temperature", "sensors/t-1/temperature"));
//! assert!(topic_matches("sensors/#", "sensors/t-1/humidity"));
//! assert!(!topic_matches("hvac/+/status", "hvac/ahu-1/control"));
//! ```

pub mod adapter;
pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
