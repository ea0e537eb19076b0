//! Infrastructure configuration modules.

pub mod alerts;
pub mod cache;
pub mod directory;
pub mod hub;
pub mod ingest;
pub mod logging;
pub mod notifications;
pub mod rate_limit;
pub mod settings;
pub mod transport;
