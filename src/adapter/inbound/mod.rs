//! Inbound adapters (driving side).

pub mod websocket;
