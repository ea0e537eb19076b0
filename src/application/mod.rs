//! Application services built on the domain and the outbound ports.

pub mod alert;
pub mod bus;
pub mod cache;
pub mod control;
pub mod hub;
pub mod ingest;
pub mod ratelimit;
pub mod report;
