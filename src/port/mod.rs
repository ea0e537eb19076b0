//! Ports: the seams between application services and infrastructure.

pub mod outbound;
