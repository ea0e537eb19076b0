//! Transport-agnostic domain types.
//!
//! - [`topic`] - Topic namespace and wildcard matching
//! - [`reading`] - Sensor readings and metric kinds
//! - [`equipment`] - Equipment status and control commands
//! - [`alert`] - Alert lifecycle
//! - [`room`] - Broadcast rooms and observers
//! - [`event`] - Observer-facing events and frames
//! - [`analytics`] - Pure demand, forecast, degree-day and ROI arithmetic

pub mod alert;
pub mod analytics;
pub mod connection;
pub mod equipment;
pub mod event;
pub mod message;
pub mod reading;
pub mod room;
pub mod topic;

pub use alert::{Alert, AlertId, AlertKey, AlertKind, AlertStatus, Severity, Transition};
pub use connection::ConnectionState;
pub use equipment::{CommandOrigin, ControlAction, ControlCommand, EquipmentState, EquipmentStatus};
pub use event::{EnergyUpdate, Frame, ObserverEvent, SystemStatus, ZoneUpdate};
pub use message::InboundMessage;
pub use reading::{MetricKind, Reading};
pub use room::{ObserverId, RoomKey};
pub use topic::{topic_matches, topics, TopicPattern, TopicRoute};
