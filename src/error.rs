use thiserror::Error;

use crate::domain::alert::{Alert, AlertId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Topic-bus transport failures.
///
/// Everything except [`TransportError::RetriesExhausted`] is recovered inside
/// the bus; exhaustion is the one failure surfaced to the bus owner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("connect attempt timed out after {millis}ms")]
    ConnectTimeout { millis: u64 },

    #[error("connection refused by broker: {0}")]
    Refused(String),

    #[error("gave up reconnecting after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("transport client error: {0}")]
    Client(String),
}

/// Rate-limiter denial. Maps to HTTP 429 at the admission boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rate limit exceeded for policy '{policy}' (limit {limit}), retry after {retry_after_secs}s")]
pub struct ThrottleExceeded {
    pub policy: String,
    pub limit: u64,
    pub retry_after_secs: u64,
}

impl ThrottleExceeded {
    /// Status code returned to HTTP callers when admission is denied.
    pub const STATUS_CODE: u16 = 429;
}

/// Cache store errors.
///
/// Reachability is part of the variant so callers must branch on it:
/// [`CacheError::Unavailable`] and [`CacheError::Timeout`] mean the store
/// could not be consulted at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("cache operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("value at '{key}' is not an integer")]
    NotAnInteger { key: String },

    #[error("cache value serialization failed: {0}")]
    Serialization(String),
}

impl CacheError {
    /// True when the store itself could not be reached.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Alert lifecycle errors.
#[derive(Error, Debug, Clone)]
pub enum AlertError {
    #[error("alert {id} not found")]
    NotFound { id: AlertId },

    /// Illegal transition. Carries the canonical current alert so the caller
    /// can reconcile.
    #[error("cannot {attempted} alert {}: it is {}", current.id, current.status)]
    StateConflict {
        attempted: &'static str,
        current: Box<Alert>,
    },
}

impl AlertError {
    /// The current alert state, when the error carries one.
    #[must_use]
    pub fn current(&self) -> Option<&Alert> {
        match self {
            Self::NotFound { .. } => None,
            Self::StateConflict { current, .. } => Some(current),
        }
    }
}

/// Analytics input errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("insufficient history: need at least {required} points, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("annual savings must be positive, got {annual_savings}")]
    NonPositiveSavings { annual_savings: f64 },

    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

/// Malformed subscription pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid topic pattern '{pattern}': {reason}")]
pub struct InvalidTopicPattern {
    pub pattern: String,
    pub reason: &'static str,
}

/// Room key that is neither `building:<id>` nor `zone:<id>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid room key '{0}': expected building:<id> or zone:<id>")]
pub struct InvalidRoomKey(pub String);

/// Inbound payload could not be decoded for its topic.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown metric kind '{0}'")]
    UnknownMetricKind(String),

    #[error("payload metric '{metric_kind}' does not match topic '{topic}'")]
    TopicMismatch { topic: String, metric_kind: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Throttled(#[from] ThrottleExceeded),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    InvalidTopicPattern(#[from] InvalidTopicPattern),

    #[error("invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    #[error(transparent)]
    InvalidRoomKey(#[from] InvalidRoomKey),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{queue} queue is full")]
    QueueFull { queue: &'static str },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}
