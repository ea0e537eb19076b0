//! Broadcast rooms and observers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InvalidRoomKey;

/// Room key, namespaced by entity kind.
///
/// Renders as `building:{id}` or `zone:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomKey {
    Building(String),
    Zone(String),
}

impl RoomKey {
    #[must_use]
    pub fn building(id: impl Into<String>) -> Self {
        Self::Building(id.into())
    }

    #[must_use]
    pub fn zone(id: impl Into<String>) -> Self {
        Self::Zone(id.into())
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building(id) => write!(f, "building:{id}"),
            Self::Zone(id) => write!(f, "zone:{id}"),
        }
    }
}

impl FromStr for RoomKey {
    type Err = InvalidRoomKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("building", id)) if !id.is_empty() => Ok(Self::Building(id.to_string())),
            Some(("zone", id)) if !id.is_empty() => Ok(Self::Zone(id.to_string())),
            _ => Err(InvalidRoomKey(s.to_string())),
        }
    }
}

impl TryFrom<String> for RoomKey {
    type Error = InvalidRoomKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomKey> for String {
    fn from(key: RoomKey) -> Self {
        key.to_string()
    }
}

/// Identity of one connected observer (dashboard socket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(Uuid);

impl ObserverId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
