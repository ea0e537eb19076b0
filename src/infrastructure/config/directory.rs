//! Static building directory entries.

use serde::Deserialize;

/// Where one source lives.
///
/// ```toml
/// [[directory]]
/// source = "t-101"
/// building = "hq"
/// zone = "floor-1"
/// equipment = "ahu-1"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntry {
    pub source: String,
    pub building: String,
    #[serde(default)]
    pub zone: Option<String>,
    /// Equipment serving this source, targeted by protective commands.
    #[serde(default)]
    pub equipment: Option<String>,
}
