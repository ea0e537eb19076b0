//! Building directory: where a source lives and what it controls.

use crate::domain::room::RoomKey;

pub trait Directory: Send + Sync {
    /// Rooms interested in events from `source_id`.
    fn rooms_for(&self, source_id: &str) -> Vec<RoomKey>;

    /// Equipment a protective command should target for `source_id`.
    fn equipment_for(&self, source_id: &str) -> Option<String>;
}
