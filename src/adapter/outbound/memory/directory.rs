//! Directory backed by the `[[directory]]` config table.

use std::collections::HashMap;

use crate::domain::room::RoomKey;
use crate::infrastructure::config::directory::DirectoryEntry;
use crate::port::outbound::directory::Directory;

/// Fixed source → building/zone/equipment map.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    entries: HashMap<String, DirectoryEntry>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.source.clone(), entry))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Directory for StaticDirectory {
    fn rooms_for(&self, source_id: &str) -> Vec<RoomKey> {
        let Some(entry) = self.entries.get(source_id) else {
            return Vec::new();
        };
        let mut rooms = vec![RoomKey::building(entry.building.clone())];
        if let Some(zone) = &entry.zone {
            rooms.push(RoomKey::zone(zone.clone()));
        }
        rooms
    }

    fn equipment_for(&self, source_id: &str) -> Option<String> {
        self.entries.get(source_id)?.equipment.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rooms_include_building_and_zone() {
        let directory = StaticDirectory::new(vec![DirectoryEntry {
            source: "t-1".into(),
            building: "hq".into(),
            zone: Some("f1".into()),
            equipment: Some("ahu-1".into()),
        }]);

        assert_eq!(
            directory.rooms_for("t-1"),
            vec![RoomKey::building("hq"), RoomKey::zone("f1")]
        );
        assert_eq!(directory.equipment_for("t-1").as_deref(), Some("ahu-1"));
        assert!(directory.rooms_for("unknown").is_empty());
        assert!(directory.equipment_for("unknown").is_none());
    }
}
