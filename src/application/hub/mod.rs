//! Room-scoped fan-out to live observers.
//!
//! Every observer owns a bounded frame queue. Emission serializes the frame
//! once, stamps it with the next hub sequence number and offers it to each
//! recipient with `try_send`; the hub never waits on an observer. A full
//! queue drops that frame for that observer only, and an observer that
//! keeps dropping is evicted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::domain::event::{Frame, ObserverEvent};
use crate::domain::room::{ObserverId, RoomKey};
use crate::infrastructure::config::hub::HubConfig;

/// Queue and eviction limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    pub queue_capacity: usize,
    pub max_consecutive_drops: u32,
}

impl From<&HubConfig> for HubSettings {
    fn from(config: &HubConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            max_consecutive_drops: config.max_consecutive_drops,
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self::from(&HubConfig::default())
    }
}

/// Receiving side of a registered observer.
pub struct ObserverChannel {
    pub id: ObserverId,
    /// Serialized frames, in hub order. Closed when the observer is evicted.
    pub frames: mpsc::Receiver<Arc<str>>,
}

/// Per-emission delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
    pub evicted: usize,
}

struct ObserverSlot {
    tx: mpsc::Sender<Arc<str>>,
    rooms: HashSet<RoomKey>,
    consecutive_drops: u32,
    dropped_total: u64,
}

#[derive(Default)]
struct HubState {
    observers: HashMap<ObserverId, ObserverSlot>,
    rooms: HashMap<RoomKey, HashSet<ObserverId>>,
    seq: u64,
}

impl HubState {
    fn remove_observer(&mut self, id: ObserverId) -> Option<ObserverSlot> {
        let slot = self.observers.remove(&id)?;
        for room in &slot.rooms {
            if let Some(members) = self.rooms.get_mut(room) {
                members.remove(&id);
                if members.is_empty() {
                    self.rooms.remove(room);
                }
            }
        }
        Some(slot)
    }
}

pub struct BroadcastHub {
    state: Mutex<HubState>,
    settings: HubSettings,
}

impl BroadcastHub {
    #[must_use]
    pub fn new(settings: HubSettings) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            settings,
        }
    }

    /// Register a new observer with an empty room set.
    pub fn register(&self) -> ObserverChannel {
        let id = ObserverId::new();
        let (tx, frames) = mpsc::channel(self.settings.queue_capacity.max(1));
        self.state.lock().observers.insert(
            id,
            ObserverSlot {
                tx,
                rooms: HashSet::new(),
                consecutive_drops: 0,
                dropped_total: 0,
            },
        );
        debug!(observer = %id, "Observer registered");
        ObserverChannel { id, frames }
    }

    /// Add `observer` to `room`. False if the observer is unknown.
    pub fn join(&self, observer: ObserverId, room: RoomKey) -> bool {
        let mut state = self.state.lock();
        let Some(slot) = state.observers.get_mut(&observer) else {
            return false;
        };
        slot.rooms.insert(room.clone());
        state.rooms.entry(room).or_default().insert(observer);
        true
    }

    /// Remove `observer` from `room`. False if it was not a member.
    pub fn leave(&self, observer: ObserverId, room: &RoomKey) -> bool {
        let mut state = self.state.lock();
        let Some(slot) = state.observers.get_mut(&observer) else {
            return false;
        };
        if !slot.rooms.remove(room) {
            return false;
        }
        if let Some(members) = state.rooms.get_mut(room) {
            members.remove(&observer);
            if members.is_empty() {
                state.rooms.remove(room);
            }
        }
        true
    }

    /// Drop the observer and every membership it held.
    pub fn disconnect(&self, observer: ObserverId) -> bool {
        let removed = self.state.lock().remove_observer(observer);
        if let Some(slot) = &removed {
            debug!(observer = %observer, dropped = slot.dropped_total, "Observer disconnected");
        }
        removed.is_some()
    }

    pub fn emit_to_room(&self, room: &RoomKey, event: ObserverEvent) -> Delivery {
        self.emit_to_rooms(std::slice::from_ref(room), event)
    }

    /// Emit once to the union of members of `rooms`.
    pub fn emit_to_rooms(&self, rooms: &[RoomKey], event: ObserverEvent) -> Delivery {
        let mut state = self.state.lock();
        let mut recipients: Vec<ObserverId> = Vec::new();
        let mut seen = HashSet::new();
        for room in rooms {
            if let Some(members) = state.rooms.get(room) {
                for id in members {
                    if seen.insert(*id) {
                        recipients.push(*id);
                    }
                }
            }
        }
        if recipients.is_empty() {
            return Delivery::default();
        }
        self.deliver(&mut state, &recipients, event)
    }

    /// Emit to every registered observer.
    pub fn broadcast_all(&self, event: ObserverEvent) -> Delivery {
        let mut state = self.state.lock();
        let recipients: Vec<ObserverId> = state.observers.keys().copied().collect();
        if recipients.is_empty() {
            return Delivery::default();
        }
        self.deliver(&mut state, &recipients, event)
    }

    fn deliver(&self, state: &mut HubState, recipients: &[ObserverId], event: ObserverEvent) -> Delivery {
        state.seq += 1;
        let name = event.name();
        let frame: Arc<str> = match serde_json::to_string(&Frame::stamp(event, state.seq)) {
            Ok(text) => text.into(),
            Err(err) => {
                error!(event = name, error = %err, "Could not serialize frame");
                return Delivery::default();
            }
        };

        let mut delivery = Delivery::default();
        let mut evict = Vec::new();
        for id in recipients {
            let Some(slot) = state.observers.get_mut(id) else {
                continue;
            };
            match slot.tx.try_send(Arc::clone(&frame)) {
                Ok(()) => {
                    slot.consecutive_drops = 0;
                    delivery.delivered += 1;
                }
                Err(TrySendError::Full(_)) => {
                    slot.consecutive_drops += 1;
                    slot.dropped_total += 1;
                    delivery.dropped += 1;
                    if slot.consecutive_drops >= self.settings.max_consecutive_drops {
                        warn!(observer = %id, drops = slot.consecutive_drops, "Evicting stalled observer");
                        evict.push(*id);
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    delivery.dropped += 1;
                    evict.push(*id);
                }
            }
        }

        for id in evict {
            if state.remove_observer(id).is_some() {
                delivery.evicted += 1;
            }
        }
        delivery
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.state.lock().rooms.len()
    }

    #[must_use]
    pub fn room_size(&self, room: &RoomKey) -> usize {
        self.state.lock().rooms.get(room).map_or(0, HashSet::len)
    }

    #[must_use]
    pub fn rooms_of(&self, observer: ObserverId) -> Vec<RoomKey> {
        let state = self.state.lock();
        let mut rooms: Vec<RoomKey> = state
            .observers
            .get(&observer)
            .map(|slot| slot.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(HubSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::connection::ConnectionState;
    use crate::domain::event::SystemStatus;

    fn status() -> ObserverEvent {
        ObserverEvent::SystemStatus(SystemStatus {
            transport: ConnectionState::Connected,
            detail: None,
        })
    }

    fn hub(capacity: usize, max_drops: u32) -> BroadcastHub {
        BroadcastHub::new(HubSettings {
            queue_capacity: capacity,
            max_consecutive_drops: max_drops,
        })
    }

    #[test]
    fn room_members_receive_once_even_across_rooms() {
        let hub = hub(8, 4);
        let mut a = hub.register();
        let mut b = hub.register();
        hub.join(a.id, RoomKey::building("hq"));
        hub.join(a.id, RoomKey::zone("f1"));
        hub.join(b.id, RoomKey::zone("f2"));

        let delivery = hub.emit_to_rooms(&[RoomKey::building("hq"), RoomKey::zone("f1")], status());
        assert_eq!(delivery.delivered, 1);
        assert!(a.frames.try_recv().is_ok());
        assert!(a.frames.try_recv().is_err());
        assert!(b.frames.try_recv().is_err());
    }

    #[test]
    fn frames_carry_increasing_sequence() {
        let hub = hub(8, 4);
        let mut a = hub.register();
        hub.broadcast_all(status());
        hub.broadcast_all(status());

        let first: serde_json::Value = serde_json::from_str(&a.frames.try_recv().unwrap()).unwrap();
        let second: serde_json::Value = serde_json::from_str(&a.frames.try_recv().unwrap()).unwrap();
        assert!(second["seq"].as_u64() > first["seq"].as_u64());
        assert_eq!(first["event"], "system:status");
    }

    #[test]
    fn leave_and_disconnect_clean_up_rooms() {
        let hub = hub(8, 4);
        let a = hub.register();
        let b = hub.register();
        let room = RoomKey::zone("f1");
        hub.join(a.id, room.clone());
        hub.join(b.id, room.clone());
        assert_eq!(hub.room_size(&room), 2);

        assert!(hub.leave(a.id, &room));
        assert!(!hub.leave(a.id, &room));
        assert_eq!(hub.room_size(&room), 1);

        assert!(hub.disconnect(b.id));
        assert_eq!(hub.room_count(), 0);
        assert_eq!(hub.observer_count(), 1);
    }

    #[test]
    fn stalled_observer_is_isolated_then_evicted() {
        let hub = hub(1, 3);
        let stalled = hub.register();
        let mut healthy = hub.register();
        let room = RoomKey::building("hq");
        hub.join(stalled.id, room.clone());
        hub.join(healthy.id, room.clone());

        for _ in 0..4 {
            let delivery = hub.emit_to_room(&room, status());
            assert!(delivery.delivered >= 1);
            assert!(healthy.frames.try_recv().is_ok());
        }

        assert_eq!(hub.observer_count(), 1);
        assert!(hub.rooms_of(stalled.id).is_empty());
    }

    #[test]
    fn join_unknown_observer_is_refused() {
        let hub = hub(8, 4);
        assert!(!hub.join(ObserverId::new(), RoomKey::zone("f1")));
        assert_eq!(hub.room_count(), 0);
    }
}
