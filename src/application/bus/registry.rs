//! Subscription table.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::handler::MessageHandler;
use crate::domain::topic::TopicPattern;

pub type SubscriptionId = u64;

struct Entry {
    id: SubscriptionId,
    pattern: TopicPattern,
    handler: Arc<dyn MessageHandler>,
}

/// Pattern → handler table. Several handlers may share a pattern; the
/// broker subscription lives as long as any of them.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler. The flag is true when the pattern is new to the table.
    pub fn insert(
        &self,
        pattern: TopicPattern,
        handler: Arc<dyn MessageHandler>,
    ) -> (SubscriptionId, bool) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write();
        let first = !entries.iter().any(|e| e.pattern == pattern);
        entries.push(Entry {
            id,
            pattern,
            handler,
        });
        (id, first)
    }

    /// Remove one handler. Returns its pattern and whether it was the last
    /// handler for that pattern.
    pub fn remove(&self, id: SubscriptionId) -> Option<(TopicPattern, bool)> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|e| e.id == id)?;
        let entry = entries.swap_remove(index);
        let last = !entries.iter().any(|e| e.pattern == entry.pattern);
        Some((entry.pattern, last))
    }

    /// Remove every handler for `pattern`. Returns how many were removed.
    pub fn remove_pattern(&self, pattern: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.pattern.as_str() != pattern);
        before - entries.len()
    }

    /// Distinct registered patterns, in registration order.
    #[must_use]
    pub fn patterns(&self) -> Vec<TopicPattern> {
        let entries = self.entries.read();
        let mut patterns: Vec<TopicPattern> = Vec::new();
        for entry in entries.iter() {
            if !patterns.contains(&entry.pattern) {
                patterns.push(entry.pattern.clone());
            }
        }
        patterns
    }

    /// Handlers whose pattern matches `topic`. The lock is released on return.
    #[must_use]
    pub fn matching(&self, topic: &str) -> Vec<Arc<dyn MessageHandler>> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.pattern.matches(topic))
            .map(|e| Arc::clone(&e.handler))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::InboundMessage;
    use crate::error::Result;

    fn noop() -> Arc<dyn MessageHandler> {
        Arc::new(|_: &str, _: &InboundMessage| -> Result<()> { Ok(()) })
    }

    fn pattern(p: &str) -> TopicPattern {
        TopicPattern::parse(p).unwrap()
    }

    #[test]
    fn first_and_last_flags_track_pattern_sharing() {
        let registry = SubscriptionRegistry::new();
        let (a, first_a) = registry.insert(pattern("sensors/+/+"), noop());
        let (b, first_b) = registry.insert(pattern("sensors/+/+"), noop());
        assert!(first_a);
        assert!(!first_b);

        assert_eq!(registry.remove(a), Some((pattern("sensors/+/+"), false)));
        assert_eq!(registry.remove(b), Some((pattern("sensors/+/+"), true)));
        assert!(registry.remove(b).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn matching_filters_by_pattern() {
        let registry = SubscriptionRegistry::new();
        registry.insert(pattern("sensors/#"), noop());
        registry.insert(pattern("hvac/+/status"), noop());
        registry.insert(pattern("sensors/t-1/temperature"), noop());

        assert_eq!(registry.matching("sensors/t-1/temperature").len(), 2);
        assert_eq!(registry.matching("hvac/ahu-1/status").len(), 1);
        assert!(registry.matching("alerts/1").is_empty());
    }

    #[test]
    fn remove_pattern_drops_all_handlers() {
        let registry = SubscriptionRegistry::new();
        registry.insert(pattern("alerts/+"), noop());
        registry.insert(pattern("alerts/+"), noop());
        registry.insert(pattern("hvac/+/status"), noop());

        assert_eq!(registry.remove_pattern("alerts/+"), 2);
        assert_eq!(registry.patterns(), vec![pattern("hvac/+/status")]);
    }
}
