use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ember_events::{OccurrenceKind, PlayerId};

use crate::script::Script;

/// Where a registered event handler lives inside its owner's script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerEntry {
    pub owner: PlayerId,
    pub line: usize,
    pub root: usize,
}

/// Occurrence-class -> handler list, the dispatcher's hot path.
///
/// Held copy-on-write like the registry: dispatch reads a snapshot, and the
/// whole index is rebuilt on register/unregister/enable/disable, which is
/// cheap relative to dispatch frequency. An empty bucket makes an
/// occurrence an O(1) no-op.
#[derive(Debug, Default)]
pub struct EventIndex {
    buckets: RwLock<Arc<HashMap<OccurrenceKind, Vec<HandlerEntry>>>>,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<HashMap<OccurrenceKind, Vec<HandlerEntry>>> {
        Arc::clone(&self.buckets.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Rebuild from a registry snapshot. Owners are walked in sorted order
    /// so handler order is deterministic; within one owner, line then root
    /// order is registration order.
    pub fn rebuild(&self, scripts: &HashMap<PlayerId, Arc<Script>>) {
        let mut next: HashMap<OccurrenceKind, Vec<HandlerEntry>> = HashMap::new();

        let mut owners: Vec<_> = scripts.keys().copied().collect();
        owners.sort();

        for owner in owners {
            let script = &scripts[&owner];
            if !script.enabled() {
                continue;
            }
            for (line, root, block) in script.event_roots() {
                if let Some(kind) = block.event_kind() {
                    next.entry(kind)
                        .or_default()
                        .push(HandlerEntry { owner, line, root });
                }
            }
        }

        *self.buckets.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
    }

    pub fn entry_count(&self) -> usize {
        self.snapshot().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Line;
    use ember_blocks::BlockFactory;

    fn script_with_events(owner: u64, kinds: &[&str]) -> Script {
        let factory = BlockFactory::new();
        let mut line = Line::new();
        for kind in kinds {
            line.add_root(factory.create(kind).unwrap());
        }
        let mut script = Script::new(PlayerId(owner), format!("p{}", owner)).with_line(line);
        script.prepare();
        script
    }

    fn registry_map(scripts: Vec<Script>) -> HashMap<PlayerId, Arc<Script>> {
        scripts
            .into_iter()
            .map(|s| (s.owner(), Arc::new(s)))
            .collect()
    }

    #[test]
    fn test_rebuild_indexes_by_kind() {
        let index = EventIndex::new();
        let scripts = registry_map(vec![
            script_with_events(1, &["event.join", "event.chat"]),
            script_with_events(2, &["event.chat"]),
        ]);
        index.rebuild(&scripts);

        let snapshot = index.snapshot();
        assert_eq!(snapshot.get(&OccurrenceKind::Join).unwrap().len(), 1);
        let chat = snapshot.get(&OccurrenceKind::Chat).unwrap();
        assert_eq!(chat.len(), 2);
        // owners sorted for deterministic order
        assert_eq!(chat[0].owner, PlayerId(1));
        assert_eq!(chat[1].owner, PlayerId(2));
        assert!(snapshot.get(&OccurrenceKind::Death).is_none());
    }

    #[test]
    fn test_disabled_script_contributes_nothing() {
        let index = EventIndex::new();
        let mut script = script_with_events(1, &["event.join"]);
        script.set_enabled(false);
        index.rebuild(&registry_map(vec![script]));
        assert_eq!(index.entry_count(), 0);
    }
}
