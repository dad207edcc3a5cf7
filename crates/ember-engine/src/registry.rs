use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ember_events::PlayerId;

use crate::script::Script;

/// Player -> active script map.
///
/// Reads vastly outnumber writes, so the map is held copy-on-write: readers
/// clone an `Arc` snapshot and never hold the lock across dispatch; every
/// mutation rebuilds the map.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: RwLock<Arc<HashMap<PlayerId, Arc<Script>>>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; cheap to take, stable for the caller's lifetime.
    pub fn snapshot(&self) -> Arc<HashMap<PlayerId, Arc<Script>>> {
        Arc::clone(&self.scripts.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Install the player's script, replacing any previous one.
    pub fn insert(&self, script: Script) {
        let mut guard = self.scripts.write().unwrap_or_else(|e| e.into_inner());
        let mut next = (**guard).clone();
        next.insert(script.owner(), Arc::new(script));
        *guard = Arc::new(next);
    }

    pub fn remove(&self, player: PlayerId) -> Option<Arc<Script>> {
        let mut guard = self.scripts.write().unwrap_or_else(|e| e.into_inner());
        let mut next = (**guard).clone();
        let removed = next.remove(&player);
        *guard = Arc::new(next);
        removed
    }

    pub fn get(&self, player: PlayerId) -> Option<Arc<Script>> {
        self.snapshot().get(&player).cloned()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.snapshot().contains_key(&player)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Clone-on-write update of one player's script. Returns false when the
    /// player has no script.
    pub fn update<F>(&self, player: PlayerId, mutate: F) -> bool
    where
        F: FnOnce(&mut Script),
    {
        let mut guard = self.scripts.write().unwrap_or_else(|e| e.into_inner());
        let Some(existing) = guard.get(&player) else {
            return false;
        };
        let mut script = (**existing).clone();
        mutate(&mut script);
        let mut next = (**guard).clone();
        next.insert(player, Arc::new(script));
        *guard = Arc::new(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_stable_across_writes() {
        let registry = ScriptRegistry::new();
        registry.insert(Script::new(PlayerId(1), "Ann"));
        let before = registry.snapshot();
        registry.insert(Script::new(PlayerId(2), "Bob"));
        assert_eq!(before.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_insert_replaces() {
        let registry = ScriptRegistry::new();
        registry.insert(Script::new(PlayerId(1), "Ann"));
        registry.insert(Script::new(PlayerId(1), "Ann"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_flips_enabled() {
        let registry = ScriptRegistry::new();
        registry.insert(Script::new(PlayerId(1), "Ann"));
        assert!(registry.update(PlayerId(1), |s| s.set_enabled(false)));
        assert!(!registry.get(PlayerId(1)).unwrap().enabled());
        assert!(!registry.update(PlayerId(9), |s| s.set_enabled(false)));
    }
}
