use std::collections::HashMap;
use std::time::Duration;

use ember_events::OccurrenceKind;

/// Per-occurrence-class counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub invocations: u64,
    pub total_time: Duration,
}

/// Dispatch counters, updated on the primary thread only.
#[derive(Debug, Default)]
pub struct DispatchStats {
    per_kind: HashMap<OccurrenceKind, KindStats>,
    dropped: u64,
}

impl DispatchStats {
    pub fn record(&mut self, kind: OccurrenceKind, elapsed: Duration) {
        let entry = self.per_kind.entry(kind).or_default();
        entry.invocations += 1;
        entry.total_time += elapsed;
    }

    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    /// Read-only snapshot keyed by occurrence-class name.
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            by_kind: self
                .per_kind
                .iter()
                .map(|(kind, stats)| (kind.to_string(), *stats))
                .collect(),
            dropped: self.dropped,
        }
    }
}

/// Point-in-time copy of the dispatch counters.
#[derive(Debug, Clone, Default)]
pub struct DispatchSnapshot {
    pub by_kind: HashMap<String, KindStats>,
    pub dropped: u64,
}

impl DispatchSnapshot {
    pub fn invocations(&self, kind_name: &str) -> u64 {
        self.by_kind
            .get(kind_name)
            .map(|s| s.invocations)
            .unwrap_or(0)
    }
}
