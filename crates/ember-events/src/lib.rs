/// Core occurrence types for the emberscript engine
///
/// This crate provides the foundational types the dispatch and block layers
/// build on, so that neither depends on the other for event definitions.
use serde::{Deserialize, Serialize};

pub mod actions;
pub mod occurrence;

pub use actions::{HostAction, HostActionSender};
pub use occurrence::{Occurrence, OccurrenceEnvelope, OccurrenceKind, OccurrenceSource};

/// Identity of a connected player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player:{}", self.0)
    }
}

/// Identity of a non-player entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// A player participant in an occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: PlayerId,
    pub name: String,
}

impl ActorRef {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A non-player participant in an occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
    pub kind: String,
}

impl EntityRef {
    pub fn new(id: EntityId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
        }
    }
}
