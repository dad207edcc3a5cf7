use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{ActorRef, EntityRef};

/// Every occurrence class the engine can react to.
///
/// The set is fixed at startup; the dispatcher enumerates it once to build
/// its index buckets and diagnostics keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum OccurrenceKind {
    Join,
    Quit,
    Chat,
    Move,
    Interact,
    Damage,
    Death,
    Respawn,
    Drop,
    Pickup,
    InventoryClick,
    Command,
    Teleport,
    WorldChange,
    Sneak,
    BlockBreak,
    BlockPlace,
    EntitySpawn,
    EntityDeath,
    EntityDamage,
    EntityTarget,
    EntityExplode,
}

/// An in-game occurrence delivered by the host server.
///
/// Each variant carries the participants and the occurrence-specific fields
/// the block layer reads. The engine never mutates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Occurrence {
    Join {
        player: ActorRef,
    },
    Quit {
        player: ActorRef,
    },
    Chat {
        player: ActorRef,
        message: String,
    },
    Move {
        player: ActorRef,
        world: String,
        x: f64,
        y: f64,
        z: f64,
    },
    Interact {
        player: ActorRef,
        object: String,
    },
    Damage {
        victim: ActorRef,
        damager: Option<ActorRef>,
        amount: f64,
    },
    Death {
        player: ActorRef,
        cause: String,
    },
    Respawn {
        player: ActorRef,
    },
    Drop {
        player: ActorRef,
        item: String,
        quantity: u32,
    },
    Pickup {
        player: ActorRef,
        item: String,
        quantity: u32,
    },
    InventoryClick {
        player: ActorRef,
        slot: u32,
        item: String,
    },
    Command {
        player: ActorRef,
        command: String,
    },
    Teleport {
        player: ActorRef,
        world: String,
    },
    WorldChange {
        player: ActorRef,
        from_world: String,
        to_world: String,
    },
    Sneak {
        player: ActorRef,
        sneaking: bool,
    },
    BlockBreak {
        player: ActorRef,
        world: String,
        block: String,
    },
    BlockPlace {
        player: ActorRef,
        world: String,
        block: String,
    },
    EntitySpawn {
        entity: EntityRef,
        world: String,
    },
    EntityDeath {
        entity: EntityRef,
        killer: Option<ActorRef>,
    },
    EntityDamage {
        entity: EntityRef,
        damager: Option<ActorRef>,
        amount: f64,
    },
    EntityTarget {
        entity: EntityRef,
        target: Option<ActorRef>,
    },
    EntityExplode {
        entity: EntityRef,
        world: String,
    },
}

impl Occurrence {
    /// The class this occurrence is indexed under.
    pub fn kind(&self) -> OccurrenceKind {
        match self {
            Occurrence::Join { .. } => OccurrenceKind::Join,
            Occurrence::Quit { .. } => OccurrenceKind::Quit,
            Occurrence::Chat { .. } => OccurrenceKind::Chat,
            Occurrence::Move { .. } => OccurrenceKind::Move,
            Occurrence::Interact { .. } => OccurrenceKind::Interact,
            Occurrence::Damage { .. } => OccurrenceKind::Damage,
            Occurrence::Death { .. } => OccurrenceKind::Death,
            Occurrence::Respawn { .. } => OccurrenceKind::Respawn,
            Occurrence::Drop { .. } => OccurrenceKind::Drop,
            Occurrence::Pickup { .. } => OccurrenceKind::Pickup,
            Occurrence::InventoryClick { .. } => OccurrenceKind::InventoryClick,
            Occurrence::Command { .. } => OccurrenceKind::Command,
            Occurrence::Teleport { .. } => OccurrenceKind::Teleport,
            Occurrence::WorldChange { .. } => OccurrenceKind::WorldChange,
            Occurrence::Sneak { .. } => OccurrenceKind::Sneak,
            Occurrence::BlockBreak { .. } => OccurrenceKind::BlockBreak,
            Occurrence::BlockPlace { .. } => OccurrenceKind::BlockPlace,
            Occurrence::EntitySpawn { .. } => OccurrenceKind::EntitySpawn,
            Occurrence::EntityDeath { .. } => OccurrenceKind::EntityDeath,
            Occurrence::EntityDamage { .. } => OccurrenceKind::EntityDamage,
            Occurrence::EntityTarget { .. } => OccurrenceKind::EntityTarget,
            Occurrence::EntityExplode { .. } => OccurrenceKind::EntityExplode,
        }
    }

    /// Resolve the player participant whose scripts should react.
    ///
    /// Role selection matters: a damage occurrence fires the victim's
    /// scripts, an entity death fires the killer's, an entity damage the
    /// damager's. Occurrences without a player participant return `None`
    /// and are offered to every registered owner.
    pub fn actor(&self) -> Option<&ActorRef> {
        match self {
            Occurrence::Join { player }
            | Occurrence::Quit { player }
            | Occurrence::Chat { player, .. }
            | Occurrence::Move { player, .. }
            | Occurrence::Interact { player, .. }
            | Occurrence::Death { player, .. }
            | Occurrence::Respawn { player }
            | Occurrence::Drop { player, .. }
            | Occurrence::Pickup { player, .. }
            | Occurrence::InventoryClick { player, .. }
            | Occurrence::Command { player, .. }
            | Occurrence::Teleport { player, .. }
            | Occurrence::WorldChange { player, .. }
            | Occurrence::Sneak { player, .. }
            | Occurrence::BlockBreak { player, .. }
            | Occurrence::BlockPlace { player, .. } => Some(player),
            Occurrence::Damage { victim, .. } => Some(victim),
            Occurrence::EntityDeath { killer, .. } => killer.as_ref(),
            Occurrence::EntityDamage { damager, .. } => damager.as_ref(),
            Occurrence::EntityTarget { target, .. } => target.as_ref(),
            Occurrence::EntitySpawn { .. } | Occurrence::EntityExplode { .. } => None,
        }
    }

    /// The world this occurrence happened in, when it carries one.
    ///
    /// Occurrences without a world field pass the world-binding check.
    pub fn world(&self) -> Option<&str> {
        match self {
            Occurrence::Move { world, .. }
            | Occurrence::Teleport { world, .. }
            | Occurrence::BlockBreak { world, .. }
            | Occurrence::BlockPlace { world, .. }
            | Occurrence::EntitySpawn { world, .. }
            | Occurrence::EntityExplode { world, .. } => Some(world),
            Occurrence::WorldChange { to_world, .. } => Some(to_world),
            _ => None,
        }
    }
}

/// Where the occurrence entered the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceSource {
    /// Delivered on the primary simulation thread
    Primary,
    /// Delivered off-thread and re-posted through the remote channel
    Remote,
}

/// An occurrence plus the dispatch metadata the engine attaches.
#[derive(Debug, Clone)]
pub struct OccurrenceEnvelope {
    pub occurrence: Occurrence,
    /// Sequence number assigned at dispatch, referenced by cancel actions
    pub seq: u64,
    pub source: OccurrenceSource,
}

impl OccurrenceEnvelope {
    pub fn new(occurrence: Occurrence, seq: u64, source: OccurrenceSource) -> Self {
        Self {
            occurrence,
            seq,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlayerId;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_names_are_snake_case() {
        assert_eq!(OccurrenceKind::InventoryClick.to_string(), "inventory_click");
        assert_eq!(OccurrenceKind::EntityExplode.to_string(), "entity_explode");
    }

    #[test]
    fn test_kind_set_is_fixed() {
        assert_eq!(OccurrenceKind::iter().count(), 22);
    }

    #[test]
    fn test_damage_actor_is_victim() {
        let occ = Occurrence::Damage {
            victim: ActorRef::new(PlayerId(1), "Ann"),
            damager: Some(ActorRef::new(PlayerId(2), "Bob")),
            amount: 4.0,
        };
        assert_eq!(occ.actor().unwrap().name, "Ann");
        assert_eq!(occ.kind(), OccurrenceKind::Damage);
    }

    #[test]
    fn test_entity_spawn_has_no_actor() {
        let occ = Occurrence::EntitySpawn {
            entity: EntityRef::new(crate::EntityId(7), "zombie"),
            world: "arena".into(),
        };
        assert!(occ.actor().is_none());
        assert_eq!(occ.world(), Some("arena"));
    }
}
