use serde::{Deserialize, Serialize};

/// Coarse grouping of block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Event,
    Condition,
    Action,
    Control,
    Function,
    Utility,
}

/// One row of the block catalog: a stable identifier and its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockType {
    pub id: &'static str,
    pub category: Category,
}

const fn row(id: &'static str, category: Category) -> BlockType {
    BlockType { id, category }
}

/// Every supported block identifier, fixed at startup.
///
/// Many identifiers route to one implementing behavior: all `event.*` rows
/// share the event behavior specialized by occurrence kind, the five
/// comparison conditions share one behavior specialized by operator, and
/// the variable actions share one behavior specialized by operation.
pub static CATALOG: &[BlockType] = &[
    // Events
    row("event.join", Category::Event),
    row("event.quit", Category::Event),
    row("event.chat", Category::Event),
    row("event.move", Category::Event),
    row("event.interact", Category::Event),
    row("event.damage", Category::Event),
    row("event.death", Category::Event),
    row("event.respawn", Category::Event),
    row("event.drop", Category::Event),
    row("event.pickup", Category::Event),
    row("event.inventory_click", Category::Event),
    row("event.command", Category::Event),
    row("event.teleport", Category::Event),
    row("event.world_change", Category::Event),
    row("event.sneak", Category::Event),
    row("event.block_break", Category::Event),
    row("event.block_place", Category::Event),
    row("event.entity_spawn", Category::Event),
    row("event.entity_death", Category::Event),
    row("event.entity_damage", Category::Event),
    row("event.entity_target", Category::Event),
    row("event.entity_explode", Category::Event),
    // Conditions
    row("cond.equals", Category::Condition),
    row("cond.not_equals", Category::Condition),
    row("cond.greater", Category::Condition),
    row("cond.less", Category::Condition),
    row("cond.contains", Category::Condition),
    row("cond.chance", Category::Condition),
    row("cond.in_world", Category::Condition),
    row("cond.has_target", Category::Condition),
    // Actions
    row("action.send_message", Category::Action),
    row("action.broadcast", Category::Action),
    row("action.set_var", Category::Action),
    row("action.set_global", Category::Action),
    row("action.change_var", Category::Action),
    row("action.delete_var", Category::Action),
    row("action.set_target", Category::Action),
    row("action.run_command", Category::Action),
    row("action.teleport", Category::Action),
    row("action.give_item", Category::Action),
    row("action.play_sound", Category::Action),
    row("action.cancel_event", Category::Action),
    // Control
    row("control.repeat", Category::Control),
    row("control.wait", Category::Control),
    row("control.stop", Category::Control),
    row("control.break", Category::Control),
    row("control.continue", Category::Control),
    // Functions
    row("func.define", Category::Function),
    row("func.call", Category::Function),
    // Utility
    row("util.comment", Category::Utility),
    row("util.log", Category::Utility),
];

/// Look up a catalog row by identifier.
pub fn lookup(id: &str) -> Option<&'static BlockType> {
    CATALOG.iter().find(|bt| bt.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identifiers_are_unique() {
        let ids: HashSet<_> = CATALOG.iter().map(|bt| bt.id).collect();
        assert_eq!(ids.len(), CATALOG.len());
    }

    #[test]
    fn test_every_occurrence_kind_has_an_event_row() {
        use strum::IntoEnumIterator;
        for kind in ember_events::OccurrenceKind::iter() {
            let id = format!("event.{}", kind);
            assert!(
                lookup(&id).is_some(),
                "missing catalog row for occurrence kind {}",
                kind
            );
        }
    }

    #[test]
    fn test_lookup_unknown_is_none() {
        assert!(lookup("event.apocalypse").is_none());
    }
}
