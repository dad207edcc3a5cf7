use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use ember_events::OccurrenceKind;
use thiserror::Error;

use crate::behaviors::actions::{
    BroadcastBehavior, CancelEventBehavior, GiveItemBehavior, PlaySoundBehavior,
    RunCommandBehavior, SendMessageBehavior, SetTargetBehavior, TeleportBehavior, VarBehavior,
    VarOp,
};
use crate::behaviors::conditions::{
    ChanceBehavior, CompareBehavior, HasTargetBehavior, InWorldBehavior,
};
use crate::behaviors::control::{
    BreakBehavior, ContinueBehavior, RepeatBehavior, StopBehavior, WaitBehavior,
};
use crate::behaviors::events::EventBehavior;
use crate::behaviors::functions::{CallBehavior, DefineBehavior};
use crate::behaviors::utility::{CommentBehavior, LogBehavior};
use crate::block::{Behavior, Block, BlockData};
use crate::catalog::{BlockType, Category, CATALOG};
use crate::value::Comparator;

/// Factory failure: signaled as absence of a capability, never a panic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactoryError {
    #[error("unsupported block kind: {kind}")]
    Unsupported { kind: String },
}

/// Identifier -> constructor table, built once at startup.
///
/// Adding a block kind means adding a catalog row and a registration here;
/// no dispatch logic changes. Behaviors are stateless, so the table stores
/// one shared instance per identifier and every created block clones the
/// handle.
pub struct BlockFactory {
    table: HashMap<&'static str, (&'static BlockType, Arc<dyn Behavior>)>,
}

impl BlockFactory {
    pub fn new() -> Self {
        let mut table: HashMap<&'static str, (&'static BlockType, Arc<dyn Behavior>)> =
            HashMap::with_capacity(CATALOG.len());

        for bt in CATALOG {
            if let Some(behavior) = Self::behavior_for(bt) {
                table.insert(bt.id, (bt, behavior));
            } else {
                // a catalog row the registration table cannot express stays
                // unsupported rather than half-registered
                tracing::warn!(target: "scripting", kind = bt.id, "catalog row has no registered behavior");
            }
        }

        Self { table }
    }

    fn behavior_for(bt: &'static BlockType) -> Option<Arc<dyn Behavior>> {
        match bt.category {
            Category::Event => {
                let suffix = bt.id.strip_prefix("event.")?;
                let kind = OccurrenceKind::from_str(suffix).ok()?;
                Some(Arc::new(EventBehavior { kind }))
            }
            Category::Condition => match bt.id {
                "cond.chance" => Some(Arc::new(ChanceBehavior)),
                "cond.in_world" => Some(Arc::new(InWorldBehavior)),
                "cond.has_target" => Some(Arc::new(HasTargetBehavior)),
                _ => {
                    let suffix = bt.id.strip_prefix("cond.")?;
                    let op = Comparator::from_str(suffix).ok()?;
                    Some(Arc::new(CompareBehavior { op }))
                }
            },
            Category::Action => match bt.id {
                "action.send_message" => Some(Arc::new(SendMessageBehavior)),
                "action.broadcast" => Some(Arc::new(BroadcastBehavior)),
                "action.set_var" => Some(Arc::new(VarBehavior { op: VarOp::Set })),
                "action.set_global" => Some(Arc::new(VarBehavior { op: VarOp::SetGlobal })),
                "action.change_var" => Some(Arc::new(VarBehavior { op: VarOp::Change })),
                "action.delete_var" => Some(Arc::new(VarBehavior { op: VarOp::Delete })),
                "action.set_target" => Some(Arc::new(SetTargetBehavior)),
                "action.run_command" => Some(Arc::new(RunCommandBehavior)),
                "action.teleport" => Some(Arc::new(TeleportBehavior)),
                "action.give_item" => Some(Arc::new(GiveItemBehavior)),
                "action.play_sound" => Some(Arc::new(PlaySoundBehavior)),
                "action.cancel_event" => Some(Arc::new(CancelEventBehavior)),
                _ => None,
            },
            Category::Control => match bt.id {
                "control.repeat" => Some(Arc::new(RepeatBehavior)),
                "control.wait" => Some(Arc::new(WaitBehavior)),
                "control.stop" => Some(Arc::new(StopBehavior)),
                "control.break" => Some(Arc::new(BreakBehavior)),
                "control.continue" => Some(Arc::new(ContinueBehavior)),
                _ => None,
            },
            Category::Function => match bt.id {
                "func.define" => Some(Arc::new(DefineBehavior)),
                "func.call" => Some(Arc::new(CallBehavior)),
                _ => None,
            },
            Category::Utility => match bt.id {
                "util.comment" => Some(Arc::new(CommentBehavior)),
                "util.log" => Some(Arc::new(LogBehavior)),
                _ => None,
            },
        }
    }

    /// Construct a bare block of the given kind.
    pub fn create(&self, kind: &str) -> Result<Block, FactoryError> {
        let (bt, behavior) = self.table.get(kind).ok_or_else(|| FactoryError::Unsupported {
            kind: kind.to_string(),
        })?;
        Ok(Block::new(bt.id, bt.category, Arc::clone(behavior)))
    }

    /// Rebuild a block tree from its transport form.
    pub fn from_data(&self, data: &BlockData) -> Result<Block, FactoryError> {
        let mut block = self.create(&data.kind)?;
        for (key, value) in &data.params {
            block.set_parameter(key.clone(), value.clone());
        }
        for child in &data.children {
            block.add_child(self.from_data(child)?);
        }
        Ok(block)
    }
}

impl Default for BlockFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_catalog_identifier_constructs() {
        let factory = BlockFactory::new();
        for bt in CATALOG {
            let block = factory
                .create(bt.id)
                .unwrap_or_else(|e| panic!("{}: {}", bt.id, e));
            assert_eq!(block.kind(), bt.id);
            assert_eq!(block.category(), bt.category);
        }
    }

    #[test]
    fn test_unknown_identifier_is_unsupported() {
        let factory = BlockFactory::new();
        let err = factory.create("action.summon_dragon").unwrap_err();
        assert_eq!(
            err,
            FactoryError::Unsupported {
                kind: "action.summon_dragon".to_string()
            }
        );
    }

    #[test]
    fn test_from_data_rejects_unknown_child() {
        let factory = BlockFactory::new();
        let mut data = BlockData::new("event.join");
        data.children.push(BlockData::new("action.nope"));
        assert!(factory.from_data(&data).is_err());
    }
}
