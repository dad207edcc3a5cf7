use ember_events::{Occurrence, OccurrenceKind};

use crate::block::{run_sequence, Behavior, Block};
use crate::context::ExecutionContext;
use crate::outcome::Outcome;
use crate::value::Value;

/// The single event behavior every `event.*` identifier shares, specialized
/// by occurrence kind at construction.
///
/// Executing an event block runs its children as the chain body; matching
/// checks the kind and then any configured predicate parameters.
pub struct EventBehavior {
    pub kind: OccurrenceKind,
}

impl Behavior for EventBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        run_sequence(block.children(), ctx)
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        for key in ["message_contains", "command_equals"] {
            if let Some(v) = block.param(key) {
                if !matches!(v, Value::Str(_)) {
                    return Err(format!("parameter {} must be a string", key));
                }
            }
        }
        Ok(())
    }

    fn matches(&self, block: &Block, occurrence: &Occurrence) -> bool {
        if occurrence.kind() != self.kind {
            return false;
        }
        match occurrence {
            Occurrence::Chat { message, .. } => match block.str_param("message_contains") {
                Some(needle) => message.contains(needle),
                None => true,
            },
            Occurrence::Command { command, .. } => match block.str_param("command_equals") {
                Some(expected) => {
                    command.trim_start_matches('/') == expected.trim_start_matches('/')
                }
                None => true,
            },
            _ => true,
        }
    }

    fn event_kind(&self) -> Option<OccurrenceKind> {
        Some(self.kind)
    }
}
