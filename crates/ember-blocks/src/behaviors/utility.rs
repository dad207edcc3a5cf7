use crate::block::{Behavior, Block};
use crate::context::ExecutionContext;
use crate::outcome::Outcome;

/// Annotation node; executes as a no-op.
pub struct CommentBehavior;

impl Behavior for CommentBehavior {
    fn execute(&self, _block: &Block, _ctx: &mut ExecutionContext) -> Outcome {
        Outcome::ok()
    }
}

/// Writes an interpolated message to the server log, attributed to the
/// owning player.
pub struct LogBehavior;

impl Behavior for LogBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(message) = block.text_param("message", ctx) else {
            return Outcome::err("missing message parameter");
        };
        tracing::info!(target: "script", owner = %ctx.owner(), "{}", message);
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.param("message").is_none() {
            return Err("missing message parameter".into());
        }
        Ok(())
    }
}
