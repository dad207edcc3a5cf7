use crate::block::{run_sequence, Behavior, Block};
use crate::context::ExecutionContext;
use crate::outcome::Outcome;
use crate::suspend::Frame;

/// A function definition. Registration collects these into the script's
/// function table; executed in sequence the block is inert.
pub struct DefineBehavior;

impl Behavior for DefineBehavior {
    fn execute(&self, _block: &Block, _ctx: &mut ExecutionContext) -> Outcome {
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.str_param("name").is_none() {
            return Err("missing name parameter".into());
        }
        Ok(())
    }
}

/// Calls a function from the script's table with an isolated variable
/// scope: the body sees a copy of the caller's bindings and its mutations
/// are discarded on return. `Return` is caught here and becomes the call's
/// `Success` value.
pub struct CallBehavior;

impl Behavior for CallBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(name) = block.text_param("name", ctx) else {
            return Outcome::err("missing name parameter");
        };
        let functions = ctx.functions();
        let Some(definition) = functions.get(&name) else {
            return Outcome::err(format!("unknown function: {}", name));
        };

        let saved = ctx.snapshot_vars();
        let outcome = run_sequence(definition.children(), ctx);
        match outcome {
            Outcome::Deferred => {
                ctx.push_frame(Frame::Call { saved_vars: saved });
                Outcome::Deferred
            }
            Outcome::Return(value) => {
                ctx.restore_vars(saved);
                Outcome::Success(value)
            }
            other => {
                ctx.restore_vars(saved);
                other
            }
        }
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.str_param("name").is_none() {
            return Err("missing name parameter".into());
        }
        Ok(())
    }
}
