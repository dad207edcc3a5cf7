use ember_events::HostAction;

use crate::block::{Behavior, Block};
use crate::context::ExecutionContext;
use crate::outcome::Outcome;
use crate::value::Value;

/// Variable operation, shared by the four `action.*_var` identifiers and
/// specialized at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarOp {
    Set,
    SetGlobal,
    Change,
    Delete,
}

pub struct VarBehavior {
    pub op: VarOp,
}

impl Behavior for VarBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(var) = block.str_param("var").map(str::to_owned) else {
            return Outcome::err("missing var parameter");
        };
        match self.op {
            VarOp::Set => {
                let value = value_param(block, ctx);
                ctx.set_var(var, value);
            }
            VarOp::SetGlobal => {
                let value = value_param(block, ctx);
                ctx.set_global(var, value);
            }
            VarOp::Change => {
                let delta = block.float_param("delta", ctx).unwrap_or(1.0);
                let current = ctx.var(&var).unwrap_or(Value::Int(0));
                let next = match current {
                    Value::Int(n) if delta.fract() == 0.0 => Value::Int(n + delta as i64),
                    other => match other.as_f64() {
                        Some(x) => Value::Float(x + delta),
                        None => return Outcome::err(format!("variable {} is not numeric", var)),
                    },
                };
                // a counter living in globals is updated in place, so it
                // survives to the next dispatch
                ctx.update_var(&var, next);
            }
            VarOp::Delete => {
                ctx.remove_var(&var);
                ctx.remove_global(&var);
            }
        }
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.str_param("var").is_none() {
            return Err("missing var parameter".into());
        }
        if matches!(self.op, VarOp::Set | VarOp::SetGlobal) && block.param("value").is_none() {
            return Err("missing value parameter".into());
        }
        Ok(())
    }
}

fn value_param(block: &Block, ctx: &ExecutionContext) -> Value {
    match block.param("value") {
        Some(Value::Str(s)) => Value::Str(crate::interpolate::interpolate(s, ctx)),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

/// Sends an interpolated message to the subject (target if set, actor
/// otherwise), or explicitly to the actor/target via the `to` parameter.
pub struct SendMessageBehavior;

impl Behavior for SendMessageBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(text) = block.text_param("text", ctx) else {
            return Outcome::err("missing text parameter");
        };
        let player = match block.str_param("to") {
            None => ctx.subject().id,
            Some("actor") => ctx.actor().id,
            Some("target") => match ctx.target() {
                Some(target) => target.id,
                None => return Outcome::err("no current target"),
            },
            Some(other) => return Outcome::err(format!("unknown recipient: {}", other)),
        };
        ctx.actions().send(HostAction::SendMessage { player, text });
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.param("text").is_none() {
            return Err("missing text parameter".into());
        }
        if let Some(to) = block.str_param("to") {
            if !matches!(to, "actor" | "target") {
                return Err(format!("unknown recipient: {}", to));
            }
        }
        Ok(())
    }
}

pub struct BroadcastBehavior;

impl Behavior for BroadcastBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(text) = block.text_param("text", ctx) else {
            return Outcome::err("missing text parameter");
        };
        ctx.actions().send(HostAction::Broadcast { text });
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.param("text").is_none() {
            return Err("missing text parameter".into());
        }
        Ok(())
    }
}

/// Sets or clears the current target for subsequent "act upon" blocks.
pub struct SetTargetBehavior;

impl Behavior for SetTargetBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        match block.str_param("who").unwrap_or("actor") {
            "actor" => {
                let actor = ctx.actor().clone();
                ctx.set_target(Some(actor));
            }
            "none" => ctx.set_target(None),
            other => return Outcome::err(format!("unknown target selector: {}", other)),
        }
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        match block.str_param("who") {
            None | Some("actor") | Some("none") => Ok(()),
            Some(other) => Err(format!("unknown target selector: {}", other)),
        }
    }
}

pub struct RunCommandBehavior;

impl Behavior for RunCommandBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(command) = block.text_param("command", ctx) else {
            return Outcome::err("missing command parameter");
        };
        let player = ctx.subject().id;
        ctx.actions().send(HostAction::RunCommand { player, command });
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.param("command").is_none() {
            return Err("missing command parameter".into());
        }
        Ok(())
    }
}

pub struct TeleportBehavior;

impl Behavior for TeleportBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(world) = block.text_param("world", ctx) else {
            return Outcome::err("missing world parameter");
        };
        let (Some(x), Some(y), Some(z)) = (
            block.float_param("x", ctx),
            block.float_param("y", ctx),
            block.float_param("z", ctx),
        ) else {
            return Outcome::err("missing coordinates");
        };
        let player = ctx.subject().id;
        ctx.actions().send(HostAction::Teleport {
            player,
            world,
            x,
            y,
            z,
        });
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        for key in ["world", "x", "y", "z"] {
            if block.param(key).is_none() {
                return Err(format!("missing {} parameter", key));
            }
        }
        Ok(())
    }
}

pub struct GiveItemBehavior;

impl Behavior for GiveItemBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(item) = block.text_param("item", ctx) else {
            return Outcome::err("missing item parameter");
        };
        let quantity = block.int_param("quantity", ctx).unwrap_or(1);
        if quantity < 1 {
            return Outcome::err("quantity must be positive");
        }
        let player = ctx.subject().id;
        ctx.actions().send(HostAction::GiveItem {
            player,
            item,
            quantity,
        });
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.param("item").is_none() {
            return Err("missing item parameter".into());
        }
        Ok(())
    }
}

pub struct PlaySoundBehavior;

impl Behavior for PlaySoundBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(sound) = block.text_param("sound", ctx) else {
            return Outcome::err("missing sound parameter");
        };
        let player = ctx.subject().id;
        ctx.actions().send(HostAction::PlaySound { player, sound });
        Outcome::ok()
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.param("sound").is_none() {
            return Err("missing sound parameter".into());
        }
        Ok(())
    }
}

/// Asks the host to cancel the occurrence that started this chain.
pub struct CancelEventBehavior;

impl Behavior for CancelEventBehavior {
    fn execute(&self, _block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let seq = ctx.occurrence_seq();
        ctx.actions().send(HostAction::CancelOccurrence { seq });
        Outcome::ok()
    }
}
