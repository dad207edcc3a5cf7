use std::str::FromStr;

use crate::block::{Behavior, Block};
use crate::context::ExecutionContext;
use crate::outcome::Outcome;
use crate::suspend::{Frame, LoopCond, LoopState, RepeatKind};
use crate::value::{Comparator, Value};

/// The bounded async loop.
///
/// Executing the block never runs the body synchronously: it pushes a loop
/// frame and returns `Deferred`; the engine schedules step 0 after the
/// configured delay and every further iteration yields the same way.
pub struct RepeatBehavior;

impl RepeatBehavior {
    fn build_kind(block: &Block, ctx: &mut ExecutionContext) -> Result<RepeatKind, String> {
        match block.str_param("mode").unwrap_or("times") {
            "times" => {
                let total = block
                    .int_param("times", ctx)
                    .ok_or("missing or non-numeric times parameter")?;
                if total < 0 {
                    return Err("times must not be negative".into());
                }
                Ok(RepeatKind::Times {
                    total: total as u32,
                })
            }
            mode @ ("while" | "until") => {
                let cond = loop_cond(block)?;
                if mode == "while" {
                    Ok(RepeatKind::While(cond))
                } else {
                    Ok(RepeatKind::Until(cond))
                }
            }
            "for_each" => {
                let items = match block.param("list") {
                    Some(Value::List(items)) => items.clone(),
                    Some(Value::Str(name)) => match ctx.var(name) {
                        Some(Value::List(items)) => items,
                        Some(_) => return Err(format!("variable {} is not a list", name)),
                        None => return Err(format!("unknown list variable: {}", name)),
                    },
                    Some(_) => return Err("list parameter must be a list or variable name".into()),
                    None => return Err("missing list parameter".into()),
                };
                let var = block.str_param("as").unwrap_or("item").to_string();
                Ok(RepeatKind::ForEach {
                    var,
                    items,
                    index: 0,
                })
            }
            "forever" => Ok(RepeatKind::Forever),
            other => Err(format!("unknown repeat mode: {}", other)),
        }
    }
}

fn loop_cond(block: &Block) -> Result<LoopCond, String> {
    let var = block
        .str_param("var")
        .ok_or("missing var parameter")?
        .to_string();
    let value = block.param("value").cloned().ok_or("missing value parameter")?;
    let op = match block.str_param("op") {
        Some(raw) => Comparator::from_str(raw)?,
        None => Comparator::Equals,
    };
    Ok(LoopCond { var, op, value })
}

impl Behavior for RepeatBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let kind = match Self::build_kind(block, ctx) {
            Ok(kind) => kind,
            Err(e) => return Outcome::Error(e),
        };

        let ceiling = match block.int_param("max_iterations", ctx) {
            Some(n) if n > 0 => (n as u32).min(ctx.loop_ceiling()),
            _ => ctx.loop_ceiling(),
        };
        let delay = block
            .int_param("delay", ctx)
            .unwrap_or(1)
            .max(ctx.loop_min_delay() as i64) as u32;

        let state = LoopState::new(kind, block.children().to_vec(), ceiling, delay);
        ctx.push_frame(Frame::Loop(state));
        Outcome::Deferred
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        match block.str_param("mode").unwrap_or("times") {
            "times" => match block.param("times") {
                Some(v) if v.as_i64().is_some() || matches!(v, Value::Str(_)) => Ok(()),
                Some(_) => Err("times parameter must be numeric".into()),
                None => Err("missing times parameter".into()),
            },
            "while" | "until" => loop_cond(block).map(|_| ()),
            "for_each" => match block.param("list") {
                Some(Value::List(_)) | Some(Value::Str(_)) => Ok(()),
                Some(_) => Err("list parameter must be a list or variable name".into()),
                None => Err("missing list parameter".into()),
            },
            "forever" => Ok(()),
            other => Err(format!("unknown repeat mode: {}", other)),
        }
    }
}

/// Suspends the chain for a number of ticks, then resumes the remainder.
pub struct WaitBehavior;

impl Behavior for WaitBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let ticks = block
            .int_param("ticks", ctx)
            .unwrap_or(1)
            .max(ctx.loop_min_delay() as i64) as u32;
        let state = LoopState::new(RepeatKind::Wait, Vec::new(), ctx.loop_ceiling(), ticks);
        ctx.push_frame(Frame::Loop(state));
        Outcome::Deferred
    }
}

/// Stops the whole chain (caught at a function boundary, otherwise ends the
/// chain with its value).
pub struct StopBehavior;

impl Behavior for StopBehavior {
    fn execute(&self, _block: &Block, _ctx: &mut ExecutionContext) -> Outcome {
        Outcome::Return(None)
    }
}

pub struct BreakBehavior;

impl Behavior for BreakBehavior {
    fn execute(&self, _block: &Block, _ctx: &mut ExecutionContext) -> Outcome {
        Outcome::Break
    }
}

pub struct ContinueBehavior;

impl Behavior for ContinueBehavior {
    fn execute(&self, _block: &Block, _ctx: &mut ExecutionContext) -> Outcome {
        Outcome::Continue
    }
}
