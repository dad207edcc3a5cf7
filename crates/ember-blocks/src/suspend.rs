use std::collections::HashMap;

use crate::block::Block;
use crate::context::ExecutionContext;
use crate::value::{Comparator, Value};

/// One level of a suspended chain's continuation.
///
/// While a `Deferred` outcome bubbles out of a chain, each boundary it
/// crosses records what must happen once the suspension resolves: a loop
/// waiting to iterate, the unexecuted tail of a sequence, or a function-call
/// scope to restore.
#[derive(Debug, Clone)]
pub enum Frame {
    /// A bounded async loop parked between iterations.
    Loop(LoopState),
    /// Siblings that did not run because an earlier child deferred.
    Sequence { rest: Vec<Block> },
    /// A function-call boundary: restores the caller's variables and turns
    /// `Return` into `Success` when the suspended body finishes.
    Call { saved_vars: HashMap<String, Value> },
}

/// Lifecycle of a bounded async loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Running,
    Completed,
    Aborted,
}

/// What the loop wants to do on a scheduler step.
#[derive(Debug, PartialEq, Eq)]
pub enum LoopNext {
    RunBody,
    Stop,
}

/// Stop condition for while/until loops, re-evaluated against the live
/// context on every step.
#[derive(Debug, Clone)]
pub struct LoopCond {
    pub var: String,
    pub op: Comparator,
    pub value: Value,
}

impl LoopCond {
    pub fn eval(&self, ctx: &ExecutionContext) -> bool {
        let current = ctx.var(&self.var).unwrap_or(Value::Null);
        current.compare(self.op, &self.value)
    }
}

/// Repeat mode of a bounded async loop.
#[derive(Debug, Clone)]
pub enum RepeatKind {
    Times { total: u32 },
    While(LoopCond),
    Until(LoopCond),
    ForEach {
        var: String,
        items: Vec<Value>,
        index: usize,
    },
    Forever,
    /// A single suspension with no body: the wait block.
    Wait,
}

/// Resumable state of one bounded async loop.
///
/// The body executes at most once per scheduler step; the delay between
/// steps is in ticks and never below one.
#[derive(Debug, Clone)]
pub struct LoopState {
    pub kind: RepeatKind,
    pub body: Vec<Block>,
    pub iterations: u32,
    pub ceiling: u32,
    pub delay_ticks: u32,
    pub phase: LoopPhase,
}

impl LoopState {
    pub fn new(kind: RepeatKind, body: Vec<Block>, ceiling: u32, delay_ticks: u32) -> Self {
        Self {
            kind,
            body,
            iterations: 0,
            ceiling,
            delay_ticks: delay_ticks.max(1),
            phase: LoopPhase::Running,
        }
    }

    /// Decide the next action, re-reading the stop condition from the live
    /// context. For-each advances its cursor and binds the element variable
    /// as a side effect of deciding to run.
    pub fn next(&mut self, ctx: &mut ExecutionContext) -> LoopNext {
        if self.iterations >= self.ceiling {
            tracing::debug!(
                target: "scripting",
                iterations = self.iterations,
                ceiling = self.ceiling,
                "loop iteration ceiling reached, completing"
            );
            self.phase = LoopPhase::Completed;
            return LoopNext::Stop;
        }

        let run = match &mut self.kind {
            RepeatKind::Times { total } => self.iterations < *total,
            RepeatKind::While(cond) => cond.eval(ctx),
            RepeatKind::Until(cond) => !cond.eval(ctx),
            RepeatKind::ForEach { var, items, index } => {
                if *index < items.len() {
                    ctx.set_var(var.clone(), items[*index].clone());
                    *index += 1;
                    true
                } else {
                    false
                }
            }
            RepeatKind::Forever => true,
            RepeatKind::Wait => false,
        };

        if run {
            LoopNext::RunBody
        } else {
            self.phase = LoopPhase::Completed;
            LoopNext::Stop
        }
    }
}
