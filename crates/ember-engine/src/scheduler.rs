use std::collections::HashMap;

use ember_events::PlayerId;

use crate::task::ChainTask;

/// Unique identifier for a scheduled chain task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

struct Scheduled {
    owner: PlayerId,
    due_tick: u64,
    task: ChainTask,
}

/// Tick-granularity scheduler for suspended chains.
///
/// The engine advances it once per simulation tick; due tasks are removed
/// and stepped by the caller, which re-schedules any that park again.
/// Teardown cancels by owner so a disabled or unregistered script never
/// steps again.
#[derive(Default)]
pub struct TickScheduler {
    tasks: HashMap<TaskId, Scheduled>,
    next_id: u64,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, owner: PlayerId, task: ChainTask, due_tick: u64) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            Scheduled {
                owner,
                due_tick,
                task,
            },
        );
        id
    }

    /// Remove and return every task due at or before `now`, oldest first.
    pub fn pop_due(&mut self, now: u64) -> Vec<(PlayerId, ChainTask)> {
        let mut due: Vec<TaskId> = self
            .tasks
            .iter()
            .filter(|(_, s)| s.due_tick <= now)
            .map(|(id, _)| *id)
            .collect();
        due.sort();
        due.into_iter()
            .filter_map(|id| self.tasks.remove(&id))
            .map(|s| (s.owner, s.task))
            .collect()
    }

    /// Drop every pending task for the owner. Returns how many were
    /// cancelled.
    pub fn cancel_owner(&mut self, owner: PlayerId) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, s| s.owner != owner);
        before - self.tasks.len()
    }

    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}
