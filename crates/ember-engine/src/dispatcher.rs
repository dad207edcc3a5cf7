use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use ember_blocks::{BlockFactory, ExecutionContext, Outcome, Value};
use ember_events::{
    ActorRef, HostAction, HostActionSender, Occurrence, OccurrenceEnvelope, OccurrenceKind,
    OccurrenceSource, PlayerId,
};
use strum::IntoEnumIterator;

use crate::config::EngineConfig;
use crate::diagnostics::{DispatchSnapshot, DispatchStats};
use crate::error::{RegisterError, RegisterReport};
use crate::index::EventIndex;
use crate::registry::ScriptRegistry;
use crate::scheduler::TickScheduler;
use crate::script::Script;
use crate::task::{ChainTask, StepResult};

/// The dispatch engine: owns the registry, the occurrence index, the tick
/// scheduler for suspended chains and the safety governor.
///
/// All methods except `remote_sender` must be called from the primary
/// simulation thread. Occurrence sources living off that thread post
/// through the remote channel and are drained at the top of every tick.
pub struct ScriptEngine {
    config: EngineConfig,
    factory: BlockFactory,
    registry: ScriptRegistry,
    index: EventIndex,
    scheduler: TickScheduler,
    stats: DispatchStats,
    actions_tx: UnboundedSender<HostAction>,
    remote_tx: UnboundedSender<Occurrence>,
    remote_rx: UnboundedReceiver<Occurrence>,
    now_tick: u64,
    processed_this_tick: u32,
    next_seq: u64,
}

impl ScriptEngine {
    /// Create an engine and the receiving half of its host-action channel.
    pub fn new(config: EngineConfig) -> (Self, UnboundedReceiver<HostAction>) {
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (remote_tx, remote_rx) = mpsc::unbounded_channel();
        let engine = Self {
            config,
            factory: BlockFactory::new(),
            registry: ScriptRegistry::new(),
            index: EventIndex::new(),
            scheduler: TickScheduler::new(),
            stats: DispatchStats::default(),
            actions_tx,
            remote_tx,
            remote_rx,
            now_tick: 0,
            processed_this_tick: 0,
            next_seq: 0,
        };
        (engine, actions_rx)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn factory(&self) -> &BlockFactory {
        &self.factory
    }

    /// Sender for occurrence sources delivered off the primary thread.
    /// Posted occurrences are dispatched at the start of the next tick.
    pub fn remote_sender(&self) -> UnboundedSender<Occurrence> {
        self.remote_tx.clone()
    }

    /// Every occurrence class the engine can react to; the host subscribes
    /// its feeds once at startup against this fixed set.
    pub fn supported_kinds() -> impl Iterator<Item = OccurrenceKind> {
        OccurrenceKind::iter()
    }

    pub fn current_tick(&self) -> u64 {
        self.now_tick
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    // ===== Registration =====

    /// Install a player's script, replacing any previous one. Invalid lines
    /// are skipped and reported; exceeding the per-player handler ceiling
    /// rejects the whole registration.
    pub fn register(&mut self, mut script: Script) -> Result<RegisterReport, RegisterError> {
        let owner = script.owner();
        let report = script.prepare();

        if report.handlers > self.config.max_handlers_per_player {
            return Err(RegisterError::TooManyHandlers {
                player: owner,
                handlers: report.handlers,
                limit: self.config.max_handlers_per_player,
            });
        }

        for issue in &report.skipped_lines {
            warn!(
                target: "scripting",
                owner = %owner,
                line = issue.line,
                reason = %issue.reason,
                "line failed validation and was skipped"
            );
        }

        // replacing a script tears down its suspended chains
        self.scheduler.cancel_owner(owner);
        self.registry.insert(script);
        self.rebuild_index();

        info!(
            target: "scripting",
            owner = %owner,
            handlers = report.handlers,
            functions = report.functions,
            "script registered"
        );
        Ok(report)
    }

    /// Remove a player's script and every pending scheduled step for it.
    pub fn unregister(&mut self, player: PlayerId) -> bool {
        let cancelled = self.scheduler.cancel_owner(player);
        let removed = self.registry.remove(player).is_some();
        if removed {
            self.rebuild_index();
            info!(
                target: "scripting",
                owner = %player,
                cancelled_tasks = cancelled,
                "script unregistered"
            );
        }
        removed
    }

    /// Toggle dispatch eligibility without touching script data. Disabling
    /// also cancels pending loop steps.
    pub fn set_enabled(&mut self, player: PlayerId, enabled: bool) -> bool {
        let changed = self.registry.update(player, |s| s.set_enabled(enabled));
        if changed {
            if !enabled {
                let cancelled = self.scheduler.cancel_owner(player);
                debug!(
                    target: "scripting",
                    owner = %player,
                    cancelled_tasks = cancelled,
                    "script disabled"
                );
            }
            self.rebuild_index();
        }
        changed
    }

    pub fn is_registered(&self, player: PlayerId) -> bool {
        self.registry.contains(player)
    }

    pub fn script(&self, player: PlayerId) -> Option<std::sync::Arc<Script>> {
        self.registry.get(player)
    }

    fn rebuild_index(&self) {
        let scripts = self.registry.snapshot();
        self.index.rebuild(&scripts);
    }

    // ===== Dispatch =====

    /// Dispatch one occurrence on the primary thread.
    pub fn dispatch(&mut self, occurrence: Occurrence) {
        let seq = self.take_seq();
        self.dispatch_envelope(OccurrenceEnvelope::new(
            occurrence,
            seq,
            OccurrenceSource::Primary,
        ));
    }

    fn take_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn dispatch_envelope(&mut self, envelope: OccurrenceEnvelope) {
        if self.processed_this_tick >= self.config.max_occurrences_per_tick {
            // never queued: dropping is what keeps the shared loop alive
            self.stats.record_drop();
            debug!(
                target: "dispatch",
                kind = %envelope.occurrence.kind(),
                "per-tick occurrence ceiling reached, dropping"
            );
            return;
        }
        self.processed_this_tick += 1;

        let kind = envelope.occurrence.kind();
        let buckets = self.index.snapshot();
        let Some(entries) = buckets.get(&kind) else {
            return;
        };
        let scripts = self.registry.snapshot();

        let mut saw_stale = false;
        for entry in entries {
            let Some(script) = scripts.get(&entry.owner) else {
                saw_stale = true;
                continue;
            };
            if !script.enabled() {
                continue;
            }
            if let Some(actor) = envelope.occurrence.actor() {
                if actor.id != entry.owner {
                    continue;
                }
            }
            if let (Some(bound), Some(world)) =
                (script.bound_world(), envelope.occurrence.world())
            {
                if bound != world {
                    continue;
                }
            }
            let Some(root) = script.handler(entry.line, entry.root) else {
                continue;
            };
            if !root.matches(&envelope.occurrence) {
                continue;
            }
            self.run_handler(script, entry.line, entry.root, &envelope);
        }

        if saw_stale {
            // opportunistic purge of entries for players no longer present
            self.rebuild_index();
        }
    }

    fn run_handler(
        &mut self,
        script: &Script,
        line: usize,
        root_index: usize,
        envelope: &OccurrenceEnvelope,
    ) {
        // re-fetch so the block borrow is visibly tied to `script`
        let Some(root) = script.handler(line, root_index) else {
            return;
        };
        let kind = envelope.occurrence.kind();
        let actor = envelope
            .occurrence
            .actor()
            .cloned()
            .unwrap_or_else(|| ActorRef::new(script.owner(), script.owner_name().to_string()));

        let mut ctx = ExecutionContext::new(
            script.owner(),
            actor,
            HostActionSender::new(self.actions_tx.clone()),
        )
        .with_globals(script.globals())
        .with_functions(script.functions())
        .with_occurrence_seq(envelope.seq)
        .with_loop_limits(
            self.config.loop_iteration_ceiling,
            self.config.loop_min_delay_ticks,
        );
        seed_variables(&mut ctx, &envelope.occurrence);

        let started = Instant::now();
        let outcome = root.execute(&mut ctx);
        let elapsed = started.elapsed();
        self.stats.record(kind, elapsed);

        let budget = Duration::from_millis(self.config.handler_time_budget_ms);
        if elapsed > budget {
            // advisory only: the platform cannot preempt a running handler
            warn!(
                target: "dispatch",
                owner = %script.owner(),
                kind = root.kind(),
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.config.handler_time_budget_ms,
                "handler exceeded soft time budget"
            );
        }

        match outcome {
            Outcome::Error(message) => {
                warn!(
                    target: "dispatch",
                    owner = %script.owner(),
                    kind = root.kind(),
                    %message,
                    "script chain failed"
                );
            }
            Outcome::Deferred => {
                if let Some((task, delay)) = ChainTask::capture(ctx) {
                    let due = self.now_tick + u64::from(delay.max(1));
                    self.scheduler.schedule(script.owner(), task, due);
                }
            }
            _ => {}
        }
    }

    // ===== Tick =====

    /// Advance one scheduling tick: reset the occurrence governor, drain
    /// re-posted off-thread occurrences, then run due loop steps.
    pub fn tick(&mut self) {
        self.now_tick += 1;
        self.processed_this_tick = 0;

        while let Ok(occurrence) = self.remote_rx.try_recv() {
            let seq = self.take_seq();
            self.dispatch_envelope(OccurrenceEnvelope::new(
                occurrence,
                seq,
                OccurrenceSource::Remote,
            ));
        }

        for (owner, mut task) in self.scheduler.pop_due(self.now_tick) {
            match task.step() {
                StepResult::Sleep(delay) => {
                    let due = self.now_tick + u64::from(delay.max(1));
                    self.scheduler.schedule(owner, task, due);
                }
                StepResult::Finished(Outcome::Error(message)) => {
                    warn!(
                        target: "dispatch",
                        owner = %owner,
                        %message,
                        "suspended chain aborted"
                    );
                }
                StepResult::Finished(_) => {}
            }
        }
    }
}

/// Expose the occurrence payload to blocks as interpolation variables.
fn seed_variables(ctx: &mut ExecutionContext, occurrence: &Occurrence) {
    if let Some(actor) = occurrence.actor() {
        ctx.set_var("player", Value::from(actor.name.clone()));
    }
    if let Some(world) = occurrence.world() {
        ctx.set_var("world", Value::from(world.to_string()));
    }

    match occurrence {
        Occurrence::Chat { message, .. } => {
            ctx.set_var("message", Value::from(message.clone()));
        }
        Occurrence::Move { x, y, z, .. } => {
            ctx.set_var("x", Value::Float(*x));
            ctx.set_var("y", Value::Float(*y));
            ctx.set_var("z", Value::Float(*z));
        }
        Occurrence::Interact { object, .. } => {
            ctx.set_var("object", Value::from(object.clone()));
        }
        Occurrence::Damage {
            damager, amount, ..
        } => {
            ctx.set_var("amount", Value::Float(*amount));
            if let Some(damager) = damager {
                ctx.set_var("damager", Value::from(damager.name.clone()));
            }
        }
        Occurrence::Death { cause, .. } => {
            ctx.set_var("cause", Value::from(cause.clone()));
        }
        Occurrence::Drop { item, quantity, .. } | Occurrence::Pickup { item, quantity, .. } => {
            ctx.set_var("item", Value::from(item.clone()));
            ctx.set_var("quantity", Value::Int(i64::from(*quantity)));
        }
        Occurrence::InventoryClick { slot, item, .. } => {
            ctx.set_var("slot", Value::Int(i64::from(*slot)));
            ctx.set_var("item", Value::from(item.clone()));
        }
        Occurrence::Command { command, .. } => {
            ctx.set_var("command", Value::from(command.clone()));
        }
        Occurrence::WorldChange {
            from_world,
            to_world,
            ..
        } => {
            ctx.set_var("from_world", Value::from(from_world.clone()));
            ctx.set_var("to_world", Value::from(to_world.clone()));
        }
        Occurrence::Sneak { sneaking, .. } => {
            ctx.set_var("sneaking", Value::Bool(*sneaking));
        }
        Occurrence::BlockBreak { block, .. } | Occurrence::BlockPlace { block, .. } => {
            ctx.set_var("block", Value::from(block.clone()));
        }
        Occurrence::EntitySpawn { entity, .. }
        | Occurrence::EntityDeath { entity, .. }
        | Occurrence::EntityDamage { entity, .. }
        | Occurrence::EntityTarget { entity, .. }
        | Occurrence::EntityExplode { entity, .. } => {
            ctx.set_var("entity", Value::from(entity.kind.clone()));
        }
        _ => {}
    }

    // entity damage carries its own amount field
    if let Occurrence::EntityDamage { amount, .. } = occurrence {
        ctx.set_var("amount", Value::Float(*amount));
    }
}
