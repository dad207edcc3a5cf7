use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ember_events::{ActorRef, HostActionSender, PlayerId};

use crate::block::Block;
use crate::suspend::Frame;
use crate::value::Value;

/// Default hard ceiling on loop iterations, overridable via engine config.
pub const DEFAULT_LOOP_CEILING: u32 = 2048;

/// Per-invocation execution state threaded through one chain.
///
/// Chain-local variables die with the chain; script globals live behind the
/// shared handle and survive across dispatches. When a chain suspends on a
/// bounded loop, the context moves into the scheduled task together with the
/// collected suspension frames.
pub struct ExecutionContext {
    owner: PlayerId,
    actor: ActorRef,
    target: Option<ActorRef>,
    vars: HashMap<String, Value>,
    globals: Arc<Mutex<HashMap<String, Value>>>,
    functions: Arc<HashMap<String, Block>>,
    actions: HostActionSender,
    suspension: Vec<Frame>,
    occurrence_seq: u64,
    loop_ceiling: u32,
    loop_min_delay: u32,
}

impl ExecutionContext {
    pub fn new(owner: PlayerId, actor: ActorRef, actions: HostActionSender) -> Self {
        Self {
            owner,
            actor,
            target: None,
            vars: HashMap::new(),
            globals: Arc::new(Mutex::new(HashMap::new())),
            functions: Arc::new(HashMap::new()),
            actions,
            suspension: Vec::new(),
            occurrence_seq: 0,
            loop_ceiling: DEFAULT_LOOP_CEILING,
            loop_min_delay: 1,
        }
    }

    pub fn with_globals(mut self, globals: Arc<Mutex<HashMap<String, Value>>>) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_functions(mut self, functions: Arc<HashMap<String, Block>>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_occurrence_seq(mut self, seq: u64) -> Self {
        self.occurrence_seq = seq;
        self
    }

    pub fn with_loop_limits(mut self, ceiling: u32, min_delay: u32) -> Self {
        self.loop_ceiling = ceiling;
        self.loop_min_delay = min_delay.max(1);
        self
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn actor(&self) -> &ActorRef {
        &self.actor
    }

    pub fn target(&self) -> Option<&ActorRef> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Option<ActorRef>) {
        self.target = target;
    }

    /// The participant an "act upon" block applies to: the current target
    /// when one is set, the actor otherwise.
    pub fn subject(&self) -> &ActorRef {
        self.target.as_ref().unwrap_or(&self.actor)
    }

    pub fn actions(&self) -> &HostActionSender {
        &self.actions
    }

    pub fn occurrence_seq(&self) -> u64 {
        self.occurrence_seq
    }

    pub fn loop_ceiling(&self) -> u32 {
        self.loop_ceiling
    }

    pub fn loop_min_delay(&self) -> u32 {
        self.loop_min_delay
    }

    // ===== Variables =====

    /// Read a variable: chain-local first, then script globals.
    pub fn var(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.get(name) {
            return Some(value.clone());
        }
        self.globals().get(name).cloned()
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn remove_var(&mut self, name: &str) {
        self.vars.remove(name);
    }

    /// Write back to the scope the name currently resolves in: chain-local
    /// first, then script globals; an unknown name creates a chain-local.
    pub fn update_var(&mut self, name: &str, value: Value) {
        if self.vars.contains_key(name) {
            self.vars.insert(name.to_string(), value);
            return;
        }
        {
            let mut globals = self.globals.lock().unwrap_or_else(|e| e.into_inner());
            if globals.contains_key(name) {
                globals.insert(name.to_string(), value);
                return;
            }
        }
        self.vars.insert(name.to_string(), value);
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals().insert(name.into(), value);
    }

    pub fn remove_global(&mut self, name: &str) {
        self.globals().remove(name);
    }

    fn globals(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.globals.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy the chain-local bindings, for function-call scope isolation.
    pub fn snapshot_vars(&self) -> HashMap<String, Value> {
        self.vars.clone()
    }

    pub fn restore_vars(&mut self, saved: HashMap<String, Value>) {
        self.vars = saved;
    }

    // ===== Functions =====

    pub fn functions(&self) -> Arc<HashMap<String, Block>> {
        Arc::clone(&self.functions)
    }

    // ===== Suspension =====

    /// Record a frame while a `Deferred` outcome bubbles toward the
    /// dispatcher. Frames accumulate innermost-first.
    pub fn push_frame(&mut self, frame: Frame) {
        self.suspension.push(frame);
    }

    pub fn take_suspension(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.suspension)
    }

    pub fn has_suspension(&self) -> bool {
        !self.suspension.is_empty()
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use ember_events::HostAction;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// A context wired to a fresh action channel, for unit tests.
    pub fn test_context() -> (ExecutionContext, UnboundedReceiver<HostAction>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let ctx = ExecutionContext::new(
            PlayerId(1),
            ActorRef::new(PlayerId(1), "Ann"),
            HostActionSender::new(tx),
        );
        (ctx, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_context;
    use super::*;

    #[test]
    fn test_local_shadows_global() {
        let (mut ctx, _rx) = test_context();
        ctx.set_global("x", Value::Int(1));
        ctx.set_var("x", Value::Int(2));
        assert_eq!(ctx.var("x"), Some(Value::Int(2)));
        ctx.remove_var("x");
        assert_eq!(ctx.var("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_globals_shared_between_contexts() {
        let (ctx_a, _rx_a) = test_context();
        let globals = Arc::new(Mutex::new(HashMap::new()));
        let mut a = ctx_a.with_globals(Arc::clone(&globals));
        a.set_global("counter", Value::Int(41));

        let (ctx_b, _rx_b) = test_context();
        let b = ctx_b.with_globals(globals);
        assert_eq!(b.var("counter"), Some(Value::Int(41)));
    }

    #[test]
    fn test_subject_prefers_target() {
        let (mut ctx, _rx) = test_context();
        assert_eq!(ctx.subject().name, "Ann");
        ctx.set_target(Some(ActorRef::new(PlayerId(9), "Bob")));
        assert_eq!(ctx.subject().name, "Bob");
    }
}
