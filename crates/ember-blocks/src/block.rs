use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ember_events::{Occurrence, OccurrenceKind};
use serde::{Deserialize, Serialize};

use crate::catalog::Category;
use crate::context::ExecutionContext;
use crate::interpolate::interpolate;
use crate::outcome::Outcome;
use crate::suspend::Frame;
use crate::value::Value;

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one block node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u64);

impl BlockId {
    fn fresh() -> Self {
        BlockId(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The per-kind implementation a block delegates to.
///
/// Behaviors are stateless apart from construction-time specialization
/// (an event behavior carries its occurrence kind, a comparison behavior its
/// operator), so one instance is shared by every block of that kind.
pub trait Behavior: Send + Sync {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome;

    /// Structural check independent of runtime state.
    fn validate(&self, _block: &Block) -> Result<(), String> {
        Ok(())
    }

    /// Event behaviors decide whether an incoming occurrence fires them.
    fn matches(&self, _block: &Block, _occurrence: &Occurrence) -> bool {
        false
    }

    /// The occurrence class an event behavior registers under.
    fn event_kind(&self) -> Option<OccurrenceKind> {
        None
    }
}

/// One instruction/decision node in a script.
///
/// A block owns its ordered children; there is no parent back-pointer,
/// traversal passes parent context explicitly.
pub struct Block {
    id: BlockId,
    kind: &'static str,
    category: Category,
    behavior: Arc<dyn Behavior>,
    params: BTreeMap<String, Value>,
    children: Vec<Block>,
}

impl Block {
    pub(crate) fn new(kind: &'static str, category: Category, behavior: Arc<dyn Behavior>) -> Self {
        Self {
            id: BlockId::fresh(),
            kind,
            category,
            behavior,
            params: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn category(&self) -> Category {
        self.category
    }

    // ===== Editor surface =====

    pub fn set_parameter(&mut self, key: impl Into<String>, value: Value) {
        self.params.insert(key.into(), value);
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set_parameter(key, value);
        self
    }

    pub fn add_child(&mut self, child: Block) {
        self.children.push(child);
    }

    pub fn with_child(mut self, child: Block) -> Self {
        self.add_child(child);
        self
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn children(&self) -> &[Block] {
        &self.children
    }

    // ===== Parameter views =====

    /// Textual parameter with `%name%` interpolation applied.
    pub fn text_param(&self, key: &str, ctx: &ExecutionContext) -> Option<String> {
        self.params.get(key).map(|v| match v {
            Value::Str(s) => interpolate(s, ctx),
            other => other.to_string(),
        })
    }

    /// Raw string parameter, uninterpolated (variable names, modes).
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Numeric parameter; strings are interpolated first, then parsed.
    pub fn int_param(&self, key: &str, ctx: &ExecutionContext) -> Option<i64> {
        match self.params.get(key)? {
            Value::Str(s) => interpolate(s, ctx).trim().parse().ok(),
            other => other.as_i64(),
        }
    }

    pub fn float_param(&self, key: &str, ctx: &ExecutionContext) -> Option<f64> {
        match self.params.get(key)? {
            Value::Str(s) => interpolate(s, ctx).trim().parse().ok(),
            other => other.as_f64(),
        }
    }

    // ===== Contract =====

    pub fn execute(&self, ctx: &mut ExecutionContext) -> Outcome {
        self.behavior.execute(self, ctx)
    }

    pub fn matches(&self, occurrence: &Occurrence) -> bool {
        self.behavior.matches(self, occurrence)
    }

    pub fn event_kind(&self) -> Option<OccurrenceKind> {
        self.behavior.event_kind()
    }

    /// Validate this block and every descendant; the first failure wins and
    /// is reported with the offending block kind.
    pub fn validate_tree(&self) -> Result<(), String> {
        self.behavior
            .validate(self)
            .map_err(|e| format!("{}: {}", self.kind, e))?;
        for child in &self.children {
            child.validate_tree()?;
        }
        Ok(())
    }

    /// Transport-neutral form for the persistence collaborator.
    pub fn to_data(&self) -> BlockData {
        BlockData {
            kind: self.kind.to_string(),
            params: self.params.clone(),
            children: self.children.iter().map(Block::to_data).collect(),
        }
    }
}

impl Clone for Block {
    /// Structurally independent deep copy: children are deep-copied,
    /// parameters cloned, the stateless behavior handle shared. Every node
    /// in the copy gets a fresh id.
    fn clone(&self) -> Self {
        Self {
            id: BlockId::fresh(),
            kind: self.kind,
            category: self.category,
            behavior: Arc::clone(&self.behavior),
            params: self.params.clone(),
            children: self.children.clone(),
        }
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("children", &self.children)
            .finish()
    }
}

/// Serializable mirror of a block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub children: Vec<BlockData>,
}

impl BlockData {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

/// Run blocks in order with composite short-circuiting.
///
/// Only `Success` continues to the next sibling. A `Deferred` child records
/// the unexecuted tail as a sequence frame before bubbling up, so the
/// suspended chain can resume exactly where it stopped.
pub fn run_sequence(blocks: &[Block], ctx: &mut ExecutionContext) -> Outcome {
    for (i, block) in blocks.iter().enumerate() {
        match block.execute(ctx) {
            Outcome::Success(_) => {}
            Outcome::Deferred => {
                let rest = blocks[i + 1..].to_vec();
                if !rest.is_empty() {
                    ctx.push_frame(Frame::Sequence { rest });
                }
                return Outcome::Deferred;
            }
            other => return other,
        }
    }
    Outcome::ok()
}
