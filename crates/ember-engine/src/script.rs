use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ember_blocks::{Block, BlockData, BlockFactory, Category, FactoryError, Value};
use ember_events::PlayerId;
use serde::{Deserialize, Serialize};

use crate::error::{LineIssue, RegisterReport};

/// One independent top-level chain group within a script.
#[derive(Debug, Clone)]
pub struct Line {
    roots: Vec<Block>,
    valid: bool,
}

impl Line {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            valid: true,
        }
    }

    pub fn with_root(mut self, root: Block) -> Self {
        self.roots.push(root);
        self
    }

    pub fn add_root(&mut self, root: Block) {
        self.roots.push(root);
    }

    pub fn roots(&self) -> &[Block] {
        &self.roots
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Structural validation: every root must be an event trigger or a
    /// function definition, and every block in the tree must validate.
    fn validate(&self) -> Result<(), String> {
        for root in &self.roots {
            if !matches!(root.category(), Category::Event | Category::Function) {
                return Err(format!(
                    "root block {} must be an event or function definition",
                    root.kind()
                ));
            }
            root.validate_tree()?;
        }
        Ok(())
    }
}

/// A player's complete set of block chains.
///
/// Exactly one script is active per player identity. Global variables live
/// behind a shared handle so every dispatch of this script, including
/// suspended loop steps, reads and writes the same store.
#[derive(Debug, Clone)]
pub struct Script {
    owner: PlayerId,
    owner_name: String,
    lines: Vec<Line>,
    enabled: bool,
    bound_world: Option<String>,
    globals: Arc<Mutex<HashMap<String, Value>>>,
    functions: Arc<HashMap<String, Block>>,
}

impl Script {
    pub fn new(owner: PlayerId, owner_name: impl Into<String>) -> Self {
        Self {
            owner,
            owner_name: owner_name.into(),
            lines: Vec::new(),
            enabled: true,
            bound_world: None,
            globals: Arc::new(Mutex::new(HashMap::new())),
            functions: Arc::new(HashMap::new()),
        }
    }

    pub fn with_line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }

    pub fn add_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    pub fn with_bound_world(mut self, world: impl Into<String>) -> Self {
        self.bound_world = Some(world.into());
        self
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn bound_world(&self) -> Option<&str> {
        self.bound_world.as_deref()
    }

    pub fn globals(&self) -> Arc<Mutex<HashMap<String, Value>>> {
        Arc::clone(&self.globals)
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn functions(&self) -> Arc<HashMap<String, Block>> {
        Arc::clone(&self.functions)
    }

    /// The event root a handler entry points at, if it still exists.
    pub fn handler(&self, line: usize, root: usize) -> Option<&Block> {
        let line = self.lines.get(line)?;
        if !line.valid {
            return None;
        }
        line.roots.get(root)
    }

    /// Validate every line and rebuild the function table. Invalid lines
    /// stay in the script (the editor keeps their data) but are ineligible
    /// for dispatch; only the offending line is blocked.
    pub fn prepare(&mut self) -> RegisterReport {
        let mut report = RegisterReport::default();

        for (i, line) in self.lines.iter_mut().enumerate() {
            match line.validate() {
                Ok(()) => line.valid = true,
                Err(reason) => {
                    line.valid = false;
                    report.skipped_lines.push(LineIssue { line: i, reason });
                }
            }
        }

        let mut functions = HashMap::new();
        for line in self.lines.iter().filter(|l| l.valid) {
            for root in &line.roots {
                collect_functions(root, &mut functions);
            }
        }
        report.functions = functions.len();
        self.functions = Arc::new(functions);

        report.handlers = self.event_roots().count();
        report
    }

    /// Every dispatchable event root as (line index, root index).
    pub fn event_roots(&self) -> impl Iterator<Item = (usize, usize, &Block)> {
        self.lines.iter().enumerate().flat_map(|(li, line)| {
            line.roots
                .iter()
                .enumerate()
                .filter(move |_| line.valid)
                .filter(|(_, root)| root.event_kind().is_some())
                .map(move |(ri, root)| (li, ri, root))
        })
    }

    // ===== Persistence surface =====

    pub fn to_data(&self) -> ScriptData {
        ScriptData {
            owner: self.owner,
            owner_name: self.owner_name.clone(),
            enabled: self.enabled,
            bound_world: self.bound_world.clone(),
            globals: self
                .globals
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
            lines: self
                .lines
                .iter()
                .map(|line| line.roots.iter().map(Block::to_data).collect())
                .collect(),
        }
    }

    pub fn from_data(factory: &BlockFactory, data: &ScriptData) -> Result<Self, FactoryError> {
        let mut script = Script::new(data.owner, data.owner_name.clone());
        script.enabled = data.enabled;
        script.bound_world = data.bound_world.clone();
        script.globals = Arc::new(Mutex::new(data.globals.clone()));
        for roots in &data.lines {
            let mut line = Line::new();
            for root in roots {
                line.add_root(factory.from_data(root)?);
            }
            script.lines.push(line);
        }
        Ok(script)
    }
}

/// Last definition wins when two functions share a name.
fn collect_functions(block: &Block, out: &mut HashMap<String, Block>) {
    if block.kind() == "func.define" {
        if let Some(name) = block.str_param("name") {
            out.insert(name.to_string(), block.clone());
        }
    }
    for child in block.children() {
        collect_functions(child, out);
    }
}

/// Transport-neutral form of a whole script, keyed by player identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptData {
    pub owner: PlayerId,
    pub owner_name: String,
    pub enabled: bool,
    #[serde(default)]
    pub bound_world: Option<String>,
    #[serde(default)]
    pub globals: HashMap<String, Value>,
    pub lines: Vec<Vec<BlockData>>,
}
