/// Dispatch engine for emberscript
///
/// Hosts player scripts against a live occurrence feed: registration and
/// validation, the occurrence-class index, the per-tick safety governor,
/// and the scheduler that drives bounded async loops across ticks without
/// ever blocking the shared simulation loop.
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod index;
pub mod logging;
pub mod registry;
pub mod scheduler;
pub mod script;
pub mod task;

pub use config::EngineConfig;
pub use diagnostics::{DispatchSnapshot, KindStats};
pub use dispatcher::ScriptEngine;
pub use error::{LineIssue, RegisterError, RegisterReport};
pub use index::{EventIndex, HandlerEntry};
pub use logging::init_logging;
pub use registry::ScriptRegistry;
pub use scheduler::{TaskId, TickScheduler};
pub use script::{Line, Script, ScriptData};
pub use task::{ChainTask, StepResult};
