use ember_events::PlayerId;
use thiserror::Error;

/// Hard registration failures. Per-line validation problems are softer:
/// they skip the offending line and are reported in the register report.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("player {player} registers {handlers} event handlers, limit is {limit}")]
    TooManyHandlers {
        player: PlayerId,
        handlers: usize,
        limit: usize,
    },
}

/// A line that failed validation and was skipped at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIssue {
    pub line: usize,
    pub reason: String,
}

/// What registration accomplished.
#[derive(Debug, Clone, Default)]
pub struct RegisterReport {
    /// Event-handler chains now eligible for dispatch.
    pub handlers: usize,
    /// Functions collected into the script's table.
    pub functions: usize,
    /// Lines skipped for validation failures.
    pub skipped_lines: Vec<LineIssue>,
}
