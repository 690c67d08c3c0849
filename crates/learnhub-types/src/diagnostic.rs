//! Diagnostics and run bookkeeping.

use serde::{Deserialize, Serialize};

/// Where a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Found by the static analyzer before anything ran.
    StaticSyntax,
    /// Reported by the realm while the script ran.
    RuntimeFault,
    /// The realm could not be started at all.
    Unavailable,
}

/// A single detected problem.
///
/// `line` and `column` are 1-based and refer to the user's JavaScript pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub stack: Option<String>,
}

impl Diagnostic {
    pub fn static_syntax(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::StaticSyntax,
            message: message.into(),
            line: None,
            column: None,
            stack: None,
        }
    }

    pub fn runtime(message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            kind: DiagnosticKind::RuntimeFault,
            message: message.into(),
            line: None,
            column: None,
            stack: stack.filter(|s| !s.is_empty()),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Unavailable,
            message: message.into(),
            line: None,
            column: None,
            stack: None,
        }
    }

    pub fn with_location(mut self, line: Option<u32>, column: Option<u32>) -> Self {
        self.line = line;
        self.column = column;
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{} (line {}, column {})", self.message, line, column),
            (Some(line), None) => write!(f, "{} (line {})", self.message, line),
            _ => f.write_str(&self.message),
        }
    }
}

/// Outcome of the synchronous part of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub immediate_error_found: bool,
    pub diagnostic: Option<Diagnostic>,
}

impl RunResult {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn blocked(diagnostic: Diagnostic) -> Self {
        Self {
            immediate_error_found: true,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Run and mistake counters for one challenge load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounters {
    pub run_count: u32,
    pub mistake_count: u32,
}

impl AttemptCounters {
    pub fn record_run(&mut self) {
        self.run_count = self.run_count.saturating_add(1);
    }

    pub fn record_mistakes(&mut self, count: u32) {
        self.mistake_count = self.mistake_count.saturating_add(count);
    }
}

/// A non-error console line captured from the realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    pub level: String,
    pub message: String,
}
