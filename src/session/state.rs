use serde::{Deserialize, Serialize};

/// Where the session is in the validate → execute → report cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Validating,
    /// Static analysis failed; nothing was executed.
    BlockedBySyntax,
    /// A realm is running; runtime faults may still arrive.
    Executing,
    /// Submission is polling for a runtime fault.
    AwaitingRuntimeDiagnostic,
    Clean,
    Flagged,
    /// The realm could not be launched.
    Unavailable,
}
