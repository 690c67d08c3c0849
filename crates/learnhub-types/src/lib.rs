//! Shared data model for the learnhub playground.
//!
//! - [`source`]: the editable HTML/CSS/JS bundle.
//! - [`diagnostic`]: diagnostics, run results and attempt counters.
//! - [`records`]: rows exchanged with the data service.
//! - [`sandbox`]: realm identity, the host/realm wire protocol and the
//!   executor contracts implemented by sandbox crates.

pub mod diagnostic;
pub mod records;
pub mod sandbox;
pub mod source;

pub use diagnostic::{AttemptCounters, ConsoleLine, Diagnostic, DiagnosticKind, RunResult};
pub use records::{
    Challenge, ChallengeCategory, Level, QuizCategory, QuizQuestion, SubmissionRecord,
    UserProgress,
};
pub use sandbox::{
    realm_channel, Envelope, LineMap, PlaygroundMessage, RealmHandle, RealmId, RealmInbox,
    RealmOutbox, RealmPayload, SandboxError, SandboxExecutor, SyntaxChecker, SyntaxFailure,
};
pub use source::{SourceBundle, SourceField};
