//! # learnhub: live HTML/CSS/JavaScript playground engine
//!
//! `learnhub` runs learner-written web pages the way an interactive course
//! editor does: every edit is checked, executed in an isolated realm and
//! reported back as diagnostics, and challenge submissions are scored and
//! recorded.
//!
//! - **Static analysis**: heuristic HTML tag balance, CSS brace balance and a
//!   real JavaScript parse, run before anything executes.
//! - **Sandboxed execution**: the page is assembled into one instrumented
//!   document and its script runs on a dedicated thread with its own Boa
//!   engine context, a virtual timer clock and loop/recursion limits.
//! - **Diagnostic channel**: the realm reports errors and console output by
//!   message passing only; messages from superseded realms are dropped.
//! - **Run and score control**: attempt counters, a debounced auto-run and
//!   once-per-challenge scored submissions.
//! - **Services**: in-memory and REST implementations of the data and auth
//!   services backing challenges, quizzes and progress.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use learnhub::{EditorSession, SessionEvent, SourceField};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = EditorSession::builder().build().unwrap();
//!     session.edit(SourceField::Js, "console.log(1 + 1);");
//!     let result = session.run();
//!     assert!(!result.immediate_error_found);
//!     while session.next_event().await != SessionEvent::Settled {}
//!     println!("{:?}", session.console());
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `builtin-sandbox-js` | Bundles the Boa realm executor and syntax checker (default) |

pub mod analyzer;
pub mod channel;
pub mod config;
pub mod core;
pub mod error;
pub mod service;
pub mod session;

pub use crate::analyzer::{AnalysisReport, StaticAnalyzer};
pub use crate::channel::{ChannelEvent, DiagnosticChannel};
pub use crate::config::{PlaygroundConfig, ServiceConfig};
pub use crate::core::{RuntimeContext, SessionIdStore};
pub use crate::error::{PlaygroundError, PlaygroundResult};
pub use crate::service::{
    AuthService, Catalog, DataService, MemoryAuthService, MemoryDataService, RestAuthService,
    RestDataService, ServiceError,
};
pub use crate::session::{
    compute_score, EditorSession, EditorSessionBuilder, RunState, SessionEvent, SubmitOutcome,
};
pub use learnhub_types::{
    AttemptCounters, Challenge, ConsoleLine, Diagnostic, DiagnosticKind, RunResult, SourceBundle,
    SourceField, SubmissionRecord,
};
