//! The editor session: owns the source bundle, the attempt counters, the
//! live diagnostic and at most one running realm.
//!
//! Every run follows the same path whether it was triggered by the user,
//! by the debounce timer or by a submission:
//!
//! ```text
//! Idle → Validating → BlockedBySyntax
//!                   → Executing → Clean | Flagged
//!                   → Unavailable
//! ```
//!
//! Submissions add an `AwaitingRuntimeDiagnostic` step that polls for a
//! runtime fault before scoring.

pub mod debounce;
pub mod score;
pub mod state;

use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};

use learnhub_types::{
    AttemptCounters, Challenge, ConsoleLine, Diagnostic, RealmHandle, RealmId, RunResult,
    SandboxError, SandboxExecutor, SourceBundle, SourceField, SubmissionRecord,
};

use crate::analyzer::StaticAnalyzer;
use crate::channel::{source_span, ChannelEvent, DiagnosticChannel};
use crate::config::PlaygroundConfig;
use crate::core::{new_session_id, RuntimeContext};
use crate::error::PlaygroundResult;
use crate::service::{Catalog, MemoryDataService};

pub use debounce::Debouncer;
pub use score::compute_score;
pub use state::RunState;

pub const STARTER_HTML: &str = "<!DOCTYPE html>\n<html>\n<head>\n  <title>My Page</title>\n</head>\n<body>\n  <h1>Hello World!</h1>\n</body>\n</html>";
pub const STARTER_CSS: &str =
    "body {\n  font-family: Arial, sans-serif;\n  margin: 20px;\n}\n\nh1 {\n  color: #333;\n}";
pub const STARTER_JS: &str =
    "// Write your JavaScript here\nconsole.log(\"Hello from JavaScript!\");";

/// Something the session reacted to while waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The debounce timer fired and a run was started.
    AutoRun(RunResult),
    /// A runtime fault from the current realm.
    Fault(Diagnostic),
    Console(ConsoleLine),
    /// The current realm drained its script, microtasks and timers.
    Settled,
}

/// Result of [`EditorSession::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { score: u32, record: SubmissionRecord },
    /// Static analysis or the launch failed; nothing was scored.
    Blocked(Diagnostic),
    /// A runtime fault arrived while polling.
    Flagged(Diagnostic),
    /// The run was clean but the progress row could not be written.
    /// The session stays unsubmitted so the user can retry.
    PersistFailed { score: u32, error: String },
    AlreadySubmitted,
    NoChallenge,
}

/// Builder for [`EditorSession`].
pub struct EditorSessionBuilder {
    config: PlaygroundConfig,
    analyzer: Option<StaticAnalyzer>,
    executor: Option<Arc<dyn SandboxExecutor>>,
    catalog: Option<Catalog>,
    session_id: Option<String>,
    challenge: Option<Challenge>,
    source: Option<SourceBundle>,
    context: RuntimeContext,
}

impl EditorSessionBuilder {
    pub fn config(mut self, config: PlaygroundConfig) -> Self {
        self.config = config;
        self
    }

    pub fn analyzer(mut self, analyzer: StaticAnalyzer) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Override the realm executor (defaults to the bundled Boa executor).
    pub fn executor(mut self, executor: Arc<dyn SandboxExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Where submissions are recorded. Defaults to an in-memory store.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn challenge(mut self, challenge: Challenge) -> Self {
        self.challenge = Some(challenge);
        self
    }

    /// Initial code in place of the starter code.
    pub fn source(mut self, source: SourceBundle) -> Self {
        self.source = Some(source);
        self
    }

    /// Clock and id source used to generate a session id when none is given.
    pub fn runtime_context(mut self, context: RuntimeContext) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> PlaygroundResult<EditorSession> {
        let executor = match self.executor {
            Some(executor) => executor,
            None => default_executor(&self.config)?,
        };
        let analyzer = match self.analyzer {
            Some(analyzer) => analyzer,
            None => default_analyzer()?,
        };
        let catalog = self
            .catalog
            .unwrap_or_else(|| Catalog::new(Arc::new(MemoryDataService::new())));
        let session_id = self
            .session_id
            .unwrap_or_else(|| new_session_id(&self.context));
        let source = self
            .source
            .unwrap_or_else(|| starter_source(self.challenge.as_ref()));

        tracing::debug!(
            session_id = %session_id,
            challenge_id = ?self.challenge.as_ref().map(|c| c.id.as_str()),
            "Editor session created"
        );

        Ok(EditorSession {
            debounce: Debouncer::new(self.config.debounce_quiet),
            config: self.config,
            challenge: self.challenge,
            session_id,
            source,
            counters: AttemptCounters::default(),
            diagnostic: None,
            console: Vec::new(),
            state: RunState::Idle,
            submitted: false,
            last_score: None,
            analyzer,
            executor,
            channel: DiagnosticChannel::new(),
            realm: None,
            next_realm: 0,
            catalog,
        })
    }
}

#[cfg(feature = "builtin-sandbox-js")]
fn default_executor(config: &PlaygroundConfig) -> PlaygroundResult<Arc<dyn SandboxExecutor>> {
    Ok(Arc::new(learnhub_sandbox_js::BoaExecutor::new(
        config.sandbox.clone(),
    )))
}

#[cfg(not(feature = "builtin-sandbox-js"))]
fn default_executor(_config: &PlaygroundConfig) -> PlaygroundResult<Arc<dyn SandboxExecutor>> {
    Err(SandboxError::RealmUnavailable("no sandbox executor configured".into()).into())
}

#[cfg(feature = "builtin-sandbox-js")]
fn default_analyzer() -> PlaygroundResult<StaticAnalyzer> {
    Ok(StaticAnalyzer::default())
}

#[cfg(not(feature = "builtin-sandbox-js"))]
fn default_analyzer() -> PlaygroundResult<StaticAnalyzer> {
    Err(SandboxError::InternalError("no syntax checker configured".into()).into())
}

fn starter_source(challenge: Option<&Challenge>) -> SourceBundle {
    match challenge {
        Some(c) => SourceBundle::new(&c.starter_html, &c.starter_css, &c.starter_js),
        None => SourceBundle::new(STARTER_HTML, STARTER_CSS, STARTER_JS),
    }
}

/// Single-owner editing session. All mutation happens through `&mut self`,
/// so counters and the live diagnostic have exactly one writer.
pub struct EditorSession {
    config: PlaygroundConfig,
    challenge: Option<Challenge>,
    session_id: String,
    source: SourceBundle,
    counters: AttemptCounters,
    diagnostic: Option<Diagnostic>,
    console: Vec<ConsoleLine>,
    state: RunState,
    submitted: bool,
    last_score: Option<u32>,
    analyzer: StaticAnalyzer,
    executor: Arc<dyn SandboxExecutor>,
    channel: DiagnosticChannel,
    realm: Option<RealmHandle>,
    next_realm: u64,
    debounce: Debouncer,
    catalog: Catalog,
}

impl EditorSession {
    pub fn builder() -> EditorSessionBuilder {
        EditorSessionBuilder {
            config: PlaygroundConfig::default(),
            analyzer: None,
            executor: None,
            catalog: None,
            session_id: None,
            challenge: None,
            source: None,
            context: RuntimeContext::default(),
        }
    }

    // ================================
    // Editing
    // ================================

    /// Replaces one field. A change (re)starts the debounce timer.
    pub fn edit(&mut self, field: SourceField, text: impl Into<String>) -> bool {
        let changed = self.source.set(field, text);
        if changed {
            self.debounce.schedule();
        }
        changed
    }

    /// Restores the starter code and clears the output. Counters are kept.
    pub fn reset_code(&mut self) {
        self.source = starter_source(self.challenge.as_ref());
        self.retire_realm();
        self.diagnostic = None;
        self.console.clear();
        self.state = RunState::Idle;
        self.debounce.schedule();
    }

    /// Starts over on a challenge (or free play): new starter code, zeroed
    /// counters and a fresh submission allowance.
    pub fn load_challenge(&mut self, challenge: Option<Challenge>) {
        tracing::info!(
            session_id = %self.session_id,
            challenge_id = ?challenge.as_ref().map(|c| c.id.as_str()),
            "Loading challenge"
        );
        self.challenge = challenge;
        self.source = starter_source(self.challenge.as_ref());
        self.retire_realm();
        self.counters = AttemptCounters::default();
        self.diagnostic = None;
        self.console.clear();
        self.state = RunState::Idle;
        self.submitted = false;
        self.last_score = None;
        self.debounce.schedule();
    }

    // ================================
    // Running
    // ================================

    /// Validates the current source and, when clean, launches a new realm in
    /// place of the previous one. Runtime faults arrive later through
    /// [`next_event`](Self::next_event) or [`pump`](Self::pump).
    pub fn run(&mut self) -> RunResult {
        self.counters.record_run();
        self.retire_realm();
        self.diagnostic = None;
        self.console.clear();
        self.state = RunState::Validating;

        if let Some(finding) = self.analyzer.analyze(&self.source).into_first() {
            self.counters.record_mistakes(1);
            tracing::warn!(
                session_id = %self.session_id,
                run = self.counters.run_count,
                message = %finding.message,
                "Run blocked by static analysis"
            );
            self.state = RunState::BlockedBySyntax;
            self.diagnostic = Some(finding.clone());
            return RunResult::blocked(finding);
        }

        self.next_realm += 1;
        let realm_id = RealmId(self.next_realm);
        match self
            .executor
            .launch(realm_id, &self.source, self.channel.outbox())
        {
            Ok(handle) => {
                self.channel.attach(realm_id, handle.line_map());
                self.realm = Some(handle);
                self.state = RunState::Executing;
                tracing::debug!(
                    session_id = %self.session_id,
                    realm_id = %realm_id,
                    run = self.counters.run_count,
                    "Realm launched"
                );
                RunResult::clean()
            }
            Err(e) => self.unavailable(e),
        }
    }

    fn unavailable(&mut self, error: SandboxError) -> RunResult {
        tracing::error!(session_id = %self.session_id, error = %error, "Realm launch failed");
        let diagnostic = Diagnostic::unavailable(error.to_string());
        self.state = RunState::Unavailable;
        self.diagnostic = Some(diagnostic.clone());
        RunResult::blocked(diagnostic)
    }

    /// Cancels the current realm and stops listening to it.
    fn retire_realm(&mut self) {
        self.channel.detach();
        if let Some(handle) = self.realm.take() {
            tracing::trace!(realm_id = %handle.id(), "Retiring realm");
        }
    }

    /// Waits for the debounce timer or the current realm, whichever comes
    /// first, and applies the result.
    pub async fn next_event(&mut self) -> SessionEvent {
        enum Wake {
            Debounce,
            Channel(ChannelEvent),
        }

        let wake = tokio::select! {
            _ = self.debounce.elapsed() => Wake::Debounce,
            event = self.channel.recv() => Wake::Channel(event),
        };

        match wake {
            Wake::Debounce => {
                tracing::debug!(session_id = %self.session_id, "Quiet period elapsed");
                SessionEvent::AutoRun(self.run())
            }
            Wake::Channel(event) => self.apply(event),
        }
    }

    /// Applies every realm event already queued. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.channel.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: ChannelEvent) -> SessionEvent {
        match event {
            ChannelEvent::Fault(diagnostic) => {
                self.counters.record_mistakes(1);
                tracing::warn!(
                    session_id = %self.session_id,
                    message = %diagnostic.message,
                    line = ?diagnostic.line,
                    "Runtime fault"
                );
                if matches!(
                    self.state,
                    RunState::Executing | RunState::AwaitingRuntimeDiagnostic | RunState::Clean
                ) {
                    self.state = RunState::Flagged;
                }
                self.diagnostic = Some(diagnostic.clone());
                SessionEvent::Fault(diagnostic)
            }
            ChannelEvent::Console(line) => {
                self.console.push(line.clone());
                SessionEvent::Console(line)
            }
            ChannelEvent::Settled => {
                if matches!(
                    self.state,
                    RunState::Executing | RunState::AwaitingRuntimeDiagnostic
                ) {
                    self.state = RunState::Clean;
                }
                SessionEvent::Settled
            }
        }
    }

    // ================================
    // Submitting
    // ================================

    /// Runs the code once more, waits for runtime faults and, when clean,
    /// records a scored submission. At most one submission succeeds per
    /// challenge load.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let Some(challenge_id) = self.challenge.as_ref().map(|c| c.id.clone()) else {
            return SubmitOutcome::NoChallenge;
        };
        if self.submitted {
            return SubmitOutcome::AlreadySubmitted;
        }

        let result = self.run();
        if result.immediate_error_found {
            let diagnostic = result
                .diagnostic
                .unwrap_or_else(|| Diagnostic::unavailable("Run failed"));
            return SubmitOutcome::Blocked(diagnostic);
        }

        self.state = RunState::AwaitingRuntimeDiagnostic;
        if let Some(diagnostic) = self.await_runtime_diagnostic().await {
            tracing::info!(
                session_id = %self.session_id,
                challenge_id = %challenge_id,
                "Submission flagged by runtime fault"
            );
            return SubmitOutcome::Flagged(diagnostic);
        }
        self.state = RunState::Clean;

        let score = compute_score(self.counters.mistake_count, self.counters.run_count);
        let record = SubmissionRecord {
            session_id: self.session_id.clone(),
            challenge_id,
            html: self.source.html.clone(),
            css: self.source.css.clone(),
            js: self.source.js.clone(),
            completed: true,
            score,
            mistakes: self.counters.mistake_count,
            attempts: self.counters.run_count,
        };

        if let Err(e) = self.catalog.record_submission(&record).await {
            tracing::error!(
                session_id = %self.session_id,
                challenge_id = %record.challenge_id,
                error = %e,
                "Failed to record submission"
            );
            return SubmitOutcome::PersistFailed {
                score,
                error: e.to_string(),
            };
        }

        self.submitted = true;
        self.last_score = Some(score);
        tracing::info!(
            session_id = %self.session_id,
            challenge_id = %record.challenge_id,
            score,
            mistakes = record.mistakes,
            attempts = record.attempts,
            "Submission recorded"
        );
        SubmitOutcome::Submitted { score, record }
    }

    /// Polls the live diagnostic until a fault arrives, the realm settles or
    /// the poll timeout passes. Returns the fault, if any.
    async fn await_runtime_diagnostic(&mut self) -> Option<Diagnostic> {
        let deadline = Instant::now() + self.config.submit_poll_timeout;
        let mut ticker = tokio::time::interval(self.config.submit_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.pump();
            match self.state {
                RunState::Flagged => return self.diagnostic.clone(),
                RunState::Clean => return None,
                _ => {}
            }
            if Instant::now() >= deadline {
                return None;
            }
        }
    }

    // ================================
    // Accessors
    // ================================

    pub fn source(&self) -> &SourceBundle {
        &self.source
    }

    pub fn counters(&self) -> AttemptCounters {
        self.counters
    }

    /// The live diagnostic. Last writer wins.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    /// Byte range of the user's JavaScript to highlight for the live
    /// diagnostic, when it carries a location.
    pub fn diagnostic_span(&self) -> Option<std::ops::Range<usize>> {
        let diagnostic = self.diagnostic.as_ref()?;
        source_span(&self.source.js, diagnostic.line?, diagnostic.column.unwrap_or(1))
    }

    pub fn console(&self) -> &[ConsoleLine] {
        &self.console
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn last_score(&self) -> Option<u32> {
        self.last_score
    }

    /// The rendered document of the current realm.
    pub fn document(&self) -> Option<&str> {
        self.realm.as_ref().map(|r| r.document())
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_run_scheduled(&self) -> bool {
        self.debounce.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{DataService, Query, ServiceError};
    use async_trait::async_trait;
    use learnhub_types::{
        ChallengeCategory, DiagnosticKind, Envelope, Level, LineMap, RealmOutbox, RealmPayload,
        SyntaxChecker, SyntaxFailure,
    };
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Accepts everything except sources containing `!!`.
    struct MarkerChecker;

    impl SyntaxChecker for MarkerChecker {
        fn check(&self, source: &str) -> Result<(), SyntaxFailure> {
            if source.contains("!!") {
                Err(SyntaxFailure {
                    message: "Unexpected token '!!'".into(),
                    line: Some(1),
                    column: Some(1),
                })
            } else {
                Ok(())
            }
        }
    }

    /// Records launches and hands the outbox back to the test.
    #[derive(Default)]
    struct FakeExecutor {
        launches: Mutex<Vec<(RealmId, RealmOutbox)>>,
        settle: bool,
        fail: bool,
    }

    impl FakeExecutor {
        fn settling() -> Self {
            Self {
                settle: true,
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn launch_count(&self) -> usize {
            self.launches.lock().unwrap().len()
        }

        fn last(&self) -> (RealmId, RealmOutbox) {
            self.launches.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl SandboxExecutor for FakeExecutor {
        fn launch(
            &self,
            realm_id: RealmId,
            bundle: &SourceBundle,
            outbox: RealmOutbox,
        ) -> Result<RealmHandle, SandboxError> {
            if self.fail {
                return Err(SandboxError::RealmUnavailable("thread limit".into()));
            }
            if self.settle {
                outbox
                    .send(Envelope {
                        source: realm_id,
                        payload: RealmPayload::Settled,
                    })
                    .unwrap();
            }
            self.launches.lock().unwrap().push((realm_id, outbox));
            let line_map = LineMap {
                script_offset: 0,
                document_offset: 0,
                user_lines: bundle.js.lines().count() as u32,
            };
            Ok(RealmHandle::new(realm_id, "<html></html>".into(), line_map))
        }
    }

    struct FailingData;

    #[async_trait]
    impl DataService for FailingData {
        async fn select(&self, _query: &Query) -> Result<Vec<Value>, ServiceError> {
            Ok(Vec::new())
        }

        async fn insert(&self, _collection: &str, _rows: Vec<Value>) -> Result<(), ServiceError> {
            Err(ServiceError::Network("connection refused".into()))
        }
    }

    fn challenge() -> Challenge {
        Challenge {
            id: "c1".into(),
            title: "Hello".into(),
            description: String::new(),
            level: Level::Beginner,
            category: ChallengeCategory::Html,
            starter_html: "<p>start</p>".into(),
            starter_css: String::new(),
            starter_js: String::new(),
            reference_image_url: String::new(),
            order_index: 1,
        }
    }

    fn session(executor: Arc<FakeExecutor>) -> EditorSession {
        EditorSession::builder()
            .analyzer(StaticAnalyzer::new(Arc::new(MarkerChecker)))
            .executor(executor)
            .session_id("session_1_abc")
            .challenge(challenge())
            .build()
            .unwrap()
    }

    fn fault(source: RealmId, message: &str) -> Envelope {
        Envelope {
            source,
            payload: RealmPayload::Post(
                json!({ "type": "playground_error", "message": message, "stack": "" }),
            ),
        }
    }

    #[test]
    fn test_starter_code() {
        let executor = Arc::new(FakeExecutor::default());
        let s = EditorSession::builder()
            .analyzer(StaticAnalyzer::new(Arc::new(MarkerChecker)))
            .executor(executor)
            .build()
            .unwrap();
        assert_eq!(s.source().html, STARTER_HTML);
        assert_eq!(s.source().js, STARTER_JS);
        assert!(s.session_id().starts_with("session_"));
        assert_eq!(s.state(), RunState::Idle);
    }

    #[test]
    fn test_initial_source_does_not_schedule_run() {
        let executor = Arc::new(FakeExecutor::default());
        let s = EditorSession::builder()
            .analyzer(StaticAnalyzer::new(Arc::new(MarkerChecker)))
            .executor(executor)
            .source(SourceBundle::new("<p>x</p>", "", "let x = 1;"))
            .build()
            .unwrap();
        assert_eq!(s.source().js, "let x = 1;");
        assert!(!s.is_run_scheduled());
    }

    #[test]
    fn test_static_failure_blocks_launch_and_counts_once() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor.clone());
        s.edit(SourceField::Html, "<div><span></div>");
        s.edit(SourceField::Js, "!!");

        let result = s.run();
        assert!(result.immediate_error_found);
        assert_eq!(
            result.diagnostic.unwrap().message,
            crate::analyzer::HTML_MISMATCH
        );
        assert_eq!(s.state(), RunState::BlockedBySyntax);
        assert_eq!(s.counters().run_count, 1);
        assert_eq!(s.counters().mistake_count, 1);
        assert_eq!(executor.launch_count(), 0);
        assert!(s.document().is_none());
    }

    #[test]
    fn test_stale_and_foreign_messages_are_ignored() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor.clone());

        assert!(!s.run().immediate_error_found);
        let (first, outbox) = executor.last();
        assert!(!s.run().immediate_error_found);
        let (second, _) = executor.last();
        assert_ne!(first, second);

        outbox.send(fault(first, "old")).unwrap();
        outbox.send(fault(RealmId(99), "spoof")).unwrap();
        assert_eq!(s.pump(), 0);
        assert_eq!(s.counters().mistake_count, 0);
        assert!(s.diagnostic().is_none());
        assert_eq!(s.state(), RunState::Executing);

        outbox.send(fault(second, "current")).unwrap();
        assert_eq!(s.pump(), 1);
        assert_eq!(s.counters().mistake_count, 1);
        assert_eq!(s.diagnostic().unwrap().message, "current");
        assert_eq!(s.state(), RunState::Flagged);
    }

    #[test]
    fn test_each_runtime_message_counts() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor.clone());
        s.run();
        let (id, outbox) = executor.last();
        outbox.send(fault(id, "one")).unwrap();
        outbox.send(fault(id, "two")).unwrap();
        s.pump();
        assert_eq!(s.counters().mistake_count, 2);
        assert_eq!(s.diagnostic().unwrap().message, "two");
    }

    #[test]
    fn test_launch_failure_is_unavailable_without_mistake() {
        let executor = Arc::new(FakeExecutor::failing());
        let mut s = session(executor);
        let result = s.run();
        assert!(result.immediate_error_found);
        assert_eq!(s.state(), RunState::Unavailable);
        assert_eq!(s.diagnostic().unwrap().kind, DiagnosticKind::Unavailable);
        assert_eq!(s.counters().mistake_count, 0);
        assert_eq!(s.counters().run_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_records_once() {
        let executor = Arc::new(FakeExecutor::settling());
        let data = Arc::new(MemoryDataService::new());
        let mut s = EditorSession::builder()
            .analyzer(StaticAnalyzer::new(Arc::new(MarkerChecker)))
            .executor(executor)
            .catalog(Catalog::new(data.clone()))
            .session_id("session_1_abc")
            .challenge(challenge())
            .build()
            .unwrap();

        match s.submit().await {
            SubmitOutcome::Submitted { score, record } => {
                assert_eq!(score, 100);
                assert_eq!(record.attempts, 1);
                assert_eq!(record.html, "<p>start</p>");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(s.is_submitted());
        assert_eq!(s.last_score(), Some(100));
        assert_eq!(s.submit().await, SubmitOutcome::AlreadySubmitted);
        assert_eq!(data.rows(crate::service::catalog::USER_PROGRESS).await.len(), 1);
        assert_eq!(s.counters().run_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_without_settle_waits_for_timeout() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor);
        let start = Instant::now();
        assert!(matches!(s.submit().await, SubmitOutcome::Submitted { .. }));
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(2000), "{:?}", waited);
        assert!(waited < Duration::from_millis(2100), "{:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_during_poll_flags_submission() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor.clone());

        let outbox = s.channel.outbox();
        let next = RealmId(s.next_realm + 1);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            outbox.send(fault(next, "boom")).unwrap();
        });

        match s.submit().await {
            SubmitOutcome::Flagged(d) => assert_eq!(d.message, "boom"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(s.state(), RunState::Flagged);
        assert!(!s.is_submitted());
        assert_eq!(s.counters().mistake_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persist_failure_allows_retry() {
        let executor = Arc::new(FakeExecutor::settling());
        let mut s = EditorSession::builder()
            .analyzer(StaticAnalyzer::new(Arc::new(MarkerChecker)))
            .executor(executor)
            .catalog(Catalog::new(Arc::new(FailingData)))
            .challenge(challenge())
            .build()
            .unwrap();

        match s.submit().await {
            SubmitOutcome::PersistFailed { score, error } => {
                assert_eq!(score, 100);
                assert!(error.contains("connection refused"), "{}", error);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!s.is_submitted());
        assert!(matches!(
            s.submit().await,
            SubmitOutcome::PersistFailed { .. }
        ));
        assert_eq!(s.counters().run_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_needs_challenge_and_clean_code() {
        let executor = Arc::new(FakeExecutor::settling());
        let mut s = session(executor.clone());
        s.load_challenge(None);
        assert_eq!(s.submit().await, SubmitOutcome::NoChallenge);
        assert_eq!(s.counters().run_count, 0);

        s.load_challenge(Some(challenge()));
        s.edit(SourceField::Css, "p {");
        match s.submit().await {
            SubmitOutcome::Blocked(d) => assert_eq!(d.message, crate::analyzer::CSS_MISMATCH),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(executor.launch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_coalesce_into_one_auto_run() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor.clone());
        let start = Instant::now();

        s.edit(SourceField::Js, "let a");
        tokio::time::advance(Duration::from_millis(400)).await;
        s.edit(SourceField::Js, "let a =");
        tokio::time::advance(Duration::from_millis(400)).await;
        s.edit(SourceField::Js, "let a = 1;");

        match s.next_event().await {
            SessionEvent::AutoRun(result) => assert!(!result.immediate_error_found),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(1800));
        assert_eq!(executor.launch_count(), 1);
        assert_eq!(s.counters().run_count, 1);
        assert!(!s.is_run_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_run_does_not_touch_debounce() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor.clone());
        let start = Instant::now();

        s.edit(SourceField::Js, "let a = 1;");
        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(!s.run().immediate_error_found);
        assert!(s.is_run_scheduled());

        match s.next_event().await {
            SessionEvent::AutoRun(result) => assert!(!result.immediate_error_found),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        assert_eq!(s.counters().run_count, 2);
        assert_eq!(executor.launch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_reports_html_before_css() {
        let executor = Arc::new(FakeExecutor::settling());
        let mut s = session(executor.clone());
        s.edit(SourceField::Html, "<div>");
        s.edit(SourceField::Css, "p {");

        match s.submit().await {
            SubmitOutcome::Blocked(d) => assert_eq!(d.message, crate::analyzer::HTML_MISMATCH),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(s.counters().mistake_count, 1);
        assert_eq!(executor.launch_count(), 0);
        assert!(!s.is_submitted());
    }

    #[test]
    fn test_unchanged_edit_does_not_schedule() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor);
        assert!(!s.edit(SourceField::Html, "<p>start</p>"));
        assert!(!s.is_run_scheduled());
        assert!(s.edit(SourceField::Html, "<p>changed</p>"));
        assert!(s.is_run_scheduled());
    }

    #[tokio::test]
    async fn test_next_event_applies_console_and_settle() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor.clone());
        s.run();
        let (id, outbox) = executor.last();
        outbox
            .send(Envelope {
                source: id,
                payload: RealmPayload::Post(
                    json!({ "type": "playground_console", "level": "log", "message": "hi" }),
                ),
            })
            .unwrap();
        outbox
            .send(Envelope {
                source: id,
                payload: RealmPayload::Settled,
            })
            .unwrap();

        assert!(matches!(s.next_event().await, SessionEvent::Console(_)));
        assert_eq!(s.next_event().await, SessionEvent::Settled);
        assert_eq!(s.state(), RunState::Clean);
        assert_eq!(s.console()[0].message, "hi");
    }

    #[test]
    fn test_reset_keeps_counters_and_load_clears_them() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor);
        s.edit(SourceField::Js, "!!");
        s.run();
        assert!(s.diagnostic().is_some());

        s.reset_code();
        assert_eq!(s.source().html, "<p>start</p>");
        assert_eq!(s.source().js, "");
        assert!(s.diagnostic().is_none());
        assert_eq!(s.counters().mistake_count, 1);
        assert_eq!(s.state(), RunState::Idle);

        s.load_challenge(Some(challenge()));
        assert_eq!(s.counters(), AttemptCounters::default());
    }

    #[test]
    fn test_diagnostic_span_points_into_js() {
        let executor = Arc::new(FakeExecutor::default());
        let mut s = session(executor.clone());
        s.edit(SourceField::Js, "let a = 1;\nboom();");
        s.run();
        let (id, outbox) = executor.last();
        outbox
            .send(Envelope {
                source: id,
                payload: RealmPayload::Post(json!({
                    "type": "playground_error",
                    "message": "boom is not defined",
                    "stack": "at line 2, col 1"
                })),
            })
            .unwrap();
        s.pump();
        assert_eq!(s.diagnostic().unwrap().line, Some(2));
        assert_eq!(s.diagnostic_span(), Some(11..18));
    }
}
