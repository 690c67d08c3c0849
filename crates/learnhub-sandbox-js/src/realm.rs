//! boa_engine realm executor.
//!
//! Every launch gets a fresh [`Context`] on its own named OS thread. The
//! driver evaluates the host environment and then the instrumented document
//! script. It drains microtasks and reports rejections nobody handled, then
//! fires timers on the virtual clock until none remain, the callback budget
//! runs out, or the host drops the [`RealmHandle`].
//!
//! boa cannot interrupt a script that is inside a single long evaluation, so
//! a retired realm may keep its thread until that evaluation ends. The
//! executor caps how many realm threads may be alive at once and refuses
//! further launches until one finishes.

use std::cell::RefCell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use boa_engine::builtins::promise::OperationType;
use boa_engine::context::HostHooks;
use boa_engine::{Context, JsError, JsObject, JsString, JsValue, Source};
use serde_json::{json, Value};

use learnhub_types::{
    Envelope, RealmHandle, RealmId, RealmOutbox, RealmPayload, SandboxError, SandboxExecutor,
    SourceBundle,
};

use crate::document::{self, SCRIPT_NAME};
use crate::host::{HOST_ENV, PENDING_GLOBAL};

const REALM_STACK_BYTES: usize = 8 * 1024 * 1024;
const MAX_SETTLE_ROUNDS: usize = 64;

/// Realm limits.
#[derive(Clone, Debug)]
pub struct RealmConfig {
    /// Max combined HTML + CSS + JS size (bytes)
    pub max_source_bytes: usize,

    /// Iterations any single loop may run before the realm aborts it
    pub max_loop_iterations: u64,

    /// Max JS call depth
    pub max_recursion_depth: usize,

    /// Timer and interval callbacks fired per run
    pub max_timer_callbacks: usize,

    /// Realm threads that may be alive at once, including retired realms
    /// still finishing a long evaluation
    pub max_live_realms: usize,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: 1_000_000, // 1MB
            max_loop_iterations: 10_000_000,
            max_recursion_depth: 512,
            max_timer_callbacks: 1_000,
            max_live_realms: 8,
        }
    }
}

/// [`SandboxExecutor`] backed by boa_engine.
#[derive(Clone, Debug, Default)]
pub struct BoaExecutor {
    config: RealmConfig,
    live: Arc<AtomicUsize>,
}

impl BoaExecutor {
    pub fn new(config: RealmConfig) -> Self {
        Self {
            config,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &RealmConfig {
        &self.config
    }

    /// Realm threads currently alive.
    pub fn live_realms(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn reserve_slot(&self) -> Result<LiveSlot, SandboxError> {
        let max = self.config.max_live_realms;
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .map_err(|n| {
                SandboxError::RealmUnavailable(format!(
                    "{} realms are still running (max {})",
                    n, max
                ))
            })?;
        Ok(LiveSlot(self.live.clone()))
    }
}

/// One reserved realm thread. Released on drop.
struct LiveSlot(Arc<AtomicUsize>);

impl Drop for LiveSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SandboxExecutor for BoaExecutor {
    fn launch(
        &self,
        realm_id: RealmId,
        bundle: &SourceBundle,
        outbox: RealmOutbox,
    ) -> Result<RealmHandle, SandboxError> {
        let size = bundle.len();
        if size > self.config.max_source_bytes {
            return Err(SandboxError::CodeTooLarge {
                max: self.config.max_source_bytes,
                actual: size,
            });
        }

        let slot = self.reserve_slot()?;
        let assembled = document::assemble(bundle);
        let handle = RealmHandle::new(realm_id, assembled.html, assembled.line_map);
        let cancel = handle.cancel_flag();
        let config = self.config.clone();
        let script = assembled.script;

        thread::Builder::new()
            .name(format!("playground-realm-{}", realm_id.0))
            .stack_size(REALM_STACK_BYTES)
            .spawn(move || match RealmDriver::start(realm_id, &config, outbox, cancel, slot) {
                Ok(driver) => driver.run(&script, config.max_timer_callbacks),
                Err(e) => tracing::error!(realm = %realm_id, error = %e, "Failed to build JS context"),
            })
            .map_err(|e| SandboxError::RealmUnavailable(e.to_string()))?;

        tracing::debug!(realm = %realm_id, bytes = size, live = self.live_realms(), "Realm launched");
        Ok(handle)
    }
}

thread_local! {
    /// Promises rejected with no handler attached. Each realm owns its
    /// thread, so this list is per realm.
    static PENDING_REJECTIONS: RefCell<Vec<JsObject>> = const { RefCell::new(Vec::new()) };
}

/// Host hooks shared by every realm; the state lives in
/// [`PENDING_REJECTIONS`] on the realm's own thread.
struct RejectionTracker;

static REJECTION_TRACKER: RejectionTracker = RejectionTracker;

impl RejectionTracker {
    fn take() -> Vec<JsObject> {
        PENDING_REJECTIONS.with(|pending| std::mem::take(&mut *pending.borrow_mut()))
    }
}

impl HostHooks for RejectionTracker {
    fn promise_rejection_tracker(
        &self,
        promise: &JsObject,
        operation: OperationType,
        _context: &mut Context,
    ) {
        PENDING_REJECTIONS.with(|pending| {
            let mut pending = pending.borrow_mut();
            match operation {
                OperationType::Reject => pending.push(promise.clone()),
                OperationType::Handle => pending.retain(|p| !JsObject::equals(p, promise)),
            }
        });
    }
}

struct RealmDriver {
    id: RealmId,
    context: Context,
    outbox: RealmOutbox,
    cancel: Arc<AtomicBool>,
    slot: Option<LiveSlot>,
}

impl RealmDriver {
    fn start(
        id: RealmId,
        config: &RealmConfig,
        outbox: RealmOutbox,
        cancel: Arc<AtomicBool>,
        slot: LiveSlot,
    ) -> Result<Self, JsError> {
        let mut context = Context::builder()
            .host_hooks(&REJECTION_TRACKER)
            .build()?;
        let limits = context.runtime_limits_mut();
        limits.set_loop_iteration_limit(config.max_loop_iterations);
        limits.set_recursion_limit(config.max_recursion_depth);

        Ok(Self {
            id,
            context,
            outbox,
            cancel,
            slot: Some(slot),
        })
    }

    fn run(mut self, script: &str, max_timer_callbacks: usize) {
        if let Err(e) = self.context.eval(Source::from_bytes(HOST_ENV)) {
            let message = format!("Playground host failed to start: {}", e);
            self.post_fault(&message, "");
            self.finish();
            return;
        }

        let source = Source::from_bytes(script.as_bytes()).with_path(Path::new(SCRIPT_NAME));
        if let Err(e) = self.context.eval(source) {
            // Either the script never parsed, so no listener is installed, or
            // a runtime limit cut through the guard. Report straight to the host.
            self.flush();
            let message = e.to_string();
            self.post_fault(&message, &message);
        }
        self.settle();

        let mut fired = 0;
        while fired < max_timer_callbacks {
            if self.is_cancelled() {
                tracing::debug!(realm = %self.id, "Realm cancelled");
                return;
            }
            match self.context.eval(Source::from_bytes("__playground_host__.runNextTimer()")) {
                Ok(ran) if ran.as_boolean() == Some(true) => {}
                Ok(_) => break,
                Err(e) => {
                    self.report_error(e);
                }
            }
            fired += 1;
            self.settle();
        }
        if fired >= max_timer_callbacks {
            tracing::debug!(realm = %self.id, fired, "Timer budget exhausted");
        }

        self.finish();
    }

    /// Runs pending jobs, reports unhandled rejections and flushes the outbox.
    fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            if self.is_cancelled() {
                return;
            }
            // A job that throws rejects its derived promise, which is
            // reported below with the other unhandled rejections.
            self.context.run_jobs();
            let rejected = RejectionTracker::take();
            if rejected.is_empty() {
                break;
            }
            for promise in rejected {
                self.call_host("reportRejection", JsValue::from(promise));
            }
        }
        self.flush();
    }

    fn report_error(&mut self, error: JsError) {
        let value = match error.as_opaque() {
            Some(value) => value.clone(),
            None => JsValue::from(JsString::from(error.to_string().as_str())),
        };
        self.call_host("reportError", value);
    }

    fn call_host(&mut self, function: &str, argument: JsValue) {
        let global = self.context.global_object();
        if let Err(e) = global.set(JsString::from(PENDING_GLOBAL), argument, false, &mut self.context) {
            tracing::warn!(realm = %self.id, error = %e, "Failed to stage host argument");
            return;
        }
        let call = format!("__playground_host__.{}({})", function, PENDING_GLOBAL);
        if let Err(e) = self.context.eval(Source::from_bytes(&call)) {
            tracing::warn!(realm = %self.id, function, error = %e, "Host call failed");
        }
    }

    fn flush(&mut self) {
        let drained = match eval_js_to_string(&mut self.context, "__playground_host__.drainOutbox()") {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(realm = %self.id, error = %e, "Failed to drain realm outbox");
                return;
            }
        };
        match serde_json::from_str::<Vec<Value>>(&drained) {
            Ok(messages) => {
                for message in messages {
                    self.send(RealmPayload::Post(message));
                }
            }
            Err(e) => tracing::warn!(realm = %self.id, error = %e, "Malformed realm outbox"),
        }
    }

    fn post_fault(&self, message: &str, stack: &str) {
        self.send(RealmPayload::Post(json!({
            "type": "playground_error",
            "message": message,
            "stack": stack
        })));
    }

    /// Frees the thread slot, then tells the host the realm is done.
    fn finish(&mut self) {
        self.slot.take();
        if !self.is_cancelled() {
            self.send(RealmPayload::Settled);
        }
    }

    fn send(&self, payload: RealmPayload) {
        if self.is_cancelled() {
            return;
        }
        let _ = self.outbox.send(Envelope {
            source: self.id,
            payload,
        });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

impl Drop for RealmDriver {
    fn drop(&mut self) {
        // The promises belong to this context; release them before it goes.
        RejectionTracker::take();
    }
}

fn eval_js_to_string(context: &mut Context, code: &str) -> Result<String, String> {
    let result = context
        .eval(Source::from_bytes(code))
        .map_err(|e| format!("JS eval error: {}", e))?;
    result
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| "JS result is not string".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnhub_types::{realm_channel, PlaygroundMessage, RealmInbox};
    use std::time::Duration;

    async fn collect(inbox: &mut RealmInbox) -> Vec<Envelope> {
        let mut envelopes = Vec::new();
        loop {
            let next = tokio::time::timeout(Duration::from_secs(10), inbox.recv())
                .await
                .expect("realm did not settle in time")
                .expect("realm outbox closed");
            let settled = next.payload == RealmPayload::Settled;
            envelopes.push(next);
            if settled {
                return envelopes;
            }
        }
    }

    async fn run_js(config: RealmConfig, js: &str) -> Vec<PlaygroundMessage> {
        let executor = BoaExecutor::new(config);
        let (outbox, mut inbox) = realm_channel();
        let _handle = executor
            .launch(RealmId(1), &SourceBundle::new("<p></p>", "", js), outbox)
            .unwrap();
        collect(&mut inbox)
            .await
            .into_iter()
            .filter_map(|e| match e.payload {
                RealmPayload::Post(data) => PlaygroundMessage::parse(&data),
                RealmPayload::Settled => None,
            })
            .collect()
    }

    fn errors(messages: &[PlaygroundMessage]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| match m {
                PlaygroundMessage::Error { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn console(messages: &[PlaygroundMessage]) -> Vec<(String, String)> {
        messages
            .iter()
            .filter_map(|m| match m {
                PlaygroundMessage::Console { level, message } => Some((level.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_clean_script_settles_without_errors() {
        let messages = run_js(RealmConfig::default(), "var total = 1 + 2;").await;
        assert!(errors(&messages).is_empty());
    }

    #[tokio::test]
    async fn test_thrown_error_is_reported() {
        let messages = run_js(RealmConfig::default(), "throw new Error(\"boom\");").await;
        assert_eq!(errors(&messages), vec!["boom".to_string()]);
    }

    #[tokio::test]
    async fn test_unhandled_rejection_is_reported() {
        let messages = run_js(
            RealmConfig::default(),
            "Promise.reject(new Error(\"nope\"));",
        )
        .await;
        assert_eq!(errors(&messages), vec!["nope".to_string()]);
    }

    #[tokio::test]
    async fn test_handled_rejection_is_quiet() {
        let messages = run_js(
            RealmConfig::default(),
            "Promise.reject(new Error(\"nope\")).catch(function () {});",
        )
        .await;
        assert!(errors(&messages).is_empty());
    }

    #[tokio::test]
    async fn test_timer_error_is_reported() {
        let messages = run_js(
            RealmConfig::default(),
            "setTimeout(function () { throw new Error(\"later\"); }, 50);",
        )
        .await;
        assert_eq!(errors(&messages), vec!["later".to_string()]);
    }

    #[tokio::test]
    async fn test_console_and_load_listeners() {
        let messages = run_js(
            RealmConfig::default(),
            "console.log(\"hi\", 1);\nwindow.addEventListener(\"load\", function () { console.info(\"loaded\"); });",
        )
        .await;
        assert_eq!(
            console(&messages),
            vec![
                ("log".to_string(), "hi 1".to_string()),
                ("info".to_string(), "loaded".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_console_error_is_a_fault() {
        let messages = run_js(RealmConfig::default(), "console.error(\"bad\");").await;
        assert_eq!(errors(&messages), vec!["bad".to_string()]);
    }

    #[tokio::test]
    async fn test_interval_stops_at_timer_budget() {
        let config = RealmConfig {
            max_timer_callbacks: 5,
            ..RealmConfig::default()
        };
        let messages = run_js(config, "setInterval(function () { console.log(\"tick\"); }, 10);").await;
        let ticks = console(&messages).len();
        assert!(ticks >= 1 && ticks <= 5, "ticks = {}", ticks);
    }

    #[tokio::test]
    async fn test_runaway_loop_is_stopped() {
        let config = RealmConfig {
            max_loop_iterations: 10_000,
            ..RealmConfig::default()
        };
        let messages = run_js(config, "while (true) {}").await;
        assert_eq!(errors(&messages).len(), 1);
    }

    #[tokio::test]
    async fn test_throwing_reaction_is_reported() {
        let messages = run_js(
            RealmConfig::default(),
            "Promise.resolve().then(function () { throw new Error(\"in job\"); });",
        )
        .await;
        assert_eq!(errors(&messages), vec!["in job".to_string()]);
    }

    #[tokio::test]
    async fn test_unparseable_script_is_reported() {
        let messages = run_js(RealmConfig::default(), "function( {").await;
        assert_eq!(errors(&messages).len(), 1);
    }

    #[tokio::test]
    async fn test_top_level_return_ends_script() {
        let messages = run_js(
            RealmConfig::default(),
            "console.log(\"before\");\nreturn;\nthrow new Error(\"unreached\");",
        )
        .await;
        assert!(errors(&messages).is_empty());
        assert_eq!(console(&messages), vec![("log".to_string(), "before".to_string())]);
    }

    #[tokio::test]
    async fn test_rejections_stay_in_their_realm() {
        let executor = BoaExecutor::default();
        let (failing_outbox, mut failing_inbox) = realm_channel();
        let (clean_outbox, mut clean_inbox) = realm_channel();
        let _failing = executor
            .launch(
                RealmId(1),
                &SourceBundle::new("", "", "Promise.reject(new Error(\"a\"));"),
                failing_outbox,
            )
            .unwrap();
        let _clean = executor
            .launch(RealmId(2), &SourceBundle::new("", "", "var x = 1;"), clean_outbox)
            .unwrap();

        let failing = collect(&mut failing_inbox).await;
        let clean = collect(&mut clean_inbox).await;
        let messages = |envelopes: Vec<Envelope>| -> Vec<PlaygroundMessage> {
            envelopes
                .into_iter()
                .filter_map(|e| match e.payload {
                    RealmPayload::Post(data) => PlaygroundMessage::parse(&data),
                    RealmPayload::Settled => None,
                })
                .collect()
        };
        assert_eq!(errors(&messages(failing)), vec!["a".to_string()]);
        assert!(errors(&messages(clean)).is_empty());
    }

    #[tokio::test]
    async fn test_live_realm_cap_refuses_launches_until_one_finishes() {
        let executor = BoaExecutor::new(RealmConfig {
            max_live_realms: 1,
            ..RealmConfig::default()
        });
        let busy = SourceBundle::new(
            "",
            "",
            "for (var i = 0; i < 1000; i++) { for (var j = 0; j < 1000; j++) {} }",
        );

        let (outbox, mut inbox) = realm_channel();
        let _first = executor.launch(RealmId(1), &busy, outbox).unwrap();
        assert_eq!(executor.live_realms(), 1);

        let (outbox, _inbox) = realm_channel();
        let refused = executor.launch(RealmId(2), &busy, outbox);
        assert!(matches!(refused, Err(SandboxError::RealmUnavailable(_))));

        collect(&mut inbox).await;
        assert_eq!(executor.live_realms(), 0);

        let (outbox, mut inbox) = realm_channel();
        let _third = executor
            .launch(RealmId(3), &SourceBundle::new("", "", "var ok = 1;"), outbox)
            .unwrap();
        collect(&mut inbox).await;
    }

    #[tokio::test]
    async fn test_envelopes_carry_assigned_identity() {
        let executor = BoaExecutor::default();
        let (outbox, mut inbox) = realm_channel();
        let _handle = executor
            .launch(RealmId(42), &SourceBundle::new("", "", "console.log(1);"), outbox)
            .unwrap();
        let envelopes = collect(&mut inbox).await;
        assert!(envelopes.len() >= 2);
        assert!(envelopes.iter().all(|e| e.source == RealmId(42)));
    }

    #[test]
    fn test_code_too_large() {
        let executor = BoaExecutor::new(RealmConfig {
            max_source_bytes: 4,
            ..RealmConfig::default()
        });
        let (outbox, _inbox) = realm_channel();
        let result = executor.launch(RealmId(1), &SourceBundle::new("<p></p>", "", ""), outbox);
        assert!(matches!(
            result,
            Err(SandboxError::CodeTooLarge { max: 4, actual: 7 })
        ));
    }
}
