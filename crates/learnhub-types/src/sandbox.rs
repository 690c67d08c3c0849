//! Realm identity, the host/realm wire protocol and executor contracts.
//!
//! A realm is an isolated JavaScript execution context launched for one run.
//! It can only talk back to the host through a [`RealmOutbox`]; the realm
//! driver stamps every [`Envelope`] with the [`RealmId`] the host assigned
//! at launch, so realm code can never choose its own sender identity.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::source::SourceBundle;

// ================================
// Identity / Envelopes
// ================================

/// Host-assigned identity of one realm instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RealmId(pub u64);

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "realm-{}", self.0)
    }
}

/// What a realm driver can send to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum RealmPayload {
    /// Data passed to `parent.postMessage` by realm code.
    Post(Value),
    /// The driver ran the script, all microtasks and all timers.
    Settled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source: RealmId,
    pub payload: RealmPayload,
}

pub type RealmOutbox = mpsc::UnboundedSender<Envelope>;
pub type RealmInbox = mpsc::UnboundedReceiver<Envelope>;

pub fn realm_channel() -> (RealmOutbox, RealmInbox) {
    mpsc::unbounded_channel()
}

/// Message shapes the host understands. Anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlaygroundMessage {
    #[serde(rename = "playground_error")]
    Error {
        #[serde(default)]
        message: String,
        #[serde(default)]
        stack: String,
    },
    #[serde(rename = "playground_console")]
    Console {
        #[serde(default)]
        level: String,
        #[serde(default)]
        message: String,
    },
}

impl PlaygroundMessage {
    pub fn parse(data: &Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }
}

// ================================
// Line mapping
// ================================

/// Where the user's JavaScript sits inside the generated script and document.
///
/// Offsets count the lines that precede the first user line, so generated
/// line `offset + 1` is user line 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineMap {
    pub script_offset: u32,
    pub document_offset: u32,
    pub user_lines: u32,
}

impl LineMap {
    pub fn script_line(&self, generated: u32) -> Option<u32> {
        self.to_user(generated, self.script_offset)
    }

    pub fn document_line(&self, generated: u32) -> Option<u32> {
        self.to_user(generated, self.document_offset)
    }

    fn to_user(&self, generated: u32, offset: u32) -> Option<u32> {
        let line = generated.checked_sub(offset)?;
        (line >= 1 && line <= self.user_lines.max(1)).then_some(line)
    }
}

// ================================
// Handles
// ================================

/// Host-side handle of a launched realm. Dropping it cancels the realm.
#[derive(Debug)]
pub struct RealmHandle {
    id: RealmId,
    document: String,
    line_map: LineMap,
    cancel: Arc<AtomicBool>,
}

impl RealmHandle {
    pub fn new(id: RealmId, document: String, line_map: LineMap) -> Self {
        Self {
            id,
            document,
            line_map,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> RealmId {
        self.id
    }

    /// The rendered, self-contained HTML document.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn line_map(&self) -> LineMap {
        self.line_map
    }

    /// Flag polled by the realm driver between steps.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl Drop for RealmHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ================================
// Contracts
// ================================

/// Sandbox errors
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Code too large (max {max} bytes, got {actual} bytes)")]
    CodeTooLarge { max: usize, actual: usize },

    #[error("Realm unavailable: {0}")]
    RealmUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Launches isolated realms.
///
/// Implementations must run the document asynchronously and report back only
/// through `outbox`, stamping every envelope with `realm_id`.
pub trait SandboxExecutor: Send + Sync {
    fn launch(
        &self,
        realm_id: RealmId,
        bundle: &SourceBundle,
        outbox: RealmOutbox,
    ) -> Result<RealmHandle, SandboxError>;
}

/// A JavaScript parse failure, located in the user's source when possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFailure {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// Parses JavaScript as a function body without running it.
pub trait SyntaxChecker: Send + Sync {
    fn check(&self, source: &str) -> Result<(), SyntaxFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_error_message() {
        let msg = PlaygroundMessage::parse(&json!({
            "type": "playground_error",
            "message": "boom",
            "stack": "Error: boom"
        }));
        assert_eq!(
            msg,
            Some(PlaygroundMessage::Error {
                message: "boom".into(),
                stack: "Error: boom".into()
            })
        );
    }

    #[test]
    fn test_parse_ignores_unknown_shapes() {
        assert!(PlaygroundMessage::parse(&json!({ "type": "resize", "h": 10 })).is_none());
        assert!(PlaygroundMessage::parse(&json!("playground_error")).is_none());
        assert!(PlaygroundMessage::parse(&json!({ "message": "no type" })).is_none());
    }

    #[test]
    fn test_line_map_bounds() {
        let map = LineMap {
            script_offset: 10,
            document_offset: 20,
            user_lines: 3,
        };
        assert_eq!(map.script_line(11), Some(1));
        assert_eq!(map.script_line(13), Some(3));
        assert_eq!(map.script_line(14), None);
        assert_eq!(map.script_line(10), None);
        assert_eq!(map.script_line(2), None);
        assert_eq!(map.document_line(22), Some(2));
    }

    #[test]
    fn test_dropping_handle_cancels() {
        let handle = RealmHandle::new(RealmId(7), String::new(), LineMap::default());
        let flag = handle.cancel_flag();
        assert!(!flag.load(Ordering::SeqCst));
        drop(handle);
        assert!(flag.load(Ordering::SeqCst));
    }
}
