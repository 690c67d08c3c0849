//! Host side of the realm message channel.
//!
//! Every realm gets a clone of the same outbox. The channel only accepts
//! envelopes stamped with the realm currently attached; anything from a
//! superseded or foreign realm is dropped before it can touch the session.

pub mod stack;

use learnhub_types::{
    realm_channel, ConsoleLine, Diagnostic, Envelope, LineMap, PlaygroundMessage, RealmId,
    RealmInbox, RealmOutbox, RealmPayload,
};

pub use stack::{locate, source_span};

/// What an accepted envelope means to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Fault(Diagnostic),
    Console(ConsoleLine),
    /// The realm finished its script, microtasks and timers.
    Settled,
}

pub struct DiagnosticChannel {
    outbox: RealmOutbox,
    inbox: RealmInbox,
    current: Option<RealmId>,
    line_map: LineMap,
}

impl Default for DiagnosticChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticChannel {
    pub fn new() -> Self {
        let (outbox, inbox) = realm_channel();
        Self {
            outbox,
            inbox,
            current: None,
            line_map: LineMap::default(),
        }
    }

    /// Sender handed to each launched realm.
    pub fn outbox(&self) -> RealmOutbox {
        self.outbox.clone()
    }

    pub fn attach(&mut self, realm: RealmId, line_map: LineMap) {
        tracing::debug!(realm_id = %realm, "Attached realm");
        self.current = Some(realm);
        self.line_map = line_map;
    }

    /// Stops accepting messages from any realm.
    pub fn detach(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<RealmId> {
        self.current
    }

    /// Waits for the next accepted event. Cancel safe.
    pub async fn recv(&mut self) -> ChannelEvent {
        loop {
            // The channel owns a sender, so the inbox never closes.
            let Some(envelope) = self.inbox.recv().await else {
                return std::future::pending().await;
            };
            if let Some(event) = self.accept(envelope) {
                return event;
            }
        }
    }

    /// Next accepted event already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        while let Ok(envelope) = self.inbox.try_recv() {
            if let Some(event) = self.accept(envelope) {
                return Some(event);
            }
        }
        None
    }

    /// Applies the sender identity filter and decodes the payload.
    pub fn accept(&self, envelope: Envelope) -> Option<ChannelEvent> {
        if self.current != Some(envelope.source) {
            tracing::trace!(
                realm_id = %envelope.source,
                current = ?self.current,
                "Dropping message from stale realm"
            );
            return None;
        }

        let data = match envelope.payload {
            RealmPayload::Settled => return Some(ChannelEvent::Settled),
            RealmPayload::Post(data) => data,
        };

        match PlaygroundMessage::parse(&data) {
            Some(PlaygroundMessage::Error { message, stack }) => {
                let (line, column) = match locate(&stack, &self.line_map) {
                    Some((line, column)) => (Some(line), Some(column)),
                    None => (None, None),
                };
                let message = if message.is_empty() {
                    "Unknown runtime error".to_string()
                } else {
                    message
                };
                Some(ChannelEvent::Fault(
                    Diagnostic::runtime(message, Some(stack)).with_location(line, column),
                ))
            }
            Some(PlaygroundMessage::Console { level, message }) => {
                Some(ChannelEvent::Console(ConsoleLine { level, message }))
            }
            None => {
                tracing::trace!(realm_id = %envelope.source, "Ignoring unrecognised message");
                None
            }
        }
    }
}
