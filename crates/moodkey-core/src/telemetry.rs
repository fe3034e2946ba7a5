//! Outbound key-event telemetry.
//!
//! Every event is wrapped in an [`EventEnvelope`] addressed to the messenger
//! app and handed to an [`EventTransport`] on the `moodkey-telemetry`
//! thread, so a slow transport never stalls the key path. Delivery is
//! fire-and-forget and keeps report order.

use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::settings::TelemetrySettings;

pub mod kind {
    pub const KEY_PRESS: &str = "KEY_PRESS";
    pub const BACKSPACE_PRESS: &str = "BACKSPACE_PRESS";
    pub const WORD_SUGGESTION_CLICK: &str = "WORD_SUGGESTION_CLICK";
    pub const REPLY_OPTION_CLICK: &str = "REPLY_OPTION_CLICK";
    pub const EMOJI_SUGGESTION_CLICK: &str = "EMOJI_SUGGESTION_CLICK";
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("event data serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("transport rejected event: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// A character key, or the `SHIFT` / `SPACE` pseudo-characters.
    KeyPress(String),
    Backspace,
    WordSuggestion(String),
    ReplyOption(String),
    Emoji(String),
}

impl TelemetryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyPress(_) => kind::KEY_PRESS,
            Self::Backspace => kind::BACKSPACE_PRESS,
            Self::WordSuggestion(_) => kind::WORD_SUGGESTION_CLICK,
            Self::ReplyOption(_) => kind::REPLY_OPTION_CLICK,
            Self::Emoji(_) => kind::EMOJI_SUGGESTION_CLICK,
        }
    }

    /// JSON-encoded event data, `None` for events without a payload.
    pub fn data(&self) -> Result<Option<String>, TelemetryError> {
        let value = match self {
            Self::KeyPress(c) => json!({ "character": c }),
            Self::Backspace => return Ok(None),
            Self::WordSuggestion(s) => json!({ "suggestion_text": s }),
            Self::ReplyOption(r) => json!({ "reply_option": r }),
            Self::Emoji(e) => json!({ "emoji": e }),
        };
        Ok(Some(serde_json::to_string(&value)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventEnvelope {
    pub action: String,
    pub target_package: String,
    pub event_type: String,
    /// Unix epoch milliseconds.
    pub event_timestamp: i64,
    pub event_data: Option<String>,
}

/// Called from the delivery thread, never from the key path.
pub trait EventTransport: Send + Sync {
    fn send(&self, envelope: EventEnvelope) -> Result<(), TelemetryError>;
}

enum Outbound {
    Event(&'static str, EventEnvelope),
    Flush(mpsc::Sender<()>),
}

pub struct EventSink {
    settings: TelemetrySettings,
    outbound: Mutex<Option<mpsc::Sender<Outbound>>>,
}

impl EventSink {
    pub fn new(settings: TelemetrySettings, transport: Arc<dyn EventTransport>) -> Self {
        let (tx, rx) = mpsc::channel::<Outbound>();
        let spawned = thread::Builder::new()
            .name("moodkey-telemetry".into())
            .spawn(move || deliver(rx, transport.as_ref()));
        let outbound = match spawned {
            Ok(_) => Some(tx),
            Err(e) => {
                warn!(error = %e, "failed to spawn telemetry worker; events will be dropped");
                None
            }
        };
        Self {
            settings,
            outbound: Mutex::new(outbound),
        }
    }

    pub fn envelope(&self, event: &TelemetryEvent) -> Result<EventEnvelope, TelemetryError> {
        Ok(EventEnvelope {
            action: self.settings.action.clone(),
            target_package: self.settings.target_package.clone(),
            event_type: event.kind().to_string(),
            event_timestamp: now_millis(),
            event_data: event.data()?,
        })
    }

    /// Queue an event for delivery and return immediately. Failures are
    /// logged and dropped; there is no retry.
    pub fn report(&self, event: TelemetryEvent) {
        let envelope = match self.envelope(&event) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(kind = event.kind(), error = %e, "telemetry dropped");
                return;
            }
        };
        if !self.enqueue(Outbound::Event(event.kind(), envelope)) {
            warn!(kind = event.kind(), "telemetry worker gone");
        }
    }

    /// Wait until everything reported so far has been handed to the
    /// transport. Returns false on timeout.
    pub fn flush(&self, timeout: Duration) -> bool {
        let (done_tx, done_rx) = mpsc::channel();
        self.enqueue(Outbound::Flush(done_tx)) && done_rx.recv_timeout(timeout).is_ok()
    }

    fn enqueue(&self, item: Outbound) -> bool {
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        outbound.as_ref().is_some_and(|tx| tx.send(item).is_ok())
    }
}

fn deliver(rx: mpsc::Receiver<Outbound>, transport: &dyn EventTransport) {
    while let Ok(item) = rx.recv() {
        match item {
            Outbound::Event(kind, envelope) => match transport.send(envelope) {
                Ok(()) => debug!(kind, "telemetry sent"),
                Err(e) => warn!(kind, error = %e, "telemetry dropped"),
            },
            Outbound::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
