//! Stateful keyboard session: typed text, suggestion lists and the
//! tone-rewrite panel.
//!
//! `InputSession` owns all session state and is driven from a single
//! sequence: key events, external notifications, generation results and
//! debounce polls. Every call returns a [`KeyResponse`] describing what
//! changed. Background work is never started here; it is requested through
//! [`AsyncGenerationRequest`] and its results are fed back in.

mod assist;
mod connection;
pub mod debounce;
mod ingest;
mod key_handlers;
mod lifecycle;
mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use moodkey_core::dict::DictionaryIndex;
use moodkey_core::emoji;
use moodkey_core::emotion::Emotion;
use moodkey_core::payload::MessagesWithEmotion;
use moodkey_core::telemetry::{EventSink, TelemetryEvent};
use tracing::debug;

pub use connection::InputConnection;
pub use debounce::{Clock, Debouncer, ManualClock, SystemClock};
pub use types::{
    AssistView, AsyncGenerationRequest, GenerationKind, KeyEvent, KeyResponse, SessionConfig,
    SessionState,
};

use assist::AssistState;
use types::Snapshot;

pub struct InputSession {
    dict: Arc<DictionaryIndex>,
    telemetry: Option<Arc<EventSink>>,
    config: SessionConfig,
    clock: Box<dyn Clock>,

    state: SessionState,
    typed_text: String,
    shift: bool,
    emotion: Emotion,
    word_suggestions: Vec<String>,
    emoji_suggestions: Vec<String>,
    reply_options: Vec<String>,
    /// Last non-empty reply-option list of this input session.
    cached_reply_options: Vec<String>,
    emoji_debounce: Debouncer<String>,

    assist: AssistState,
    last_messages: Option<MessagesWithEmotion>,
    reply_generation: u64,
}

impl InputSession {
    pub fn new(dict: Arc<DictionaryIndex>, config: SessionConfig) -> Self {
        Self::with_clock(dict, config, Box::new(SystemClock))
    }

    pub fn with_clock(dict: Arc<DictionaryIndex>, config: SessionConfig, clock: Box<dyn Clock>) -> Self {
        let window = Duration::from_millis(config.emoji_debounce_ms);
        Self {
            dict,
            telemetry: None,
            config,
            clock,
            state: SessionState::Idle,
            typed_text: String::new(),
            shift: false,
            emotion: Emotion::Neutral,
            word_suggestions: Vec::new(),
            emoji_suggestions: Vec::new(),
            reply_options: Vec::new(),
            cached_reply_options: Vec::new(),
            emoji_debounce: Debouncer::new(window),
            assist: AssistState::default(),
            last_messages: None,
            reply_generation: 0,
        }
    }

    pub fn set_telemetry(&mut self, sink: Option<Arc<EventSink>>) {
        self.telemetry = sink;
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn typed_text(&self) -> &str {
        &self.typed_text
    }

    pub fn is_shift_enabled(&self) -> bool {
        self.shift
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    pub fn word_suggestions(&self) -> &[String] {
        &self.word_suggestions
    }

    pub fn emoji_suggestions(&self) -> &[String] {
        &self.emoji_suggestions
    }

    pub fn reply_options(&self) -> &[String] {
        &self.reply_options
    }

    pub fn cached_reply_options(&self) -> &[String] {
        &self.cached_reply_options
    }

    pub fn last_messages(&self) -> Option<&MessagesWithEmotion> {
        self.last_messages.as_ref()
    }

    /// When the host should call [`poll`](Self::poll) next, if at all.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.emoji_debounce.next_deadline()
    }

    /// Fire the debounced emoji recompute if its window has elapsed.
    pub fn poll(&mut self) -> Option<KeyResponse> {
        let now = self.clock.now();
        self.emoji_debounce.poll(now)?;
        let before = self.snapshot();
        self.refresh_emoji();
        debug!(emotion = %self.emotion, "emoji suggestions recomputed");
        Some(self.respond(&before, true))
    }

    // -- internal helpers ------------------------------------------------

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            typed_text: self.typed_text.clone(),
            shift: self.shift,
            emotion: self.emotion,
            word_suggestions: self.word_suggestions.clone(),
            emoji_suggestions: self.emoji_suggestions.clone(),
            reply_options: self.reply_options.clone(),
            assist: self.assist.view(),
        }
    }

    /// Build a response carrying every presented field that differs from `before`.
    pub(crate) fn respond(&self, before: &Snapshot, consumed: bool) -> KeyResponse {
        fn changed<T: Clone + PartialEq>(old: &T, new: &T) -> Option<T> {
            (old != new).then(|| new.clone())
        }
        KeyResponse {
            consumed,
            typed_text: changed(&before.typed_text, &self.typed_text),
            shift: changed(&before.shift, &self.shift),
            emotion: changed(&before.emotion, &self.emotion),
            word_suggestions: changed(&before.word_suggestions, &self.word_suggestions),
            emoji_suggestions: changed(&before.emoji_suggestions, &self.emoji_suggestions),
            reply_options: changed(&before.reply_options, &self.reply_options),
            assist: changed(&before.assist, &self.assist.view()),
            generation_request: None,
            cancel_rewrite: false,
        }
    }

    /// Word suggestions keyed on the last non-empty whitespace-delimited token.
    pub(crate) fn recompute_word_suggestions(&mut self) {
        if !self.config.word_suggestions {
            self.word_suggestions.clear();
            return;
        }
        self.word_suggestions = match self.typed_text.split_whitespace().next_back() {
            Some(word) => self.dict.suggest(word, self.config.word_limit),
            None => Vec::new(),
        };
    }

    pub(crate) fn refresh_emoji(&mut self) {
        self.emoji_suggestions = emoji::for_emotion(self.emotion);
    }

    pub(crate) fn typed_text_changed(&mut self) {
        let now = self.clock.now();
        self.emoji_debounce.push(self.typed_text.clone(), now);
    }

    /// Reply options only show while nothing is typed and no word
    /// suggestions are up.
    pub(crate) fn enforce_exclusivity(&mut self) {
        if !self.typed_text.is_empty() || !self.word_suggestions.is_empty() {
            self.reply_options.clear();
        }
    }

    pub(crate) fn report(&self, event: TelemetryEvent) {
        if let Some(sink) = &self.telemetry {
            sink.report(event);
        }
    }
}
