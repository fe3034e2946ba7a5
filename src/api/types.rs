use moodkey_core::emotion::Emotion;
use moodkey_core::generation::BenchmarkData;
use moodkey_core::prompts::Tone;
use moodkey_session::{AssistView, KeyEvent, KeyResponse};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MkError {
    #[error("IO error: {msg}")]
    Io { msg: String },
    #[error("invalid data: {msg}")]
    InvalidData { msg: String },
    #[error("engine error: {msg}")]
    Engine { msg: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for MkError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Engine { msg: e.reason }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum MkEmotion {
    Happy,
    Sad,
    Surprised,
    Angry,
    Neutral,
}

impl From<Emotion> for MkEmotion {
    fn from(e: Emotion) -> Self {
        match e {
            Emotion::Happy => Self::Happy,
            Emotion::Sad => Self::Sad,
            Emotion::Surprised => Self::Surprised,
            Emotion::Angry => Self::Angry,
            Emotion::Neutral => Self::Neutral,
        }
    }
}

impl From<MkEmotion> for Emotion {
    fn from(e: MkEmotion) -> Self {
        match e {
            MkEmotion::Happy => Self::Happy,
            MkEmotion::Sad => Self::Sad,
            MkEmotion::Surprised => Self::Surprised,
            MkEmotion::Angry => Self::Angry,
            MkEmotion::Neutral => Self::Neutral,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum MkTone {
    Soften,
    Friendlier,
    Formal,
    Energetic,
}

impl From<MkTone> for Tone {
    fn from(t: MkTone) -> Self {
        match t {
            MkTone::Soften => Self::Soften,
            MkTone::Friendlier => Self::Friendlier,
            MkTone::Formal => Self::Formal,
            MkTone::Energetic => Self::Energetic,
        }
    }
}

impl From<Tone> for MkTone {
    fn from(t: Tone) -> Self {
        match t {
            Tone::Soften => Self::Soften,
            Tone::Friendlier => Self::Friendlier,
            Tone::Formal => Self::Formal,
            Tone::Energetic => Self::Energetic,
        }
    }
}

#[derive(Clone, Debug, uniffi::Enum)]
pub enum MkKeyEvent {
    Character { text: String },
    Shift,
    Delete,
    Space,
    WordSuggestion { text: String },
    ReplyOption { text: String },
    Emoji { text: String },
}

impl From<MkKeyEvent> for KeyEvent {
    fn from(e: MkKeyEvent) -> Self {
        match e {
            MkKeyEvent::Character { text } => Self::Character(text),
            MkKeyEvent::Shift => Self::Shift,
            MkKeyEvent::Delete => Self::Delete,
            MkKeyEvent::Space => Self::Space,
            MkKeyEvent::WordSuggestion { text } => Self::WordSuggestion(text),
            MkKeyEvent::ReplyOption { text } => Self::ReplyOption(text),
            MkKeyEvent::Emoji { text } => Self::Emoji(text),
        }
    }
}

/// UI updates, in the order the host should apply them.
#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum MkEvent {
    SetTypedText { text: String },
    SetShift { enabled: bool },
    SetEmotion { emotion: MkEmotion },
    ShowWordSuggestions { items: Vec<String> },
    ShowReplyOptions { items: Vec<String> },
    ShowEmojiSuggestions { items: Vec<String> },
    UpdateAssist { view: MkAssistView },
    SchedulePoll,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct MkAssistView {
    pub tone: Option<MkTone>,
    pub loading: bool,
    pub loading_message: String,
    pub response: String,
}

impl From<AssistView> for MkAssistView {
    fn from(v: AssistView) -> Self {
        Self {
            tone: v.tone.map(MkTone::from),
            loading: v.loading,
            loading_message: v.loading_message,
            response: v.response,
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct MkBenchmark {
    pub init_time_ms: u64,
    pub prompt_length: u64,
    pub ttft_ms: u64,
    pub response_length: u64,
    pub total_time_ms: u64,
    pub tokens_per_second: f64,
    pub memory_before_mb: f64,
    pub memory_after_mb: f64,
    pub memory_peak_mb: f64,
    pub total_input_tokens: u64,
}

impl From<BenchmarkData> for MkBenchmark {
    fn from(b: BenchmarkData) -> Self {
        Self {
            init_time_ms: b.init_time_ms,
            prompt_length: b.prompt_length as u64,
            ttft_ms: b.ttft_ms,
            response_length: b.response_length as u64,
            total_time_ms: b.total_time_ms,
            tokens_per_second: b.tokens_per_second,
            memory_before_mb: b.memory_before_mb,
            memory_after_mb: b.memory_after_mb,
            memory_peak_mb: b.memory_peak_mb,
            total_input_tokens: b.total_input_tokens as u64,
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct MkEventEnvelope {
    pub action: String,
    pub target_package: String,
    pub event_type: String,
    pub event_timestamp: i64,
    pub event_data: Option<String>,
}

/// Event-driven response from key handling, lifecycle calls and poll.
#[derive(Clone, Debug, Default, uniffi::Record)]
pub struct MkKeyResponse {
    pub consumed: bool,
    pub events: Vec<MkEvent>,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub(super) fn push_events(events: &mut Vec<MkEvent>, resp: KeyResponse) {
    if let Some(text) = resp.typed_text {
        events.push(MkEvent::SetTypedText { text });
    }
    if let Some(enabled) = resp.shift {
        events.push(MkEvent::SetShift { enabled });
    }
    if let Some(emotion) = resp.emotion {
        events.push(MkEvent::SetEmotion {
            emotion: emotion.into(),
        });
    }
    if let Some(items) = resp.word_suggestions {
        events.push(MkEvent::ShowWordSuggestions { items });
    }
    if let Some(items) = resp.reply_options {
        events.push(MkEvent::ShowReplyOptions { items });
    }
    if let Some(items) = resp.emoji_suggestions {
        events.push(MkEvent::ShowEmojiSuggestions { items });
    }
    if let Some(view) = resp.assist {
        events.push(MkEvent::UpdateAssist { view: view.into() });
    }
}

pub(super) fn convert_to_events(resp: KeyResponse, has_pending_work: bool) -> MkKeyResponse {
    let consumed = resp.consumed;
    let mut events = Vec::new();
    push_events(&mut events, resp);
    if has_pending_work {
        events.push(MkEvent::SchedulePoll);
    }
    MkKeyResponse { consumed, events }
}
