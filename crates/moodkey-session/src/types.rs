use moodkey_core::emotion::Emotion;
use moodkey_core::prompts::Tone;
use moodkey_core::settings::Settings;

/// A user action on the keyboard surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Character(String),
    Shift,
    Delete,
    Space,
    WordSuggestion(String),
    ReplyOption(String),
    Emoji(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No input view shown.
    Idle,
    /// Input view visible, text state live.
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKind {
    /// Tone rewrite of the typed text, streamed.
    Rewrite,
    /// Reply suggestions for the latest conversation snapshot.
    Replies,
}

/// Work the caller must hand to the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncGenerationRequest {
    pub kind: GenerationKind,
    pub prompt: String,
    pub generation: u64,
}

/// Presentation state of the tone-rewrite panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistView {
    pub tone: Option<Tone>,
    pub loading: bool,
    pub loading_message: String,
    pub response: String,
}

/// Orchestrator knobs, normally derived from [`Settings`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub word_limit: usize,
    pub emoji_debounce_ms: u64,
    pub allow_emojis: bool,
    pub word_suggestions: bool,
    pub reply_options: bool,
    pub llm_assist: bool,
    pub llm_replies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SessionConfig {
    fn from(s: &Settings) -> Self {
        Self {
            word_limit: s.suggestions.word_limit,
            emoji_debounce_ms: s.suggestions.emoji_debounce_ms,
            allow_emojis: s.generation.allow_emojis,
            word_suggestions: s.features.word_suggestions,
            reply_options: s.features.reply_options,
            llm_assist: s.features.llm_assist,
            llm_replies: s.features.llm_replies,
        }
    }
}

/// What changed as a result of one call. `None` fields are unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyResponse {
    /// False when the action could not reach the host text field.
    pub consumed: bool,
    pub typed_text: Option<String>,
    pub shift: Option<bool>,
    pub emotion: Option<Emotion>,
    pub word_suggestions: Option<Vec<String>>,
    pub emoji_suggestions: Option<Vec<String>>,
    pub reply_options: Option<Vec<String>>,
    pub assist: Option<AssistView>,
    pub generation_request: Option<AsyncGenerationRequest>,
    /// The in-flight rewrite has been abandoned without a replacement.
    pub cancel_rewrite: bool,
}

impl KeyResponse {
    pub(crate) fn not_consumed() -> Self {
        Self::default()
    }

    pub(crate) fn consumed() -> Self {
        Self {
            consumed: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.typed_text.is_none()
            && self.shift.is_none()
            && self.emotion.is_none()
            && self.word_suggestions.is_none()
            && self.emoji_suggestions.is_none()
            && self.reply_options.is_none()
            && self.assist.is_none()
            && self.generation_request.is_none()
            && !self.cancel_rewrite
    }
}

/// Copy of the presented fields, taken before a mutation so the response can
/// report only what changed.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) typed_text: String,
    pub(crate) shift: bool,
    pub(crate) emotion: Emotion,
    pub(crate) word_suggestions: Vec<String>,
    pub(crate) emoji_suggestions: Vec<String>,
    pub(crate) reply_options: Vec<String>,
    pub(crate) assist: AssistView,
}
