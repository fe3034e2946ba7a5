use tracing::info;

use moodkey_core::emotion::Emotion;

use super::types::{KeyResponse, SessionState};
use super::InputSession;

impl InputSession {
    /// Input view shown. Cached reply options are kept.
    pub fn on_show(&mut self) -> KeyResponse {
        let before = self.snapshot();
        if self.state != SessionState::Active {
            info!("session active");
            self.state = SessionState::Active;
        }
        if self.emoji_suggestions.is_empty() {
            self.refresh_emoji();
        }
        self.respond(&before, true)
    }

    /// Input view finished; the input session may continue. Typed state is
    /// dropped and cached reply options are shown again.
    pub fn on_hide_view(&mut self) -> KeyResponse {
        let before = self.snapshot();
        self.typed_text.clear();
        self.word_suggestions.clear();
        self.shift = false;
        self.reply_options = self.cached_reply_options.clone();
        self.typed_text_changed();
        let cancelled = self.assist.reset();

        let mut resp = self.respond(&before, true);
        resp.cancel_rewrite = cancelled;
        resp
    }

    /// Input session finished. Everything returns to defaults, including
    /// the reply-option cache.
    pub fn on_hide_session(&mut self) -> KeyResponse {
        let before = self.snapshot();
        self.state = SessionState::Idle;
        self.typed_text.clear();
        self.word_suggestions.clear();
        self.shift = false;
        self.reply_options.clear();
        self.cached_reply_options.clear();
        self.emotion = Emotion::Neutral;
        self.emoji_suggestions.clear();
        self.emoji_debounce.reset();
        self.last_messages = None;
        self.reply_generation += 1;
        let cancelled = self.assist.reset();
        info!("session idle");

        let mut resp = self.respond(&before, true);
        resp.cancel_rewrite = cancelled;
        resp
    }
}
