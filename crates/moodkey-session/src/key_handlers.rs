use moodkey_core::telemetry::TelemetryEvent;
use tracing::{debug, debug_span};

use super::connection::InputConnection;
use super::types::{KeyEvent, KeyResponse};
use super::InputSession;

impl InputSession {
    /// Process one key event, committing to the host exactly once.
    ///
    /// Without a host connection nothing happens at all: no state change,
    /// no telemetry.
    pub fn handle_key(
        &mut self,
        conn: Option<&mut dyn InputConnection>,
        event: KeyEvent,
    ) -> KeyResponse {
        let _span = debug_span!("handle_key", ?event).entered();
        let Some(conn) = conn else {
            debug!("no input connection, key dropped");
            return KeyResponse::not_consumed();
        };
        let before = self.snapshot();

        match event {
            KeyEvent::Character(c) => {
                self.report(TelemetryEvent::KeyPress(c.clone()));
                self.press_character(conn, &c);
            }
            KeyEvent::Shift => {
                self.report(TelemetryEvent::KeyPress("SHIFT".to_string()));
                self.shift = !self.shift;
            }
            KeyEvent::Delete => {
                self.report(TelemetryEvent::Backspace);
                self.press_delete(conn);
            }
            KeyEvent::Space => {
                self.report(TelemetryEvent::KeyPress("SPACE".to_string()));
                self.commit_and_suggest(conn, " ");
            }
            KeyEvent::WordSuggestion(word) => {
                self.report(TelemetryEvent::WordSuggestion(word.clone()));
                self.commit_and_suggest(conn, &format!("{word} "));
            }
            KeyEvent::ReplyOption(reply) => {
                self.report(TelemetryEvent::ReplyOption(reply.clone()));
                self.commit_and_suggest(conn, &format!("{reply} "));
            }
            KeyEvent::Emoji(emoji) => {
                self.report(TelemetryEvent::Emoji(emoji.clone()));
                let text = if self.typed_text.is_empty()
                    || self.typed_text.ends_with(char::is_whitespace)
                {
                    format!("{emoji} ")
                } else {
                    format!(" {emoji} ")
                };
                self.commit_and_suggest(conn, &text);
            }
        }

        self.enforce_exclusivity();
        self.respond(&before, true)
    }

    /// Replace the whole typed span in the host with `text`.
    pub fn apply_generated_text(
        &mut self,
        conn: Option<&mut dyn InputConnection>,
        text: &str,
    ) -> KeyResponse {
        let Some(conn) = conn else {
            return KeyResponse::not_consumed();
        };
        let before = self.snapshot();
        if !self.typed_text.is_empty() {
            conn.delete_surrounding_text(self.typed_text.encode_utf16().count(), 0);
        }
        conn.commit_text(text);
        self.typed_text = text.to_string();
        self.typed_text_changed();
        self.enforce_exclusivity();
        self.respond(&before, true)
    }

    fn press_character(&mut self, conn: &mut dyn InputConnection, c: &str) {
        conn.commit_text(c);
        self.typed_text.push_str(c);
        self.typed_text_changed();
    }

    fn press_delete(&mut self, conn: &mut dyn InputConnection) {
        conn.delete_surrounding_code_points(1, 0);
        if self.typed_text.pop().is_none() {
            return;
        }
        self.typed_text_changed();
        if self.typed_text.is_empty() {
            self.word_suggestions.clear();
            self.reply_options = self.cached_reply_options.clone();
        }
    }

    fn commit_and_suggest(&mut self, conn: &mut dyn InputConnection, text: &str) {
        conn.commit_text(text);
        self.typed_text.push_str(text);
        self.typed_text_changed();
        self.recompute_word_suggestions();
    }
}
