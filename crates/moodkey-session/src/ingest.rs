//! External notifications: emotion, reply options and conversation snapshots.
//! Each overwrites the previous value of its kind.

use moodkey_core::emotion::Emotion;
use moodkey_core::payload::MessagesWithEmotion;
use moodkey_core::prompts;
use tracing::debug;

use super::types::{AsyncGenerationRequest, GenerationKind, KeyResponse};
use super::InputSession;

impl InputSession {
    /// Emotion from the messenger app. Emoji suggestions follow immediately.
    pub fn receive_emotion(&mut self, emotion: Emotion) -> KeyResponse {
        let before = self.snapshot();
        self.emotion = emotion;
        self.refresh_emoji();
        self.respond(&before, true)
    }

    /// Emotion from the on-device classifier. Emoji suggestions pick it up
    /// on the next debounced recompute.
    pub fn receive_detected_emotion(&mut self, emotion: Emotion) -> KeyResponse {
        let before = self.snapshot();
        self.emotion = emotion;
        self.respond(&before, true)
    }

    /// Replace the reply options. Non-empty lists are cached; while text is
    /// typed they are cached but not shown.
    pub fn receive_reply_options(&mut self, options: Vec<String>) -> KeyResponse {
        let before = self.snapshot();
        if !self.config.reply_options {
            debug!("reply options disabled, update ignored");
            return self.respond(&before, true);
        }
        if !options.is_empty() {
            self.cached_reply_options = options.clone();
        }
        self.reply_options = options;
        self.enforce_exclusivity();
        self.respond(&before, true)
    }

    /// Store the latest conversation snapshot and, with LLM replies on,
    /// request reply suggestions for it.
    pub fn receive_messages(&mut self, snapshot: MessagesWithEmotion) -> KeyResponse {
        let before = self.snapshot();
        self.emotion = snapshot.emotion;
        self.refresh_emoji();

        let request = if self.config.llm_replies {
            prompts::reply_prompt(&snapshot).map(|prompt| {
                self.reply_generation += 1;
                AsyncGenerationRequest {
                    kind: GenerationKind::Replies,
                    prompt,
                    generation: self.reply_generation,
                }
            })
        } else {
            None
        };
        self.last_messages = Some(snapshot);

        let mut resp = self.respond(&before, true);
        resp.generation_request = request;
        resp
    }

    pub fn reply_generation(&self) -> u64 {
        self.reply_generation
    }
}
