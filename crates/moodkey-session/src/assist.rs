//! Tone-rewrite panel and generation result routing.
//!
//! Every request carries a generation id. Results tagged with any other id
//! than the current one for their kind are dropped, so a superseded stream
//! can never overwrite newer state.

use moodkey_core::generation::clean_markdown_fences;
use moodkey_core::payload::ReplySuggestions;
use moodkey_core::prompts::{self, Tone};
use tracing::debug;

use super::connection::InputConnection;
use super::types::{AssistView, AsyncGenerationRequest, GenerationKind, KeyResponse};
use super::InputSession;

#[derive(Debug, Default)]
pub(crate) struct AssistState {
    tone: Option<Tone>,
    generation: u64,
    loading: bool,
    loading_message: &'static str,
    response: String,
}

impl AssistState {
    pub(crate) fn view(&self) -> AssistView {
        AssistView {
            tone: self.tone,
            loading: self.loading,
            loading_message: self.loading_message.to_string(),
            response: self.response.clone(),
        }
    }

    /// Close the panel. Returns true if a generation was in flight.
    pub(crate) fn reset(&mut self) -> bool {
        let was_loading = self.loading;
        self.generation += 1;
        self.tone = None;
        self.loading = false;
        self.loading_message = "";
        self.response.clear();
        was_loading
    }
}

impl InputSession {
    pub fn assist_view(&self) -> AssistView {
        self.assist.view()
    }

    pub fn assist_generation(&self) -> u64 {
        self.assist.generation
    }

    /// Start a rewrite of the typed text in `tone`, superseding any rewrite
    /// still streaming. Returns an unchanged response when there is nothing
    /// to rewrite or the feature is off.
    pub fn request_rewrite(&mut self, tone: Tone) -> KeyResponse {
        let before = self.snapshot();
        if !self.config.llm_assist || self.typed_text.trim().is_empty() {
            return self.respond(&before, true);
        }
        let a = &mut self.assist;
        a.generation += 1;
        a.tone = Some(tone);
        a.loading = true;
        a.response.clear();
        let messages = tone.loading_messages();
        a.loading_message = messages[(a.generation as usize) % messages.len()];

        let prompt = prompts::rewrite_prompt(
            tone,
            &self.typed_text,
            self.emotion,
            self.config.allow_emojis,
        );
        let mut resp = self.respond(&before, true);
        resp.generation_request = Some(AsyncGenerationRequest {
            kind: GenerationKind::Rewrite,
            prompt,
            generation: self.assist.generation,
        });
        resp
    }

    /// Streaming chunk. Only rewrites are streamed into the panel.
    pub fn receive_partial(
        &mut self,
        kind: GenerationKind,
        generation: u64,
        chunk: &str,
    ) -> Option<KeyResponse> {
        if kind != GenerationKind::Rewrite || !self.is_current_rewrite(generation) {
            return None;
        }
        let before = self.snapshot();
        self.assist.response.push_str(chunk);
        Some(self.respond(&before, true))
    }

    pub fn receive_generated(
        &mut self,
        kind: GenerationKind,
        generation: u64,
        text: &str,
    ) -> Option<KeyResponse> {
        match kind {
            GenerationKind::Rewrite => {
                if !self.is_current_rewrite(generation) {
                    debug!(generation, "stale rewrite dropped");
                    return None;
                }
                let before = self.snapshot();
                self.assist.response = clean_markdown_fences(text);
                self.assist.loading = false;
                Some(self.respond(&before, true))
            }
            GenerationKind::Replies => {
                if generation != self.reply_generation {
                    debug!(generation, "stale reply suggestions dropped");
                    return None;
                }
                match ReplySuggestions::parse(&clean_markdown_fences(text)) {
                    Some(parsed) if !parsed.suggestions.is_empty() => {
                        Some(self.receive_reply_options(parsed.suggestions))
                    }
                    _ => {
                        debug!("unusable reply suggestions output");
                        None
                    }
                }
            }
        }
    }

    /// Generation failed. Loading stops; whatever was shown stays.
    pub fn receive_generation_failed(
        &mut self,
        kind: GenerationKind,
        generation: u64,
    ) -> Option<KeyResponse> {
        if kind != GenerationKind::Rewrite || !self.is_current_rewrite(generation) {
            return None;
        }
        let before = self.snapshot();
        self.assist.loading = false;
        Some(self.respond(&before, true))
    }

    /// Apply the finished rewrite to the host and close the panel.
    pub fn accept_rewrite(&mut self, conn: Option<&mut dyn InputConnection>) -> KeyResponse {
        if self.assist.loading || self.assist.response.is_empty() {
            return KeyResponse::consumed();
        }
        let Some(conn) = conn else {
            return KeyResponse::not_consumed();
        };
        let before = self.snapshot();
        let text = std::mem::take(&mut self.assist.response);
        let mut resp = self.apply_generated_text(Some(conn), &text);
        self.assist.reset();
        resp.assist = Some(self.assist.view()).filter(|view| *view != before.assist);
        resp
    }

    /// Close the panel, abandoning any rewrite in flight.
    pub fn discard_rewrite(&mut self) -> KeyResponse {
        let before = self.snapshot();
        let cancelled = self.assist.reset();
        let mut resp = self.respond(&before, true);
        resp.cancel_rewrite = cancelled;
        resp
    }

    fn is_current_rewrite(&self, generation: u64) -> bool {
        generation == self.assist.generation && self.assist.tone.is_some()
    }
}
