//! Prompt templates for tone rewrites and reply suggestions.

use crate::emotion::Emotion;
use crate::payload::MessagesWithEmotion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Soften,
    Friendlier,
    Formal,
    Energetic,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Soften, Tone::Friendlier, Tone::Formal, Tone::Energetic];

    pub fn label(self) -> &'static str {
        match self {
            Self::Soften => "Soften tone",
            Self::Friendlier => "Make friendlier",
            Self::Formal => "Make formal",
            Self::Energetic => "Make energetic",
        }
    }

    /// Status lines shown while a rewrite is streaming.
    pub fn loading_messages(self) -> &'static [&'static str] {
        match self {
            Self::Soften => &[
                "Softening your message...",
                "Finding gentler words...",
                "Making it sound nicer...",
            ],
            Self::Friendlier => &[
                "Adding a friendly touch...",
                "Making it sound warmer...",
                "Finding positive words...",
            ],
            Self::Formal => &[
                "Converting to formal tone...",
                "Using professional language...",
                "Making it sound business-like...",
            ],
            Self::Energetic => &[
                "Injecting energy into your text...",
                "Making it more motivating...",
                "Finding lively words...",
            ],
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::Soften => SOFTEN_TEMPLATE,
            Self::Friendlier => FRIENDLIER_TEMPLATE,
            Self::Formal => FORMAL_TEMPLATE,
            Self::Energetic => ENERGETIC_TEMPLATE,
        }
    }
}

const SOFTEN_TEMPLATE: &str = "\
You are a concise rewriting assistant.
Goal: Rewrite the user's text to sound gentler and less confrontational while respecting the detected emotion: {emotion}.

Rules:
- Preserve meaning, facts, and key details; do not add new information.
- Reduce harshness: use hedging (\u{201c}could\u{201d}, \u{201c}might\u{201d}), neutral verbs, and polite phrasing.
- Keep length within \u{b1}10% of the original.
- Keep the original language of the input.
- Avoid slang, sarcasm, exaggeration, or judgmental wording.
- Emojis: {allow_emojis}. If true, add at most one subtle emoji only if it fits naturally; otherwise none.

Input:
{text}

Provide only the rewritten text without any additional formatting or labels.";

const FRIENDLIER_TEMPLATE: &str = "\
You are a concise rewriting assistant.
Goal: Rewrite the user's text to sound warmer and more welcoming, aligned with the detected emotion: {emotion}.

Rules:
- Preserve meaning, facts, and intent; do not add new information.
- Use friendly, positive wording; add softeners (\u{201c}please\u{201d}, \u{201c}thanks\u{201d}) only if natural.
- Keep length within \u{b1}10%.
- Keep the original language of the input.
- Maintain clarity; avoid clich\u{e9}s and over-the-top cheeriness.
- Emojis: {allow_emojis}. If true, add at most one friendly emoji; otherwise none.

Input:
{text}

Provide only the rewritten text without any additional formatting or labels.";

const FORMAL_TEMPLATE: &str = "\
You are a concise rewriting assistant.
Goal: Rewrite the user's text into a professional, formal register while considering the detected emotion: {emotion} (neutralize emotional charge).

Rules:
- Preserve meaning, facts, and commitments; no new information.
- Use clear, precise, and courteous business language; avoid slang and idioms.
- Prefer active voice, neutral verbs, and specific nouns.
- Keep length within \u{b1}10%.
- Keep the original language of the input.
- No emojis or exclamation marks unless present in the original and necessary.

Input:
{text}

Provide only the rewritten text without any additional formatting or labels.";

const ENERGETIC_TEMPLATE: &str = "\
You are a concise rewriting assistant.
Goal: Rewrite the user's text to be more energetic and motivating, harmonizing with the detected emotion: {emotion}.

Rules:
- Preserve meaning, facts, and promises; do not add new information.
- Increase momentum with vivid but precise verbs; keep sentences tight.
- Limit exclamation marks (max one if truly helpful).
- Keep length within \u{b1}10%.
- Keep the original language of the input.
- Emojis: {allow_emojis}. If true, allow at most one upbeat emoji; otherwise none.

Input:
{text}

Provide only the rewritten text without any additional formatting or labels.";

const REPLY_SYSTEM_PROMPT: &str = "\
You are a smart reply assistant for chat applications. Analyze conversation and generate natural, contextually appropriate response suggestions.

CORE PRINCIPLES:
- Generate 3 diverse, concise replies (2-15 words each)
- Match the conversation tone and formality
- Vary response types: acknowledgements, questions, informative answers, actions
- Ensure response flow naturally from conversation
- Make replies human and conversational

RESPONSE TYPES:
- acknowledgement: quick confirmations (\"Got it!\", \"Thanks!\", \"Okay\")
- question: follow-up questions (\"When?\", \"Which one?\", \"Need help?\")
- information: substantial answers with information
- emotional: empathetic or emotional responses (\"Sorry to hear that\", \"That's great\")
- action: commitment to action (\"I'll do it\", \"On my way\", \"Will check\")

OUTPUT FORMAT (JSON only, no other text)
{
    \"suggestions\": [
        \"reply text 1\",  \"reply text 2\",  \"reply text N\"
    ]
}

Ensure all responses are appropriate, safe and helpful.";

/// Build the rewrite prompt for `text` in the requested tone.
///
/// `{text}` is substituted last so user text containing placeholder
/// spellings is left untouched.
pub fn rewrite_prompt(tone: Tone, text: &str, emotion: Emotion, allow_emojis: bool) -> String {
    tone.template()
        .replace("{emotion}", emotion.name())
        .replace("{allow_emojis}", if allow_emojis { "true" } else { "false" })
        .replace("{text}", text)
}

/// Build the reply-suggestion prompt from a conversation snapshot.
/// Returns `None` when there is no message to reply to.
pub fn reply_prompt(snapshot: &MessagesWithEmotion) -> Option<String> {
    let newest = snapshot.last_message()?;
    Some(format!(
        "{REPLY_SYSTEM_PROMPT}\n\n\
         DETECTED EMOTION: {}\n\n\
         CONVERSATION (most recent messages 10 at most):\n{}\n\n\
         NEW MESSAGE:\n{newest}\n\n\
         Generate 3 reply suggestions as JSON",
        snapshot.emotion.name(),
        snapshot.messages.join("\n"),
    ))
}
