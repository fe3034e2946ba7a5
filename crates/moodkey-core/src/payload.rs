//! Schemas for cross-process payloads and the model's structured output.
//!
//! Every field carries a serde default: a malformed or partial payload
//! degrades field-by-field instead of dropping the whole update.

use serde::{Deserialize, Deserializer, Serialize};

use crate::emotion::Emotion;

/// Direction tag prefixed to each conversation line.
pub const INCOMING_PREFIX: &str = "Them: ";
pub const OUTGOING_PREFIX: &str = "Me: ";

fn emotion_or_neutral<'de, D: Deserializer<'de>>(d: D) -> Result<Emotion, D::Error> {
    let tag = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match tag {
        Some(serde_json::Value::String(s)) => Emotion::from_tag(&s),
        _ => Emotion::Neutral,
    })
}

fn strings_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Emotion-only notification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmotionUpdate {
    #[serde(default, deserialize_with = "emotion_or_neutral")]
    pub emotion: Emotion,
}

/// Precomputed reply options.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReplyOptionsUpdate {
    #[serde(default, rename = "replyOptions", deserialize_with = "strings_or_empty")]
    pub reply_options: Vec<String>,
}

/// Latest conversation snapshot with the emotion detected on the other side.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessagesWithEmotion {
    #[serde(default, deserialize_with = "strings_or_empty")]
    pub messages: Vec<String>,
    #[serde(default, deserialize_with = "emotion_or_neutral")]
    pub emotion: Emotion,
}

impl MessagesWithEmotion {
    pub fn new(messages: Vec<String>, emotion: Emotion, max_messages: usize) -> Self {
        let mut snapshot = Self { messages, emotion };
        snapshot.retain_recent(max_messages);
        snapshot
    }

    /// Keep only the `max` most recent lines (most recent last).
    pub fn retain_recent(&mut self, max: usize) {
        if self.messages.len() > max {
            let excess = self.messages.len() - max;
            self.messages.drain(..excess);
        }
    }

    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }
}

/// Output contract of the reply-suggestion prompt: `{"suggestions": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplySuggestions {
    #[serde(default, deserialize_with = "strings_or_empty")]
    pub suggestions: Vec<String>,
}

impl ReplySuggestions {
    /// Parse cleaned model output. Blank entries are dropped; anything that is
    /// not a JSON object yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parsed: Self = serde_json::from_str(text.trim()).ok()?;
        parsed.suggestions.retain(|s| !s.trim().is_empty());
        for s in &mut parsed.suggestions {
            *s = s.trim().to_string();
        }
        Some(parsed)
    }
}

/// Parse a JSON payload, falling back to `T::default()` when it is not an object.
pub fn parse_or_default<T>(json: &str) -> T
where
    T: for<'de> Deserialize<'de> + Default,
{
    serde_json::from_str(json).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "malformed payload, using defaults");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_update_parses_tag() {
        let u: EmotionUpdate = parse_or_default(r#"{"emotion":"SAD"}"#);
        assert_eq!(u.emotion, Emotion::Sad);
    }

    #[test]
    fn emotion_update_unknown_tag_is_neutral() {
        let u: EmotionUpdate = parse_or_default(r#"{"emotion":"CONFUSED"}"#);
        assert_eq!(u.emotion, Emotion::Neutral);
        let u: EmotionUpdate = parse_or_default(r#"{"emotion":42}"#);
        assert_eq!(u.emotion, Emotion::Neutral);
        let u: EmotionUpdate = parse_or_default("{}");
        assert_eq!(u.emotion, Emotion::Neutral);
    }

    #[test]
    fn reply_options_skip_non_strings() {
        let u: ReplyOptionsUpdate =
            parse_or_default(r#"{"replyOptions":["Sure", 3, null, "Maybe"]}"#);
        assert_eq!(u.reply_options, vec!["Sure", "Maybe"]);
    }

    #[test]
    fn reply_options_wrong_type_is_empty() {
        let u: ReplyOptionsUpdate = parse_or_default(r#"{"replyOptions":"Sure"}"#);
        assert!(u.reply_options.is_empty());
        let u: ReplyOptionsUpdate = parse_or_default("garbage");
        assert!(u.reply_options.is_empty());
    }

    #[test]
    fn messages_keep_good_fields_when_one_is_bad() {
        let m: MessagesWithEmotion =
            parse_or_default(r#"{"messages":["Them: hi","Me: hey"],"emotion":"nope"}"#);
        assert_eq!(m.messages.len(), 2);
        assert_eq!(m.emotion, Emotion::Neutral);

        let m: MessagesWithEmotion = parse_or_default(r#"{"messages":5,"emotion":"HAPPY"}"#);
        assert!(m.messages.is_empty());
        assert_eq!(m.emotion, Emotion::Happy);
    }

    #[test]
    fn retain_recent_drops_oldest() {
        let lines: Vec<String> = (0..15).map(|i| format!("Them: {i}")).collect();
        let m = MessagesWithEmotion::new(lines, Emotion::Happy, 10);
        assert_eq!(m.messages.len(), 10);
        assert_eq!(m.messages[0], "Them: 5");
        assert_eq!(m.last_message(), Some("Them: 14"));
    }

    #[test]
    fn reply_suggestions_parse() {
        let r = ReplySuggestions::parse(r#"{"suggestions": [" Got it! ", "", "When?"]}"#).unwrap();
        assert_eq!(r.suggestions, vec!["Got it!", "When?"]);
        assert!(ReplySuggestions::parse("Sure, here you go").is_none());
    }
}
