//! Emotion categories shared by the classifier, the external channel and prompts.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Emotion {
    Happy,
    Sad,
    Surprised,
    Angry,
    #[default]
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprised,
        Emotion::Angry,
        Emotion::Neutral,
    ];

    /// Wire tag, as sent by the messenger app and substituted into prompts.
    pub fn name(self) -> &'static str {
        match self {
            Self::Happy => "HAPPY",
            Self::Sad => "SAD",
            Self::Surprised => "SURPRISED",
            Self::Angry => "ANGRY",
            Self::Neutral => "NEUTRAL",
        }
    }

    /// Parse a wire tag. Unknown or empty tags degrade to `Neutral`.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(tag))
            .unwrap_or_default()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
