//! Static emotion → emoji policy table.

use crate::emotion::Emotion;

pub const EMOJI_PER_EMOTION: usize = 5;

fn table(emotion: Emotion) -> &'static [&'static str; EMOJI_PER_EMOTION] {
    match emotion {
        Emotion::Happy => &["🙂", "😊", "😄", "😆", "🤩"],
        Emotion::Sad => &["🙁", "😟", "😢", "😫", "😭"],
        Emotion::Surprised => &["😯", "😮", "😲", "🤯", "😱"],
        Emotion::Angry => &["😠", "😡", "🤬", "😤", "👿"],
        Emotion::Neutral => &["😐", "😑", "😶", "😴", "🤔"],
    }
}

/// Ranked emoji candidates for an emotion.
pub fn for_emotion(emotion: Emotion) -> Vec<String> {
    table(emotion).iter().map(|s| s.to_string()).collect()
}
