use std::fs;
use std::io::{self, Read};
use std::process;

use moodkey_core::emotion::Emotion;
use moodkey_core::generation::clean_markdown_fences;
use moodkey_core::payload::MessagesWithEmotion;
use moodkey_core::prompts::{reply_prompt, rewrite_prompt, Tone};
use moodkey_core::settings::settings;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

/// `soften`, `friendlier`, `formal` or `energetic`, case-insensitive.
pub fn parse_tone(name: &str) -> Option<Tone> {
    Tone::ALL
        .into_iter()
        .find(|t| format!("{t:?}").eq_ignore_ascii_case(name.trim()))
}

fn read_input(file: Option<&str>) -> String {
    match file {
        Some(path) => die!(fs::read_to_string(path), "Error reading {path}: {}"),
        None => {
            let mut buf = String::new();
            die!(io::stdin().read_to_string(&mut buf), "Error reading stdin: {}");
            buf
        }
    }
}

/// Strip Markdown code fences from model output (file or stdin).
pub fn clean(file: Option<&str>) {
    let raw = read_input(file);
    println!("{}", clean_markdown_fences(&raw));
}

pub fn prompt_rewrite(tone: &str, emotion: &str, allow_emojis: bool, text: &str) {
    let Some(tone) = parse_tone(tone) else {
        eprintln!("Error: unknown tone '{tone}' (available: soften, friendlier, formal, energetic)");
        process::exit(1);
    };
    print!(
        "{}",
        rewrite_prompt(tone, text, Emotion::from_tag(emotion), allow_emojis)
    );
}

pub fn prompt_reply(emotion: &str, messages: Vec<String>) {
    let snapshot = MessagesWithEmotion::new(
        messages,
        Emotion::from_tag(emotion),
        settings().suggestions.max_messages,
    );
    match reply_prompt(&snapshot) {
        Some(prompt) => print!("{prompt}"),
        None => {
            eprintln!("Error: at least one message is required");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_names_are_case_insensitive() {
        assert_eq!(parse_tone("soften"), Some(Tone::Soften));
        assert_eq!(parse_tone(" FORMAL "), Some(Tone::Formal));
        assert_eq!(parse_tone("Energetic"), Some(Tone::Energetic));
        assert_eq!(parse_tone("angry"), None);
    }

    #[test]
    fn every_tone_has_a_name() {
        for tone in Tone::ALL {
            let name = format!("{tone:?}").to_lowercase();
            assert_eq!(parse_tone(&name), Some(tone));
        }
    }
}
