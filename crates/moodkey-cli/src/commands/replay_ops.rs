//! Scripted session replay.
//!
//! A script is one command per line; blank lines and `#` comments are
//! skipped. Each command prints one JSON frame with the session state and the
//! mirrored host text field after it ran.
//!
//! ```text
//! type hello          # characters; spaces become Space presses
//! word world          # tap a word suggestion
//! emotion HAPPY       # external emotion notification
//! replies Sure|Later  # external reply options
//! wait 1000           # advance the clock by N ms and poll
//! ```

use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use moodkey_core::dict::DictionaryIndex;
use moodkey_core::emotion::Emotion;
use moodkey_core::payload::MessagesWithEmotion;
use moodkey_core::settings::{parse_settings_toml, settings, Settings};
use moodkey_session::{InputConnection, InputSession, KeyEvent, ManualClock, SessionConfig};
use serde::Serialize;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReplayError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: {msg}")]
    BadArgument { line: usize, msg: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Keys(Vec<KeyEvent>),
    Generated(String),
    Emotion(Emotion),
    DetectedEmotion(Emotion),
    Replies(Vec<String>),
    Messages(Vec<String>),
    Wait(u64),
    Show,
    HideView,
    HideSession,
}

fn keys_for_text(text: &str) -> Vec<KeyEvent> {
    text.chars()
        .map(|c| {
            if c == ' ' {
                KeyEvent::Space
            } else {
                KeyEvent::Character(c.to_string())
            }
        })
        .collect()
}

fn split_list(arg: &str) -> Vec<String> {
    arg.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse one script line. `Ok(None)` for blank lines and comments.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<(String, Step)>, ReplayError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (command, arg) = match trimmed.split_once(' ') {
        Some((c, a)) => (c, a),
        None => (trimmed, ""),
    };
    let need_arg = |what: &str| -> Result<String, ReplayError> {
        if arg.trim().is_empty() {
            Err(ReplayError::BadArgument {
                line: line_no,
                msg: format!("'{command}' needs {what}"),
            })
        } else {
            Ok(arg.to_string())
        }
    };

    let step = match command {
        "type" => Step::Keys(keys_for_text(&need_arg("text")?)),
        "space" => Step::Keys(vec![KeyEvent::Space]),
        "delete" => {
            let n = if arg.trim().is_empty() {
                1
            } else {
                arg.trim().parse::<usize>().map_err(|e| ReplayError::BadArgument {
                    line: line_no,
                    msg: format!("delete count: {e}"),
                })?
            };
            Step::Keys(vec![KeyEvent::Delete; n])
        }
        "shift" => Step::Keys(vec![KeyEvent::Shift]),
        "word" => Step::Keys(vec![KeyEvent::WordSuggestion(need_arg("a word")?)]),
        "reply" => Step::Keys(vec![KeyEvent::ReplyOption(need_arg("a reply")?)]),
        "emoji" => Step::Keys(vec![KeyEvent::Emoji(need_arg("an emoji")?)]),
        "generated" => Step::Generated(need_arg("text")?),
        "emotion" => Step::Emotion(Emotion::from_tag(&need_arg("an emotion tag")?)),
        "detected" => Step::DetectedEmotion(Emotion::from_tag(&need_arg("an emotion tag")?)),
        "replies" => Step::Replies(split_list(arg)),
        "messages" => Step::Messages(split_list(&need_arg("messages")?)),
        "wait" => {
            let ms = need_arg("milliseconds")?
                .trim()
                .parse::<u64>()
                .map_err(|e| ReplayError::BadArgument {
                    line: line_no,
                    msg: format!("wait: {e}"),
                })?;
            Step::Wait(ms)
        }
        "show" => Step::Show,
        "hide-view" => Step::HideView,
        "hide-session" => Step::HideSession,
        other => {
            return Err(ReplayError::UnknownCommand {
                line: line_no,
                command: other.to_string(),
            })
        }
    };
    Ok(Some((trimmed.to_string(), step)))
}

pub fn parse_script(script: &str) -> Result<Vec<(String, Step)>, ReplayError> {
    let mut steps = Vec::new();
    for (i, line) in script.lines().enumerate() {
        if let Some(step) = parse_line(i + 1, line)? {
            steps.push(step);
        }
    }
    Ok(steps)
}

/// Host text field mirror: applies commits and deletions the way an editor does.
#[derive(Debug, Default)]
pub struct FieldBuffer {
    pub text: String,
}

impl InputConnection for FieldBuffer {
    fn commit_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn delete_surrounding_code_points(&mut self, before: usize, _after: usize) {
        for _ in 0..before {
            if self.text.pop().is_none() {
                break;
            }
        }
    }

    fn delete_surrounding_text(&mut self, before: usize, _after: usize) {
        let mut units = before;
        while units > 0 {
            match self.text.pop() {
                Some(c) => units = units.saturating_sub(c.len_utf16()),
                None => break,
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Frame {
    pub step: usize,
    pub command: String,
    pub field: String,
    pub typed_text: String,
    pub shift: bool,
    pub emotion: &'static str,
    pub word_suggestions: Vec<String>,
    pub reply_options: Vec<String>,
    pub emoji_suggestions: Vec<String>,
}

pub struct Replay {
    session: InputSession,
    clock: ManualClock,
    field: FieldBuffer,
    max_messages: usize,
}

impl Replay {
    pub fn new(dict: Arc<DictionaryIndex>, config: SessionConfig, max_messages: usize) -> Self {
        let clock = ManualClock::new();
        let mut session = InputSession::with_clock(dict, config, Box::new(clock.clone()));
        session.on_show();
        Self {
            session,
            clock,
            field: FieldBuffer::default(),
            max_messages,
        }
    }

    pub fn apply(&mut self, step: Step) {
        let session = &mut self.session;
        match step {
            Step::Keys(keys) => {
                for key in keys {
                    let host: &mut dyn InputConnection = &mut self.field;
                    session.handle_key(Some(host), key);
                }
            }
            Step::Generated(text) => {
                let host: &mut dyn InputConnection = &mut self.field;
                session.apply_generated_text(Some(host), &text);
            }
            Step::Emotion(e) => {
                session.receive_emotion(e);
            }
            Step::DetectedEmotion(e) => {
                session.receive_detected_emotion(e);
            }
            Step::Replies(options) => {
                session.receive_reply_options(options);
            }
            Step::Messages(messages) => {
                let snapshot =
                    MessagesWithEmotion::new(messages, session.emotion(), self.max_messages);
                session.receive_messages(snapshot);
            }
            Step::Wait(ms) => {
                self.clock.advance(Duration::from_millis(ms));
                session.poll();
            }
            Step::Show => {
                session.on_show();
            }
            Step::HideView => {
                session.on_hide_view();
            }
            Step::HideSession => {
                session.on_hide_session();
            }
        }
    }

    pub fn frame(&self, step: usize, command: String) -> Frame {
        let s = &self.session;
        Frame {
            step,
            command,
            field: self.field.text.clone(),
            typed_text: s.typed_text().to_string(),
            shift: s.is_shift_enabled(),
            emotion: s.emotion().name(),
            word_suggestions: s.word_suggestions().to_vec(),
            reply_options: s.reply_options().to_vec(),
            emoji_suggestions: s.emoji_suggestions().to_vec(),
        }
    }

    /// Run every step, returning one frame per step.
    pub fn run(&mut self, steps: Vec<(String, Step)>) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(steps.len());
        for (i, (command, step)) in steps.into_iter().enumerate() {
            self.apply(step);
            frames.push(self.frame(i + 1, command));
        }
        frames
    }
}

pub fn replay(script_file: &str, dict_file: Option<&str>, settings_file: Option<&str>) {
    let script = die!(
        fs::read_to_string(script_file),
        "Error reading {script_file}: {}"
    );
    let steps = die!(parse_script(&script), "Error: {}");

    let custom: Option<Settings> = settings_file.map(|path| {
        let content = die!(fs::read_to_string(path), "Error reading {path}: {}");
        die!(parse_settings_toml(&content), "Error: {}")
    });
    let s = custom.as_ref().unwrap_or_else(|| settings());

    let dict = DictionaryIndex::new();
    if let Some(path) = dict_file {
        if !dict.load(Path::new(path)) {
            eprintln!("Error: failed to load dictionary {path}");
            process::exit(1);
        }
    }

    let mut replay = Replay::new(
        Arc::new(dict),
        SessionConfig::from(s),
        s.suggestions.max_messages,
    );
    for frame in replay.run(steps) {
        println!("{}", die!(serde_json::to_string(&frame), "Error: {}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodkey_core::dict::BigramIndex;
    use moodkey_core::emoji;

    fn dict() -> Arc<DictionaryIndex> {
        let dict = DictionaryIndex::new();
        dict.install(BigramIndex::from_pairs([(
            "good".to_string(),
            vec![("morning".to_string(), 9), ("luck".to_string(), 4)],
        )]));
        Arc::new(dict)
    }

    fn replay(config: SessionConfig) -> Replay {
        Replay::new(dict(), config, 10)
    }

    #[test]
    fn parse_skips_blank_and_comments() {
        let steps = parse_script("# setup\n\ntype hi\n  # indented comment\nwait 10\n").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(
            steps[0].1,
            Step::Keys(vec![
                KeyEvent::Character("h".into()),
                KeyEvent::Character("i".into())
            ])
        );
        assert_eq!(steps[1].1, Step::Wait(10));
    }

    #[test]
    fn parse_maps_spaces_to_space_key() {
        let (_, step) = parse_line(1, "type a b").unwrap().unwrap();
        assert_eq!(
            step,
            Step::Keys(vec![
                KeyEvent::Character("a".into()),
                KeyEvent::Space,
                KeyEvent::Character("b".into()),
            ])
        );
    }

    #[test]
    fn parse_reports_line_numbers() {
        let err = parse_script("type ok\njump now").unwrap_err();
        assert_eq!(
            err,
            ReplayError::UnknownCommand {
                line: 2,
                command: "jump".into()
            }
        );
        assert!(matches!(
            parse_line(7, "wait soon"),
            Err(ReplayError::BadArgument { line: 7, .. })
        ));
        assert!(matches!(
            parse_line(3, "word"),
            Err(ReplayError::BadArgument { line: 3, .. })
        ));
    }

    #[test]
    fn replies_split_on_pipes() {
        let (_, step) = parse_line(1, "replies Sure | Later ||").unwrap().unwrap();
        assert_eq!(step, Step::Replies(vec!["Sure".into(), "Later".into()]));
    }

    #[test]
    fn field_buffer_deletes_utf16_units() {
        let mut field = FieldBuffer::default();
        field.commit_text("hi 😀");
        field.delete_surrounding_text(2, 0);
        assert_eq!(field.text, "hi ");
        field.delete_surrounding_code_points(5, 0);
        assert_eq!(field.text, "");
    }

    #[test]
    fn typing_then_space_suggests_next_word() {
        let mut r = replay(SessionConfig::default());
        let frames = r.run(parse_script("type good\nspace").unwrap());
        let last = frames.last().unwrap();
        assert_eq!(last.field, "good ");
        assert_eq!(last.typed_text, "good ");
        assert_eq!(last.word_suggestions, vec!["morning", "luck"]);
    }

    #[test]
    fn reply_options_hide_while_typing_and_return_on_clear() {
        let mut r = replay(SessionConfig::default());
        let frames = r.run(parse_script("replies Sure|Later\ntype a\ndelete").unwrap());
        assert_eq!(frames[0].reply_options, vec!["Sure", "Later"]);
        assert!(frames[1].reply_options.is_empty());
        assert_eq!(frames[2].reply_options, vec!["Sure", "Later"]);
        assert_eq!(frames[2].field, "");
    }

    #[test]
    fn detected_emotion_reaches_emoji_after_debounce() {
        let mut r = replay(SessionConfig::default());
        let frames = r.run(parse_script("detected HAPPY\ntype hi\nwait 999\nwait 1").unwrap());
        let neutral = emoji::for_emotion(Emotion::Neutral);
        assert_eq!(frames[0].emotion, "HAPPY");
        assert_eq!(frames[0].emoji_suggestions, neutral);
        assert_eq!(frames[2].emoji_suggestions, neutral);
        assert_eq!(frames[3].emoji_suggestions, emoji::for_emotion(Emotion::Happy));
    }

    #[test]
    fn generated_text_replaces_typed_span() {
        let mut r = replay(SessionConfig::default());
        let frames = r.run(parse_script("type hey u\ngenerated Hello there").unwrap());
        assert_eq!(frames[1].field, "Hello there");
        assert_eq!(frames[1].typed_text, "Hello there");
    }
}
