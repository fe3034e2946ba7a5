mod debounce;

use std::sync::Arc;

use moodkey_core::dict::{BigramIndex, DictionaryIndex};

use super::{InputConnection, InputSession, ManualClock, SessionConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum HostOp {
    Commit(String),
    DeleteCodePoints(usize),
    DeleteText(usize),
}

/// Host text field that records every call and mirrors the resulting text.
#[derive(Default)]
pub(super) struct RecordingConnection {
    pub(super) ops: Vec<HostOp>,
    pub(super) text: String,
}

impl RecordingConnection {
    pub(super) fn commits(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                HostOp::Commit(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl InputConnection for RecordingConnection {
    fn commit_text(&mut self, text: &str) {
        self.ops.push(HostOp::Commit(text.to_string()));
        self.text.push_str(text);
    }

    fn delete_surrounding_code_points(&mut self, before: usize, _after: usize) {
        self.ops.push(HostOp::DeleteCodePoints(before));
        for _ in 0..before {
            self.text.pop();
        }
    }

    fn delete_surrounding_text(&mut self, before: usize, _after: usize) {
        self.ops.push(HostOp::DeleteText(before));
        let keep = self.text.encode_utf16().count().saturating_sub(before);
        let units: Vec<u16> = self.text.encode_utf16().take(keep).collect();
        self.text = String::from_utf16_lossy(&units);
    }
}

pub(super) fn host(conn: &mut RecordingConnection) -> Option<&mut dyn InputConnection> {
    Some(conn)
}

pub(super) fn make_test_dict() -> Arc<DictionaryIndex> {
    let dict = DictionaryIndex::new();
    dict.install(BigramIndex::from_pairs(vec![
        (
            "hello".to_string(),
            vec![
                ("world".to_string(), 5),
                ("there".to_string(), 3),
                ("friend".to_string(), 1),
            ],
        ),
        (
            "good".to_string(),
            vec![("morning".to_string(), 9), ("luck".to_string(), 4)],
        ),
        ("world".to_string(), vec![("peace".to_string(), 2)]),
    ]));
    Arc::new(dict)
}

pub(super) fn make_session() -> (InputSession, ManualClock) {
    make_session_with(SessionConfig::default())
}

pub(super) fn make_session_with(config: SessionConfig) -> (InputSession, ManualClock) {
    let clock = ManualClock::new();
    let mut session = InputSession::with_clock(make_test_dict(), config, Box::new(clock.clone()));
    session.on_show();
    (session, clock)
}

pub(super) fn type_text(session: &mut InputSession, conn: &mut RecordingConnection, text: &str) {
    for c in text.chars() {
        let event = if c == ' ' {
            super::KeyEvent::Space
        } else {
            super::KeyEvent::Character(c.to_string())
        };
        session.handle_key(host(conn), event);
    }
}
