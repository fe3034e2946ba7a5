use std::time::Duration;

use moodkey_core::emoji;
use moodkey_core::emotion::Emotion;

use super::{host, make_session, type_text, RecordingConnection};
use crate::KeyEvent;

#[test]
fn typing_burst_recomputes_emoji_once() {
    let (mut session, clock) = make_session();
    session.receive_detected_emotion(Emotion::Sad);
    let mut conn = RecordingConnection::default();

    for c in ["o", "k", "a", "y"] {
        session.handle_key(host(&mut conn), KeyEvent::Character(c.into()));
        clock.advance(Duration::from_millis(200));
        assert!(session.poll().is_none());
    }
    assert!(session.next_deadline().is_some());

    clock.advance(Duration::from_millis(800));
    let resp = session.poll().expect("window elapsed");
    assert_eq!(resp.emoji_suggestions, Some(emoji::for_emotion(Emotion::Sad)));
    assert!(session.poll().is_none());
    assert!(session.next_deadline().is_none());
}

#[test]
fn detected_emotion_waits_for_debounce() {
    let (mut session, clock) = make_session();
    let resp = session.receive_detected_emotion(Emotion::Angry);
    assert_eq!(resp.emotion, Some(Emotion::Angry));
    assert_eq!(resp.emoji_suggestions, None);

    let mut conn = RecordingConnection::default();
    type_text(&mut session, &mut conn, "grr");
    clock.advance(Duration::from_millis(1000));
    session.poll();
    assert_eq!(session.emoji_suggestions(), emoji::for_emotion(Emotion::Angry).as_slice());
}

#[test]
fn same_text_after_window_is_suppressed() {
    let (mut session, clock) = make_session();
    let mut conn = RecordingConnection::default();
    type_text(&mut session, &mut conn, "a");
    clock.advance(Duration::from_millis(1000));
    assert!(session.poll().is_some());

    session.handle_key(host(&mut conn), KeyEvent::Character("b".into()));
    session.handle_key(host(&mut conn), KeyEvent::Delete);
    session.receive_detected_emotion(Emotion::Happy);
    clock.advance(Duration::from_millis(1000));
    assert!(session.poll().is_none());
    assert_eq!(session.emoji_suggestions(), emoji::for_emotion(Emotion::Neutral).as_slice());
}

#[test]
fn shift_does_not_restart_window() {
    let (mut session, clock) = make_session();
    let mut conn = RecordingConnection::default();
    type_text(&mut session, &mut conn, "a");
    let deadline = session.next_deadline();
    clock.advance(Duration::from_millis(500));
    session.handle_key(host(&mut conn), KeyEvent::Shift);
    assert_eq!(session.next_deadline(), deadline);
}
