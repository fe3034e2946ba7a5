//! Inbound notifications from the messenger app.
//!
//! Three notification kinds, each landing in its own latest-value slot:
//! emotion updates, reply-option lists and messages-with-emotion snapshots.
//! Ordering is only guaranteed within a kind. Notifications that arrive
//! before `start_listening` are dropped for good.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::emotion::Emotion;
use crate::payload::{
    parse_or_default, EmotionUpdate, MessagesWithEmotion, ReplyOptionsUpdate,
};
use crate::settings::ChannelSettings;
use crate::signal::{LatestValue, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Emotion,
    ReplyOptions,
    Messages,
}

pub struct ExternalChannel {
    actions: ChannelSettings,
    max_messages: usize,
    listening: AtomicBool,
    emotion: Arc<LatestValue<Emotion>>,
    reply_options: Arc<LatestValue<Vec<String>>>,
    messages: Arc<LatestValue<MessagesWithEmotion>>,
}

impl ExternalChannel {
    pub fn new(actions: ChannelSettings, max_messages: usize) -> Self {
        Self {
            actions,
            max_messages,
            listening: AtomicBool::new(false),
            emotion: Arc::new(LatestValue::new()),
            reply_options: Arc::new(LatestValue::new()),
            messages: Arc::new(LatestValue::new()),
        }
    }

    /// Begin accepting notifications. Idempotent.
    pub fn start_listening(&self) {
        if !self.listening.swap(true, Ordering::SeqCst) {
            info!("external channel listening");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub fn kind_for(&self, action: &str) -> Option<NotificationKind> {
        if action == self.actions.emotion_action {
            Some(NotificationKind::Emotion)
        } else if action == self.actions.reply_options_action {
            Some(NotificationKind::ReplyOptions)
        } else if action == self.actions.messages_action {
            Some(NotificationKind::Messages)
        } else {
            None
        }
    }

    /// Deliver one notification. `payload` is the JSON-encoded extras.
    /// Returns the kind that was updated, or `None` if the notification was
    /// dropped (not listening, unknown action).
    pub fn receive(&self, action: &str, payload: &str) -> Option<NotificationKind> {
        if !self.is_listening() {
            debug!(action, "notification dropped: channel not listening");
            return None;
        }
        let Some(kind) = self.kind_for(action) else {
            debug!(action, "notification dropped: unknown action");
            return None;
        };
        match kind {
            NotificationKind::Emotion => {
                let update: EmotionUpdate = parse_or_default(payload);
                self.emotion.publish(update.emotion);
            }
            NotificationKind::ReplyOptions => {
                let update: ReplyOptionsUpdate = parse_or_default(payload);
                self.reply_options.publish(update.reply_options);
            }
            NotificationKind::Messages => {
                let mut snapshot: MessagesWithEmotion = parse_or_default(payload);
                snapshot.retain_recent(self.max_messages);
                self.messages.publish(snapshot);
            }
        }
        Some(kind)
    }

    pub fn subscribe_emotion(&self) -> Subscription<Emotion> {
        self.emotion.subscribe()
    }

    pub fn subscribe_reply_options(&self) -> Subscription<Vec<String>> {
        self.reply_options.subscribe()
    }

    pub fn subscribe_messages(&self) -> Subscription<MessagesWithEmotion> {
        self.messages.subscribe()
    }

    pub fn latest_messages(&self) -> Option<MessagesWithEmotion> {
        self.messages.latest()
    }
}
