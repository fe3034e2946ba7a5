//! Latest-value signals.
//!
//! A `LatestValue` slot keeps only the newest published value plus a version
//! counter. Subscribers poll and receive the newest value they have not seen;
//! values overwritten before a poll are skipped, never reordered.

use std::sync::{Arc, Mutex, PoisonError};

use crate::emotion::Emotion;

struct Slot<T> {
    version: u64,
    value: Option<T>,
}

pub struct LatestValue<T> {
    slot: Mutex<Slot<T>>,
}

impl<T: Clone> LatestValue<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                version: 0,
                value: None,
            }),
        }
    }

    /// Overwrite the current value. Returns the new version.
    pub fn publish(&self, value: T) -> u64 {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.version += 1;
        slot.value = Some(value);
        slot.version
    }

    pub fn latest(&self) -> Option<T> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    pub fn version(&self) -> u64 {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).version
    }

    /// Subscribe. The current value, if any, is delivered on the first poll.
    pub fn subscribe(self: &Arc<Self>) -> Subscription<T> {
        Subscription {
            slot: Arc::clone(self),
            seen: 0,
        }
    }
}

impl<T: Clone> Default for LatestValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscription<T> {
    slot: Arc<LatestValue<T>>,
    seen: u64,
}

impl<T: Clone> Subscription<T> {
    /// Newest unseen value, if the slot changed since the last poll.
    pub fn poll(&mut self) -> Option<T> {
        let slot = self
            .slot
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.version == self.seen {
            return None;
        }
        self.seen = slot.version;
        slot.value.clone()
    }
}

/// Continuous stream of classified emotions from the camera pipeline.
#[derive(Default)]
pub struct EmotionSource {
    slot: Arc<LatestValue<Emotion>>,
}

impl EmotionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, emotion: Emotion) {
        let version = self.slot.publish(emotion);
        tracing::trace!(%emotion, version, "emotion detected");
    }

    pub fn latest(&self) -> Option<Emotion> {
        self.slot.latest()
    }

    pub fn subscribe(&self) -> Subscription<Emotion> {
        self.slot.subscribe()
    }
}
