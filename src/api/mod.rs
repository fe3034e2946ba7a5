//! UniFFI export layer: the Kotlin/Swift facing surface of the engine.
//!
//! Each public type here maps to a generated foreign class, record, or enum.

mod callbacks;
mod engine;
mod resources;
mod session;
mod types;

pub use callbacks::{
    MkEngineFactory, MkEventTransport, MkHostConnection, MkInferenceEngine, MkStreamSink,
};
pub use engine::MkEngine;
pub use resources::MkDictionary;
pub use session::MkSession;
pub use types::{
    MkAssistView, MkBenchmark, MkEmotion, MkError, MkEvent, MkEventEnvelope, MkKeyEvent,
    MkKeyResponse, MkTone,
};

use std::path::Path;

use moodkey_core::emoji;
use moodkey_core::generation::clean_markdown_fences;

// ---------------------------------------------------------------------------
// Top-level functions
// ---------------------------------------------------------------------------

#[uniffi::export]
fn engine_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Replace the built-in settings. Only the first call before any
/// `settings()` read takes effect.
#[uniffi::export]
fn settings_load_config(path: String) -> Result<(), MkError> {
    let content = std::fs::read_to_string(&path).map_err(|e| MkError::Io {
        msg: format!("{path}: {e}"),
    })?;
    moodkey_core::settings::init_custom(content)
        .map_err(|e| MkError::InvalidData { msg: e.to_string() })?;
    Ok(())
}

#[uniffi::export]
fn settings_default_config() -> String {
    moodkey_core::settings::default_toml().to_string()
}

#[uniffi::export]
fn trace_init(log_dir: String) {
    crate::trace_init::init_tracing(Path::new(&log_dir));
}

#[uniffi::export]
fn clean_model_output(text: String) -> String {
    clean_markdown_fences(&text)
}

#[uniffi::export]
fn emoji_for_emotion(emotion: MkEmotion) -> Vec<String> {
    emoji::for_emotion(emotion.into())
}
