//! Keyboard orchestration core for the moodkey input method.
//!
//! The host app owns views and platform services; everything else lives
//! behind the `api` module's UniFFI surface.

uniffi::setup_scaffolding!();

pub mod api;
pub mod generation;
pub mod trace_init;
