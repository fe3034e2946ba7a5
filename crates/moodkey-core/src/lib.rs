pub mod channel;
pub mod dict;
pub mod emoji;
pub mod emotion;
pub mod generation;
pub mod payload;
pub mod prompts;
pub mod settings;
pub mod signal;
pub mod telemetry;
