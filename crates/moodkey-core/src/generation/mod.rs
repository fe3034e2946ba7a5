//! Local text-generation contract.
//!
//! The model runtime itself lives outside this crate; it is reached through
//! `InferenceEngine` / `EngineFactory`. This module owns everything around it:
//! fixed generation parameters, model asset preparation, output cleanup and
//! benchmark bookkeeping.

mod asset;
mod bench;
mod cleanup;

pub use asset::prepare_model_asset;
pub use bench::{resident_memory_mb, BenchmarkData, StreamRecorder};
pub use cleanup::clean_markdown_fences;

use std::io;
use std::ops::ControlFlow;
use std::path::Path;

use crate::settings::GenerationSettings;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("engine not initialized")]
    NotReady,
    #[error("model asset error: {0}")]
    Asset(#[from] io::Error),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("generation superseded")]
    Cancelled,
}

/// Parameters the engine is constructed with. Fixed for the engine's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub top_k: u32,
    /// 0.0 = greedy.
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            top_k: 4,
            temperature: 0.0,
        }
    }
}

impl From<&GenerationSettings> for GenerationParams {
    fn from(s: &GenerationSettings) -> Self {
        Self {
            max_tokens: s.max_tokens,
            top_k: s.top_k,
            temperature: s.temperature,
        }
    }
}

/// A constructed model ready to answer prompts. Used by one generation at a time.
pub trait InferenceEngine: Send {
    /// Generate the full response in one call.
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationError>;

    /// Generate, handing each partial chunk to `on_partial` as it arrives.
    /// Returning `ControlFlow::Break(())` from the callback stops generation.
    fn generate_streaming(
        &mut self,
        prompt: &str,
        on_partial: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), GenerationError>;

    /// Prompt size in model tokens, when the runtime can tell.
    fn size_in_tokens(&self, _prompt: &str) -> usize {
        0
    }

    /// Release the runtime. Called exactly once, when the owner is dropped.
    fn close(&mut self) {}
}

pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        model_path: &Path,
        params: &GenerationParams,
    ) -> Result<Box<dyn InferenceEngine>, GenerationError>;
}
