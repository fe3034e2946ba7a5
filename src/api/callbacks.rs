//! Host-implemented interfaces and their adapters onto the core traits.

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use moodkey_core::generation::{EngineFactory, GenerationError, GenerationParams, InferenceEngine};
use moodkey_core::telemetry::{EventEnvelope, EventTransport, TelemetryError};
use moodkey_session::InputConnection;

use super::{MkError, MkEventEnvelope};

// ---------------------------------------------------------------------------
// Foreign traits
// ---------------------------------------------------------------------------

/// The platform input connection of the focused text field.
#[uniffi::export(with_foreign)]
pub trait MkHostConnection: Send + Sync {
    fn commit_text(&self, text: String);
    fn delete_surrounding_code_points(&self, before: u32, after: u32);
    fn delete_surrounding_text(&self, before: u32, after: u32);
}

/// Delivers telemetry to the messenger app (broadcast on Android).
///
/// `send` runs on the engine's telemetry thread, one event at a time in
/// report order. A slow `send` delays later events but never key handling.
#[uniffi::export(with_foreign)]
pub trait MkEventTransport: Send + Sync {
    fn send(&self, envelope: MkEventEnvelope) -> Result<(), MkError>;
}

/// The on-device model runtime.
#[uniffi::export(with_foreign)]
pub trait MkInferenceEngine: Send + Sync {
    fn generate(&self, prompt: String) -> Result<String, MkError>;
    /// Push partial chunks into `sink` until done or until `push` returns false.
    fn generate_streaming(&self, prompt: String, sink: Arc<MkStreamSink>) -> Result<(), MkError>;
    fn size_in_tokens(&self, prompt: String) -> u32;
    fn close(&self);
}

#[uniffi::export(with_foreign)]
pub trait MkEngineFactory: Send + Sync {
    fn create(
        &self,
        model_path: String,
        max_tokens: u32,
        top_k: u32,
        temperature: f32,
    ) -> Result<Arc<dyn MkInferenceEngine>, MkError>;
}

// ---------------------------------------------------------------------------
// MkStreamSink
// ---------------------------------------------------------------------------

/// Receives partial output from a foreign engine.
#[derive(uniffi::Object)]
pub struct MkStreamSink {
    tx: Mutex<Option<mpsc::Sender<String>>>,
    cancelled: AtomicBool,
}

#[uniffi::export]
impl MkStreamSink {
    /// Returns false once the consumer has stopped listening.
    pub fn push(&self, partial: String) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx.send(partial).is_ok(),
            None => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl MkStreamSink {
    fn new(tx: mpsc::Sender<String>) -> Arc<Self> {
        Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            cancelled: AtomicBool::new(false),
        })
    }

    fn finish(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

pub(super) struct HostAdapter(pub(super) Arc<dyn MkHostConnection>);

impl InputConnection for HostAdapter {
    fn commit_text(&mut self, text: &str) {
        self.0.commit_text(text.to_string());
    }

    fn delete_surrounding_code_points(&mut self, before: usize, after: usize) {
        self.0
            .delete_surrounding_code_points(saturate(before), saturate(after));
    }

    fn delete_surrounding_text(&mut self, before: usize, after: usize) {
        self.0.delete_surrounding_text(saturate(before), saturate(after));
    }
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

pub(super) struct TransportAdapter(pub(super) Arc<dyn MkEventTransport>);

impl EventTransport for TransportAdapter {
    fn send(&self, e: EventEnvelope) -> Result<(), TelemetryError> {
        self.0
            .send(MkEventEnvelope {
                action: e.action,
                target_package: e.target_package,
                event_type: e.event_type,
                event_timestamp: e.event_timestamp,
                event_data: e.event_data,
            })
            .map_err(|err| TelemetryError::Transport(err.to_string()))
    }
}

pub(super) struct FactoryAdapter(pub(super) Arc<dyn MkEngineFactory>);

impl EngineFactory for FactoryAdapter {
    fn create(
        &self,
        model_path: &Path,
        params: &GenerationParams,
    ) -> Result<Box<dyn InferenceEngine>, GenerationError> {
        let engine = self
            .0
            .create(
                model_path.to_string_lossy().into_owned(),
                params.max_tokens,
                params.top_k,
                params.temperature,
            )
            .map_err(|e| GenerationError::Inference(e.to_string()))?;
        Ok(Box::new(EngineAdapter(engine)))
    }
}

struct EngineAdapter(Arc<dyn MkInferenceEngine>);

impl InferenceEngine for EngineAdapter {
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationError> {
        self.0
            .generate(prompt.to_string())
            .map_err(|e| GenerationError::Inference(e.to_string()))
    }

    /// The foreign call runs on a scoped thread while this thread forwards
    /// each chunk to `on_partial`.
    fn generate_streaming(
        &mut self,
        prompt: &str,
        on_partial: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), GenerationError> {
        let (tx, rx) = mpsc::channel::<String>();
        let sink = MkStreamSink::new(tx);

        thread::scope(|scope| {
            let producer = {
                let engine = Arc::clone(&self.0);
                let sink = Arc::clone(&sink);
                let prompt = prompt.to_string();
                scope.spawn(move || {
                    let result = engine.generate_streaming(prompt, Arc::clone(&sink));
                    sink.finish();
                    result
                })
            };
            for chunk in rx {
                if on_partial(&chunk).is_break() {
                    sink.cancel();
                    break;
                }
            }
            let result = producer
                .join()
                .map_err(|_| GenerationError::Inference("engine thread panicked".into()))?;
            result.map_err(|e| GenerationError::Inference(e.to_string()))?;
            if sink.cancelled.load(Ordering::SeqCst) {
                return Err(GenerationError::Cancelled);
            }
            Ok(())
        })
    }

    fn size_in_tokens(&self, prompt: &str) -> usize {
        self.0.size_in_tokens(prompt.to_string()) as usize
    }

    fn close(&mut self) {
        self.0.close();
    }
}
