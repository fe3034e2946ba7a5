use std::path::{Path, PathBuf};
use std::sync::Arc;

use moodkey_core::channel::ExternalChannel;
use moodkey_core::generation::GenerationParams;
use moodkey_core::settings::settings;
use moodkey_core::signal::EmotionSource;
use moodkey_core::telemetry::EventSink;
use moodkey_session::SessionConfig;

use crate::generation::GenerationService;

use super::callbacks::{
    FactoryAdapter, MkEngineFactory, MkEventTransport, MkHostConnection, TransportAdapter,
};
use super::{MkBenchmark, MkDictionary, MkEmotion, MkSession};

/// Process-wide services shared by every input session.
#[derive(uniffi::Object)]
pub struct MkEngine {
    pub(super) dict: Arc<MkDictionary>,
    pub(super) generation: Arc<GenerationService>,
    pub(super) channel: Arc<ExternalChannel>,
    pub(super) emotion: Arc<EmotionSource>,
    pub(super) telemetry: Option<Arc<EventSink>>,
}

#[uniffi::export]
impl MkEngine {
    /// `model_dir` is writable storage for the copied model asset.
    #[uniffi::constructor]
    pub(crate) fn new(
        dict: Arc<MkDictionary>,
        factory: Arc<dyn MkEngineFactory>,
        model_dir: String,
        transport: Option<Arc<dyn MkEventTransport>>,
    ) -> Arc<Self> {
        let s = settings();
        let generation = GenerationService::new(
            Arc::new(FactoryAdapter(factory)),
            GenerationParams::from(&s.generation),
            PathBuf::from(model_dir),
        );
        let channel = ExternalChannel::new(s.channel.clone(), s.suggestions.max_messages);
        let telemetry = transport.map(|t| {
            Arc::new(EventSink::new(
                s.telemetry.clone(),
                Arc::new(TransportAdapter(t)),
            ))
        });
        Arc::new(Self {
            dict,
            generation: Arc::new(generation),
            channel: Arc::new(channel),
            emotion: Arc::new(EmotionSource::new()),
            telemetry,
        })
    }

    fn create_session(&self, host: Option<Arc<dyn MkHostConnection>>) -> Arc<MkSession> {
        MkSession::new(self, SessionConfig::from(settings()), host)
    }

    /// Copy the bundled model and build the engine in the background.
    fn initialize_model(&self, asset_path: String) {
        self.generation.initialize(Path::new(&asset_path));
    }

    fn is_model_ready(&self) -> bool {
        self.generation.is_ready()
    }

    fn is_generating(&self) -> bool {
        self.generation.is_loading()
    }

    /// Blocking single-shot generation. Call off the UI thread.
    fn generate(&self, prompt: String) -> Option<String> {
        self.generation.generate(&prompt)
    }

    fn benchmark(&self) -> Option<MkBenchmark> {
        self.generation.benchmark().map(MkBenchmark::from)
    }

    fn start_listening(&self) {
        self.channel.start_listening();
    }

    /// Deliver an inbound notification. Returns false when it was dropped.
    fn receive_notification(&self, action: String, payload_json: String) -> bool {
        self.channel.receive(&action, &payload_json).is_some()
    }

    /// Emotion from the on-device classifier.
    fn publish_detected_emotion(&self, emotion: MkEmotion) {
        self.emotion.publish(emotion.into());
    }
}
