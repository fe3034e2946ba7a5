use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use moodkey_core::emotion::Emotion;
use moodkey_core::payload::MessagesWithEmotion;
use moodkey_core::signal::Subscription;
use moodkey_session::{GenerationKind, InputConnection, InputSession, KeyResponse, SessionConfig};

use crate::generation::{EventQueue, GenerationService, StreamEvent};

use super::callbacks::{HostAdapter, MkHostConnection};
use super::types::{convert_to_events, push_events};
use super::{MkAssistView, MkEngine, MkEvent, MkKeyEvent, MkKeyResponse, MkTone};

/// Latest-value subscriptions drained on every poll.
struct Inbox {
    channel_emotion: Subscription<Emotion>,
    detected_emotion: Subscription<Emotion>,
    reply_options: Subscription<Vec<String>>,
    messages: Subscription<MessagesWithEmotion>,
}

#[derive(uniffi::Object)]
pub struct MkSession {
    host: Mutex<Option<Arc<dyn MkHostConnection>>>,
    session: Mutex<InputSession>,
    inbox: Mutex<Inbox>,
    generation: Arc<GenerationService>,
    /// Streaming output for this session only.
    events: EventQueue,
}

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[uniffi::export]
impl MkSession {
    /// Replace the host connection; `None` turns key handling into a no-op.
    fn set_host(&self, host: Option<Arc<dyn MkHostConnection>>) {
        *lock(&self.host) = host;
    }

    fn on_show(&self) -> MkKeyResponse {
        let mut session = lock(&self.session);
        let resp = session.on_show();
        self.finish(&session, resp)
    }

    fn on_hide_view(&self) -> MkKeyResponse {
        let mut session = lock(&self.session);
        let resp = session.on_hide_view();
        self.finish(&session, resp)
    }

    fn on_hide_session(&self) -> MkKeyResponse {
        let mut session = lock(&self.session);
        let resp = session.on_hide_session();
        self.finish(&session, resp)
    }

    fn handle_key(&self, event: MkKeyEvent) -> MkKeyResponse {
        let mut host = self.host_adapter();
        let mut session = lock(&self.session);
        let resp = session.handle_key(as_connection(&mut host), event.into());
        self.finish(&session, resp)
    }

    fn apply_generated_text(&self, text: String) -> MkKeyResponse {
        let mut host = self.host_adapter();
        let mut session = lock(&self.session);
        let resp = session.apply_generated_text(as_connection(&mut host), &text);
        self.finish(&session, resp)
    }

    fn request_rewrite(&self, tone: MkTone) -> MkKeyResponse {
        let mut session = lock(&self.session);
        let resp = session.request_rewrite(tone.into());
        self.finish(&session, resp)
    }

    fn accept_rewrite(&self) -> MkKeyResponse {
        let mut host = self.host_adapter();
        let mut session = lock(&self.session);
        let resp = session.accept_rewrite(as_connection(&mut host));
        self.finish(&session, resp)
    }

    fn discard_rewrite(&self) -> MkKeyResponse {
        let mut session = lock(&self.session);
        let resp = session.discard_rewrite();
        self.finish(&session, resp)
    }

    /// Drain external notifications, generation output and due debounces.
    fn poll(&self) -> Option<MkKeyResponse> {
        let generation_pending = self.events.has_pending_work();
        let mut session = lock(&self.session);
        let mut events = Vec::new();

        {
            let mut inbox = lock(&self.inbox);
            if let Some(emotion) = inbox.channel_emotion.poll() {
                self.absorb(&mut events, session.receive_emotion(emotion));
            }
            if let Some(emotion) = inbox.detected_emotion.poll() {
                self.absorb(&mut events, session.receive_detected_emotion(emotion));
            }
            if let Some(options) = inbox.reply_options.poll() {
                self.absorb(&mut events, session.receive_reply_options(options));
            }
            if let Some(snapshot) = inbox.messages.poll() {
                self.absorb(&mut events, session.receive_messages(snapshot));
            }
        }

        while let Some(event) = self.events.try_recv() {
            let resp = match event {
                StreamEvent::Partial {
                    kind,
                    generation,
                    text,
                } => session.receive_partial(kind, generation, &text),
                StreamEvent::Done {
                    kind,
                    generation,
                    text,
                } => session.receive_generated(kind, generation, &text),
                StreamEvent::Failed { kind, generation }
                | StreamEvent::Cancelled { kind, generation } => {
                    session.receive_generation_failed(kind, generation)
                }
            };
            if let Some(resp) = resp {
                self.absorb(&mut events, resp);
            }
        }

        if let Some(resp) = session.poll() {
            self.absorb(&mut events, resp);
        }

        if generation_pending || self.has_pending_work(&session) {
            events.push(MkEvent::SchedulePoll);
        }
        if events.is_empty() {
            return None;
        }
        Some(MkKeyResponse {
            consumed: true,
            events,
        })
    }

    /// Milliseconds until the next debounce deadline, if one is pending.
    fn next_poll_delay_ms(&self) -> Option<u64> {
        let deadline = lock(&self.session).next_deadline()?;
        Some(
            deadline
                .saturating_duration_since(Instant::now())
                .as_millis() as u64,
        )
    }

    fn typed_text(&self) -> String {
        lock(&self.session).typed_text().to_string()
    }

    fn assist_view(&self) -> MkAssistView {
        lock(&self.session).assist_view().into()
    }
}

impl MkSession {
    pub(super) fn new(
        engine: &MkEngine,
        config: SessionConfig,
        host: Option<Arc<dyn MkHostConnection>>,
    ) -> Arc<Self> {
        let mut session = InputSession::new(Arc::clone(&engine.dict.inner), config);
        session.set_telemetry(engine.telemetry.clone());
        let inbox = Inbox {
            channel_emotion: engine.channel.subscribe_emotion(),
            detected_emotion: engine.emotion.subscribe(),
            reply_options: engine.channel.subscribe_reply_options(),
            messages: engine.channel.subscribe_messages(),
        };
        Arc::new(Self {
            host: Mutex::new(host),
            session: Mutex::new(session),
            inbox: Mutex::new(inbox),
            generation: Arc::clone(&engine.generation),
            events: EventQueue::new(),
        })
    }

    fn host_adapter(&self) -> Option<HostAdapter> {
        lock(&self.host).clone().map(HostAdapter)
    }

    /// Hand generation work to the service, then convert for the host.
    fn finish(&self, session: &InputSession, mut resp: KeyResponse) -> MkKeyResponse {
        self.dispatch(&mut resp);
        convert_to_events(resp, self.has_pending_work(session))
    }

    fn absorb(&self, events: &mut Vec<MkEvent>, mut resp: KeyResponse) {
        self.dispatch(&mut resp);
        push_events(events, resp);
    }

    fn dispatch(&self, resp: &mut KeyResponse) {
        if resp.cancel_rewrite {
            self.generation.invalidate(GenerationKind::Rewrite);
        }
        if let Some(req) = resp.generation_request.take() {
            self.generation
                .submit_streaming(&self.events, req.kind, req.generation, req.prompt);
        }
    }

    fn has_pending_work(&self, session: &InputSession) -> bool {
        session.next_deadline().is_some() || self.events.has_pending_work()
    }
}

fn as_connection(host: &mut Option<HostAdapter>) -> Option<&mut dyn InputConnection> {
    host.as_mut().map(|h| h as &mut dyn InputConnection)
}
