//! Background generation: model initialization and a streaming worker.
//!
//! One worker thread owns the streaming queue. Tickets are issued per
//! [`GenerationKind`], so a reply request never cancels a rewrite. The worker
//! keeps only the newest waiting request of each kind and checks the ticket
//! before starting and at every partial. Every submission ends with exactly
//! one terminal event (`Done`, `Failed` or `Cancelled`) on the submitting
//! session's [`EventQueue`].

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use moodkey_core::generation::{
    clean_markdown_fences, prepare_model_asset, BenchmarkData, EngineFactory, GenerationError,
    GenerationParams, InferenceEngine, StreamRecorder,
};
use moodkey_session::GenerationKind;
use tracing::{debug, debug_span, info, warn};

// ---------------------------------------------------------------------------
// Work / event types
// ---------------------------------------------------------------------------

/// Output of the streaming worker, tagged with the session's generation id.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Partial {
        kind: GenerationKind,
        generation: u64,
        text: String,
    },
    Done {
        kind: GenerationKind,
        generation: u64,
        text: String,
    },
    Failed {
        kind: GenerationKind,
        generation: u64,
    },
    /// Superseded by a newer request of the same kind, or revoked.
    Cancelled {
        kind: GenerationKind,
        generation: u64,
    },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Partial { .. })
    }
}

/// Counts submissions that have not yet delivered their terminal event.
struct Outstanding(Arc<AtomicUsize>);

impl Drop for Outstanding {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct StreamWork {
    kind: GenerationKind,
    generation: u64,
    prompt: String,
    ticket: u64,
    events: mpsc::Sender<StreamEvent>,
    _outstanding: Outstanding,
}

impl StreamWork {
    fn partial(&self, text: &str) {
        let _ = self.events.send(StreamEvent::Partial {
            kind: self.kind,
            generation: self.generation,
            text: text.to_string(),
        });
    }

    /// Deliver the terminal event; the outstanding count drops afterwards.
    fn finish(self, event: StreamEvent) {
        let _ = self.events.send(event);
    }

    fn cancel(self) {
        let event = StreamEvent::Cancelled {
            kind: self.kind,
            generation: self.generation,
        };
        self.finish(event);
    }
}

/// Receiving end for one session's streaming output.
pub struct EventQueue {
    tx: mpsc::Sender<StreamEvent>,
    rx: Mutex<mpsc::Receiver<StreamEvent>>,
    outstanding: Arc<AtomicUsize>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// True until every submission through this queue has sent its
    /// terminal event.
    pub fn has_pending_work(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) > 0
    }

    pub fn try_recv(&self) -> Option<StreamEvent> {
        lock(&self.rx).try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<StreamEvent> {
        lock(&self.rx).recv_timeout(timeout).ok()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest ticket per generation kind.
#[derive(Default)]
struct Tickets {
    rewrite: AtomicU64,
    replies: AtomicU64,
}

impl Tickets {
    fn slot(&self, kind: GenerationKind) -> &AtomicU64 {
        match kind {
            GenerationKind::Rewrite => &self.rewrite,
            GenerationKind::Replies => &self.replies,
        }
    }

    fn issue(&self, kind: GenerationKind) -> u64 {
        self.slot(kind).fetch_add(1, Ordering::SeqCst) + 1
    }

    fn revoke(&self, kind: GenerationKind) {
        self.slot(kind).fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, kind: GenerationKind, ticket: u64) -> bool {
        self.slot(kind).load(Ordering::SeqCst) == ticket
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

struct Shared {
    engine: Mutex<Option<Box<dyn InferenceEngine>>>,
    init: Mutex<InitState>,
    init_changed: Condvar,
    closed: AtomicBool,
    busy: AtomicUsize,
    init_time_ms: AtomicU64,
    benchmark: Mutex<Option<BenchmarkData>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the service busy for its lifetime.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn new(busy: &'a AtomicUsize) -> Self {
        busy.fetch_add(1, Ordering::SeqCst);
        Self(busy)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// GenerationService
// ---------------------------------------------------------------------------

pub struct GenerationService {
    factory: Arc<dyn EngineFactory>,
    params: GenerationParams,
    model_dir: PathBuf,
    shared: Arc<Shared>,
    work_tx: mpsc::Sender<StreamWork>,
    tickets: Arc<Tickets>,
}

impl GenerationService {
    /// `model_dir` is the writable directory the model asset is copied into.
    pub fn new(factory: Arc<dyn EngineFactory>, params: GenerationParams, model_dir: PathBuf) -> Self {
        let shared = Arc::new(Shared {
            engine: Mutex::new(None),
            init: Mutex::new(InitState::Uninitialized),
            init_changed: Condvar::new(),
            closed: AtomicBool::new(false),
            busy: AtomicUsize::new(0),
            init_time_ms: AtomicU64::new(0),
            benchmark: Mutex::new(None),
        });
        let tickets = Arc::new(Tickets::default());

        let (work_tx, work_rx) = mpsc::channel::<StreamWork>();
        {
            let shared = Arc::clone(&shared);
            let tickets = Arc::clone(&tickets);
            let spawned = thread::Builder::new()
                .name("moodkey-generation".into())
                .spawn(move || stream_worker(work_rx, tickets, shared));
            if let Err(e) = spawned {
                warn!(error = %e, "failed to spawn generation worker");
            }
        }

        Self {
            factory,
            params,
            model_dir,
            shared,
            work_tx,
            tickets,
        }
    }

    /// Copy the model asset and construct the engine on a background thread.
    /// A no-op while initializing or once ready; retryable after failure.
    pub fn initialize(&self, asset: &Path) {
        {
            let mut state = lock(&self.shared.init);
            if *state != InitState::Uninitialized {
                debug!(state = ?*state, "initialize ignored");
                return;
            }
            *state = InitState::Initializing;
        }

        let shared = Arc::clone(&self.shared);
        let factory = Arc::clone(&self.factory);
        let params = self.params.clone();
        let asset = asset.to_path_buf();
        let model_dir = self.model_dir.clone();
        let spawned = thread::Builder::new()
            .name("moodkey-model-init".into())
            .spawn(move || init_engine(&shared, factory.as_ref(), &params, &asset, &model_dir));
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn model init");
            self.shared.set_init(InitState::Uninitialized);
        }
    }

    pub fn is_ready(&self) -> bool {
        *lock(&self.shared.init) == InitState::Ready
    }

    /// True while any generation is running.
    pub fn is_loading(&self) -> bool {
        self.shared.busy.load(Ordering::SeqCst) > 0
    }

    /// Block until initialization settles. Returns whether the engine is ready.
    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        let state = lock(&self.shared.init);
        let (state, _) = self
            .shared
            .init_changed
            .wait_timeout_while(state, timeout, |s| *s == InitState::Initializing)
            .unwrap_or_else(PoisonError::into_inner);
        *state == InitState::Ready
    }

    /// Single-shot generation on the calling thread with fences stripped.
    /// `None` when not ready or when the engine fails.
    pub fn generate(&self, prompt: &str) -> Option<String> {
        let _span = debug_span!("generate", prompt_len = prompt.len()).entered();
        if !self.is_ready() {
            debug!("engine not ready");
            return None;
        }
        let _loading = LoadingGuard::new(&self.shared.busy);
        let mut guard = lock(&self.shared.engine);
        let engine = guard.as_mut()?;

        let mut recorder = StreamRecorder::new(prompt, engine.size_in_tokens(prompt));
        match engine.generate(prompt) {
            Ok(raw) => {
                recorder.record(&raw);
                let (raw, bench) = recorder.finish(self.shared.init_time_ms.load(Ordering::SeqCst));
                *lock(&self.shared.benchmark) = Some(bench);
                Some(clean_markdown_fences(&raw))
            }
            Err(e) => {
                warn!(error = %e, "generation failed");
                None
            }
        }
    }

    /// Queue a streaming generation, superseding any queued or running
    /// request of the same kind. Output goes to `queue`.
    pub fn submit_streaming(
        &self,
        queue: &EventQueue,
        kind: GenerationKind,
        generation: u64,
        prompt: String,
    ) {
        let ticket = self.tickets.issue(kind);
        queue.outstanding.fetch_add(1, Ordering::SeqCst);
        let work = StreamWork {
            kind,
            generation,
            prompt,
            ticket,
            events: queue.tx.clone(),
            _outstanding: Outstanding(Arc::clone(&queue.outstanding)),
        };
        if let Err(mpsc::SendError(work)) = self.work_tx.send(work) {
            warn!("generation worker gone");
            work.finish(StreamEvent::Failed { kind, generation });
        }
    }

    /// Supersede in-flight work of `kind` without queueing a replacement.
    pub fn invalidate(&self, kind: GenerationKind) {
        self.tickets.revoke(kind);
    }

    /// Figures from the last completed generation.
    pub fn benchmark(&self) -> Option<BenchmarkData> {
        lock(&self.shared.benchmark).clone()
    }
}

impl Drop for GenerationService {
    fn drop(&mut self) {
        self.invalidate(GenerationKind::Rewrite);
        self.invalidate(GenerationKind::Replies);
        // Under the init lock so a concurrent init either sees `closed` or
        // has already installed its engine.
        let _state = lock(&self.shared.init);
        self.shared.closed.store(true, Ordering::SeqCst);
        if let Some(mut engine) = lock(&self.shared.engine).take() {
            engine.close();
            info!("generation engine closed");
        }
    }
}

impl Shared {
    fn set_init(&self, state: InitState) {
        *lock(&self.init) = state;
        self.init_changed.notify_all();
    }
}

// ---------------------------------------------------------------------------
// Worker threads
// ---------------------------------------------------------------------------

fn init_engine(
    shared: &Shared,
    factory: &dyn EngineFactory,
    params: &GenerationParams,
    asset: &Path,
    model_dir: &Path,
) {
    let _span = debug_span!("init_engine", asset = %asset.display()).entered();
    let started = Instant::now();
    let result = prepare_model_asset(asset, model_dir)
        .map_err(GenerationError::from)
        .and_then(|path| factory.create(&path, params));

    let mut state = lock(&shared.init);
    match result {
        Ok(mut engine) => {
            if shared.closed.load(Ordering::SeqCst) {
                engine.close();
                *state = InitState::Uninitialized;
                drop(state);
                shared.init_changed.notify_all();
                return;
            }
            let elapsed = started.elapsed().as_millis() as u64;
            shared.init_time_ms.store(elapsed, Ordering::SeqCst);
            *lock(&shared.engine) = Some(engine);
            *state = InitState::Ready;
            info!(init_ms = elapsed, "generation engine ready");
        }
        Err(e) => {
            warn!(error = %e, "model initialization failed");
            *state = InitState::Uninitialized;
        }
    }
    drop(state);
    shared.init_changed.notify_all();
}

fn stream_worker(rx: mpsc::Receiver<StreamWork>, tickets: Arc<Tickets>, shared: Arc<Shared>) {
    // At most one waiting request per kind, in arrival order.
    let mut waiting: Vec<StreamWork> = Vec::new();
    loop {
        if waiting.is_empty() {
            match rx.recv() {
                Ok(work) => enqueue(&mut waiting, work),
                Err(_) => break,
            }
        }
        while let Ok(work) = rx.try_recv() {
            enqueue(&mut waiting, work);
        }
        let work = waiting.remove(0);
        run_stream(work, &tickets, &shared);
    }
}

fn enqueue(waiting: &mut Vec<StreamWork>, work: StreamWork) {
    match waiting.iter_mut().find(|w| w.kind == work.kind) {
        Some(slot) => {
            let older = std::mem::replace(slot, work);
            debug!(kind = ?older.kind, generation = older.generation, "queued request superseded");
            older.cancel();
        }
        None => waiting.push(work),
    }
}

fn run_stream(work: StreamWork, tickets: &Tickets, shared: &Shared) {
    let _span = debug_span!("stream", kind = ?work.kind, generation = work.generation).entered();
    let event = if tickets.is_current(work.kind, work.ticket) {
        stream_once(&work, tickets, shared)
    } else {
        debug!("request revoked before start");
        StreamEvent::Cancelled {
            kind: work.kind,
            generation: work.generation,
        }
    };
    work.finish(event);
}

/// Run one request to its terminal event. Busy only while this runs.
fn stream_once(work: &StreamWork, tickets: &Tickets, shared: &Shared) -> StreamEvent {
    let (kind, generation, ticket) = (work.kind, work.generation, work.ticket);
    let _loading = LoadingGuard::new(&shared.busy);
    let mut guard = lock(&shared.engine);
    let Some(engine) = guard.as_mut() else {
        debug!("engine not ready");
        return StreamEvent::Failed { kind, generation };
    };

    let mut recorder = StreamRecorder::new(&work.prompt, engine.size_in_tokens(&work.prompt));
    let result = engine.generate_streaming(&work.prompt, &mut |chunk: &str| {
        if !tickets.is_current(kind, ticket) {
            return ControlFlow::Break(());
        }
        recorder.record(chunk);
        work.partial(chunk);
        ControlFlow::Continue(())
    });
    drop(guard);

    let superseded = !tickets.is_current(kind, ticket);
    match result {
        Ok(()) if !superseded => {
            let (text, bench) = recorder.finish(shared.init_time_ms.load(Ordering::SeqCst));
            debug!(tps = bench.tokens_per_second, ttft_ms = bench.ttft_ms, "stream done");
            *lock(&shared.benchmark) = Some(bench);
            StreamEvent::Done {
                kind,
                generation,
                text,
            }
        }
        Ok(()) | Err(GenerationError::Cancelled) => {
            debug!("stream superseded");
            StreamEvent::Cancelled { kind, generation }
        }
        Err(e) if superseded => {
            debug!(error = %e, "superseded stream failed");
            StreamEvent::Cancelled { kind, generation }
        }
        Err(e) => {
            warn!(error = %e, "streaming generation failed");
            StreamEvent::Failed { kind, generation }
        }
    }
}

#[cfg(test)]
mod tests;
