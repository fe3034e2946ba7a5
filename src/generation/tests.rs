use std::fs;
use std::sync::atomic::AtomicUsize;

use super::*;

#[derive(Clone, Default)]
struct Script {
    reply: String,
    chunk_delay: Duration,
    fail: bool,
    /// Stream the prompt back instead of `reply`.
    echo: bool,
}

struct FakeEngine {
    script: Script,
    closed: Arc<AtomicUsize>,
}

impl InferenceEngine for FakeEngine {
    fn generate(&mut self, _prompt: &str) -> Result<String, GenerationError> {
        if self.script.fail {
            return Err(GenerationError::Inference("boom".into()));
        }
        Ok(self.script.reply.clone())
    }

    fn generate_streaming(
        &mut self,
        prompt: &str,
        on_partial: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), GenerationError> {
        if self.script.fail {
            return Err(GenerationError::Inference("boom".into()));
        }
        let text = if self.script.echo { prompt } else { self.script.reply.as_str() };
        for word in text.split_inclusive(' ') {
            thread::sleep(self.script.chunk_delay);
            if on_partial(word).is_break() {
                return Err(GenerationError::Cancelled);
            }
        }
        Ok(())
    }

    fn size_in_tokens(&self, prompt: &str) -> usize {
        prompt.split_whitespace().count()
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeFactory {
    script: Script,
    created: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl FakeFactory {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            created: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl EngineFactory for FakeFactory {
    fn create(
        &self,
        model_path: &Path,
        params: &GenerationParams,
    ) -> Result<Box<dyn InferenceEngine>, GenerationError> {
        assert!(model_path.exists());
        assert_eq!(params.top_k, 4);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeEngine {
            script: self.script.clone(),
            closed: Arc::clone(&self.closed),
        }))
    }
}

const WAIT: Duration = Duration::from_secs(5);

fn setup(script: Script) -> (tempfile::TempDir, Arc<FakeFactory>, GenerationService, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let asset = dir.path().join("gemma-3-1b.task");
    fs::write(&asset, b"weights").unwrap();
    let factory = FakeFactory::new(script);
    let service = GenerationService::new(
        factory.clone(),
        GenerationParams::default(),
        dir.path().join("models"),
    );
    (dir, factory, service, asset)
}

fn ready(script: Script) -> (tempfile::TempDir, Arc<FakeFactory>, GenerationService) {
    let (dir, factory, service, asset) = setup(script);
    service.initialize(&asset);
    assert!(service.wait_until_settled(WAIT));
    (dir, factory, service)
}

/// Collect events until `terminals` terminal events have arrived.
fn collect_terminals(queue: &EventQueue, terminals: usize) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    let mut seen = 0;
    while seen < terminals {
        let Some(event) = queue.recv_timeout(WAIT) else {
            break;
        };
        seen += usize::from(event.is_terminal());
        events.push(event);
    }
    events
}

fn partial_text(events: &[StreamEvent], generation: u64) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Partial {
                generation: g,
                text,
                ..
            } if *g == generation => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn terminal_for(events: &[StreamEvent], kind: GenerationKind) -> Option<&StreamEvent> {
    events.iter().find(|e| {
        matches!(e, StreamEvent::Done { kind: k, .. }
            | StreamEvent::Failed { kind: k, .. }
            | StreamEvent::Cancelled { kind: k, .. } if *k == kind)
    })
}

fn slow(reply: &str) -> Script {
    Script {
        reply: reply.into(),
        chunk_delay: Duration::from_millis(20),
        ..Script::default()
    }
}

#[test]
fn generate_before_init_is_none() {
    let (_dir, _factory, service, _asset) = setup(Script::default());
    assert!(!service.is_ready());
    assert_eq!(service.generate("hi"), None);
    assert!(!service.is_loading());
}

#[test]
fn initialize_copies_asset_once() {
    let (dir, factory, service, asset) = setup(Script::default());
    service.initialize(&asset);
    assert!(service.wait_until_settled(WAIT));
    service.initialize(&asset);
    assert!(service.wait_until_settled(WAIT));
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    assert!(dir.path().join("models").join("gemma-3-1b.task").exists());
}

#[test]
fn failed_init_can_be_retried() {
    let (dir, factory, service, _asset) = setup(Script::default());
    let missing = dir.path().join("absent.task");
    service.initialize(&missing);
    assert!(!service.wait_until_settled(WAIT));
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);

    fs::write(&missing, b"weights").unwrap();
    service.initialize(&missing);
    assert!(service.wait_until_settled(WAIT));
}

#[test]
fn generate_strips_fences() {
    let (_dir, _factory, service) = ready(Script {
        reply: "```json\n{\"suggestions\":[\"ok\"]}\n```".into(),
        ..Script::default()
    });
    assert_eq!(
        service.generate("prompt").as_deref(),
        Some("\n{\"suggestions\":[\"ok\"]}\n")
    );
    assert!(!service.is_loading());
    let bench = service.benchmark().unwrap();
    assert_eq!(bench.prompt_length, "prompt".len());
}

#[test]
fn generate_failure_clears_loading() {
    let (_dir, _factory, service) = ready(Script {
        fail: true,
        ..Script::default()
    });
    assert_eq!(service.generate("prompt"), None);
    assert!(!service.is_loading());
}

#[test]
fn streaming_emits_partials_then_done() {
    let (_dir, _factory, service) = ready(Script {
        reply: "Hey there friend".into(),
        ..Script::default()
    });
    let queue = EventQueue::new();
    service.submit_streaming(&queue, GenerationKind::Rewrite, 3, "p".into());
    let events = collect_terminals(&queue, 1);

    assert_eq!(partial_text(&events, 3), "Hey there friend");
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Done {
            kind: GenerationKind::Rewrite,
            generation: 3,
            text: "Hey there friend".into(),
        })
    );
    assert!(!queue.has_pending_work());
    let bench = service.benchmark().unwrap();
    assert_eq!(bench.response_length, "Hey there friend".len());
}

#[test]
fn streaming_failure_reports_failed() {
    let (_dir, _factory, service) = ready(Script {
        fail: true,
        ..Script::default()
    });
    let queue = EventQueue::new();
    service.submit_streaming(&queue, GenerationKind::Rewrite, 1, "p".into());
    let events = collect_terminals(&queue, 1);
    assert_eq!(
        events,
        vec![StreamEvent::Failed {
            kind: GenerationKind::Rewrite,
            generation: 1,
        }]
    );
    assert!(!queue.has_pending_work());
}

#[test]
fn streaming_before_init_fails() {
    let (_dir, _factory, service, _asset) = setup(Script::default());
    let queue = EventQueue::new();
    service.submit_streaming(&queue, GenerationKind::Replies, 4, "p".into());
    assert_eq!(
        collect_terminals(&queue, 1),
        vec![StreamEvent::Failed {
            kind: GenerationKind::Replies,
            generation: 4,
        }]
    );
}

#[test]
fn newer_request_cancels_running_one() {
    let (_dir, _factory, service) = ready(slow("a b c d e f g h i j"));
    let queue = EventQueue::new();
    service.submit_streaming(&queue, GenerationKind::Rewrite, 1, "old".into());
    thread::sleep(Duration::from_millis(50));
    service.submit_streaming(&queue, GenerationKind::Rewrite, 2, "new".into());

    let events = collect_terminals(&queue, 2);
    assert!(events.contains(&StreamEvent::Cancelled {
        kind: GenerationKind::Rewrite,
        generation: 1,
    }));
    assert!(!events
        .iter()
        .any(|e| matches!(e, StreamEvent::Done { generation: 1, .. })));
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Done { generation: 2, .. })
    ));
    assert!(!queue.has_pending_work());
}

#[test]
fn queued_request_replaced_before_start_is_cancelled() {
    let (_dir, _factory, service) = ready(slow("a b c d e"));
    let queue = EventQueue::new();
    service.submit_streaming(&queue, GenerationKind::Replies, 1, "busy".into());
    thread::sleep(Duration::from_millis(30));
    service.submit_streaming(&queue, GenerationKind::Rewrite, 1, "first".into());
    service.submit_streaming(&queue, GenerationKind::Rewrite, 2, "second".into());

    let events = collect_terminals(&queue, 3);
    assert_eq!(partial_text(&events, 1).len(), "a b c d e".len());
    assert!(events.contains(&StreamEvent::Cancelled {
        kind: GenerationKind::Rewrite,
        generation: 1,
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        StreamEvent::Done {
            kind: GenerationKind::Rewrite,
            generation: 2,
            ..
        }
    )));
    assert!(!queue.has_pending_work());
}

#[test]
fn reply_request_leaves_running_rewrite_alone() {
    let (_dir, _factory, service) = ready(slow("a b c d e f"));
    let queue = EventQueue::new();
    service.submit_streaming(&queue, GenerationKind::Rewrite, 1, "rewrite".into());
    thread::sleep(Duration::from_millis(50));
    service.submit_streaming(&queue, GenerationKind::Replies, 1, "replies".into());

    let events = collect_terminals(&queue, 2);
    assert!(matches!(
        terminal_for(&events, GenerationKind::Rewrite),
        Some(StreamEvent::Done { text, .. }) if text == "a b c d e f"
    ));
    assert!(matches!(
        terminal_for(&events, GenerationKind::Replies),
        Some(StreamEvent::Done { .. })
    ));
}

#[test]
fn invalidate_cancels_only_its_kind() {
    let (_dir, _factory, service) = ready(slow("a b c d e f g h i j"));
    let queue = EventQueue::new();
    service.submit_streaming(&queue, GenerationKind::Replies, 1, "replies".into());
    service.submit_streaming(&queue, GenerationKind::Rewrite, 1, "rewrite".into());
    thread::sleep(Duration::from_millis(50));
    service.invalidate(GenerationKind::Rewrite);

    let events = collect_terminals(&queue, 2);
    assert_eq!(
        terminal_for(&events, GenerationKind::Rewrite),
        Some(&StreamEvent::Cancelled {
            kind: GenerationKind::Rewrite,
            generation: 1,
        })
    );
    assert!(matches!(
        terminal_for(&events, GenerationKind::Replies),
        Some(StreamEvent::Done { .. })
    ));
    assert!(!queue.has_pending_work());
    assert!(!service.is_loading());
}

#[test]
fn invalidate_mid_stream_sends_cancelled() {
    let (_dir, _factory, service) = ready(slow("a b c d e f g h i j"));
    let queue = EventQueue::new();
    service.submit_streaming(&queue, GenerationKind::Rewrite, 1, "p".into());
    thread::sleep(Duration::from_millis(50));
    service.invalidate(GenerationKind::Rewrite);

    let events = collect_terminals(&queue, 1);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Cancelled {
            kind: GenerationKind::Rewrite,
            generation: 1,
        })
    );
    assert!(partial_text(&events, 1).len() < "a b c d e f g h i j".len());
    assert!(!queue.has_pending_work());
}

#[test]
fn output_reaches_only_the_submitting_queue() {
    let (_dir, _factory, service) = ready(Script {
        chunk_delay: Duration::from_millis(20),
        echo: true,
        ..Script::default()
    });
    let first = EventQueue::new();
    let second = EventQueue::new();
    service.submit_streaming(
        &first,
        GenerationKind::Rewrite,
        1,
        "old session text here".into(),
    );
    thread::sleep(Duration::from_millis(50));
    service.submit_streaming(&second, GenerationKind::Rewrite, 1, "fresh words".into());

    let events = collect_terminals(&second, 1);
    assert_eq!(partial_text(&events, 1), "fresh words");
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Done { text, .. }) if text == "fresh words"
    ));

    let stale = collect_terminals(&first, 1);
    assert!(!partial_text(&stale, 1).contains("fresh"));
    assert_eq!(
        stale.last(),
        Some(&StreamEvent::Cancelled {
            kind: GenerationKind::Rewrite,
            generation: 1,
        })
    );
}

#[test]
fn drop_closes_engine_once() {
    let (_dir, factory, service) = ready(Script::default());
    drop(service);
    assert_eq!(factory.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn drop_without_engine_closes_nothing() {
    let (_dir, factory, service, _asset) = setup(Script::default());
    drop(service);
    assert_eq!(factory.closed.load(Ordering::SeqCst), 0);
}
