//! End-to-end pipeline scenarios using the stub camera and stub oracle.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use gate_sentry::{
    CameraConfig, CameraSource, FingerprintStore, FrameQueue, FrameSource, MatchConfig,
    MatchEngine, ModelArtifact, PipelineConfig, PipelineState, PipelineSupervisor, RecordingSink,
    StubOracle, ThrottleConfig, ThrottleController,
};

fn stub_source(frames: u64, queue: &Arc<FrameQueue>) -> FrameSource {
    let camera = CameraSource::new(CameraConfig {
        source: format!("stub://lobby?frames={}", frames),
        target_fps: 0,
        width: 32,
        height: 32,
    })
    .expect("stub camera");
    FrameSource::new(camera, Arc::clone(queue), 1.0)
}

fn write_artifact(path: &std::path::Path, id: u64, name: &str, encoding: Vec<f32>) {
    let artifact = ModelArtifact {
        encodings: vec![encoding],
        names: vec![name.to_string()],
        ids: vec![id],
    };
    std::fs::write(path, serde_json::to_string(&artifact).expect("serialize artifact"))
        .expect("write artifact");
}

#[test]
fn skips_every_other_frame_with_no_known_faces() {
    // Ten frames through a capacity-5 queue with frame_skip=2: all ten are
    // dequeued, five reach the oracle, nothing is greeted or reported.
    let dir = tempfile::tempdir().expect("tempdir");
    let model_path = dir.path().join("model.json");
    write_artifact(&model_path, 7, "Grace", vec![9.0; 128]);
    let mut store = FingerprintStore::new(&model_path);
    store.load().expect("load model");

    let queue = Arc::new(FrameQueue::new(5));
    let mut source = stub_source(10, &queue);
    let mut oracle = StubOracle::new();
    let mut sink = RecordingSink::new();
    let shutdown = AtomicBool::new(false);

    let mut supervisor = PipelineSupervisor::new(
        PipelineConfig {
            frame_skip: 2,
            staleness_poll: Duration::from_secs(3600),
            idle_wait: Duration::from_millis(5),
            ..PipelineConfig::default()
        },
        store,
        MatchEngine::new(MatchConfig::default()),
        ThrottleController::new(ThrottleConfig::default()),
    );

    let result = supervisor.start(&mut source, &queue, &mut oracle, &mut sink, &shutdown);

    // The camera dies after frame 10; every queued frame drains first.
    assert!(result.is_err());
    assert_eq!(supervisor.state(), PipelineState::Stopped);

    let stats = supervisor.stats();
    assert_eq!(stats.frames_seen, 10);
    assert_eq!(stats.frames_processed, 5);
    assert_eq!(stats.faces_detected, 0);
    assert_eq!(stats.faces_recognized, 0);
    assert!(sink.events.is_empty());
}

#[test]
fn model_reload_resets_report_cooldown() {
    // A matched identity consumes its report window on the first match.
    // Rewriting the artifact mid-run makes the store stale; the staleness
    // poll reloads it and clears cooldowns, so the same identity is reported
    // a second time well inside the original cooldown window.
    let dir = tempfile::tempdir().expect("tempdir");
    let model_path = dir.path().join("model.json");
    let encoding = StubOracle::encode_seed(b"grace");
    write_artifact(&model_path, 7, "Grace", encoding.clone());
    let mut store = FingerprintStore::new(&model_path);
    store.load().expect("load model");

    let queue = Arc::new(FrameQueue::new(8));
    let camera = CameraSource::new(CameraConfig {
        source: "stub://lobby".to_string(),
        target_fps: 0,
        width: 32,
        height: 32,
    })
    .expect("stub camera");
    let mut source = FrameSource::new(camera, Arc::clone(&queue), 1.0);
    let mut oracle = StubOracle::with_constant_face(encoding.clone());
    let mut sink = RecordingSink::new();

    let shutdown = Arc::new(AtomicBool::new(false));
    let rewriter = {
        let shutdown = Arc::clone(&shutdown);
        let model_path = model_path.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            write_artifact(&model_path, 7, "Grace", StubOracle::encode_seed(b"grace"));
            std::thread::sleep(Duration::from_millis(300));
            shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
        })
    };

    let mut supervisor = PipelineSupervisor::new(
        PipelineConfig {
            frame_skip: 1,
            staleness_poll: Duration::from_millis(50),
            idle_wait: Duration::from_millis(5),
            ..PipelineConfig::default()
        },
        store,
        MatchEngine::new(MatchConfig::default()),
        ThrottleController::new(ThrottleConfig::default()),
    );
    let result = supervisor.start(&mut source, &queue, &mut oracle, &mut sink, &shutdown);
    rewriter.join().expect("rewriter thread");

    // Shutdown is a clean stop, not a camera loss.
    assert!(result.is_ok());
    // One dispatch before the reload, exactly one after it; the 300-second
    // default cooldown would have allowed only one without the reset.
    assert_eq!(sink.events.len(), 2);
    assert!(sink.events.iter().all(|e| e.customer_id == 7));
}

#[test]
fn unrecognized_face_counts_but_never_reports() {
    // A face below tolerance is detected, not recognized, and never throttled
    // or reported.
    let dir = tempfile::tempdir().expect("tempdir");
    let model_path = dir.path().join("model.json");
    write_artifact(&model_path, 7, "Grace", vec![0.0; 128]);
    let mut store = FingerprintStore::new(&model_path);
    store.load().expect("load model");

    let queue = Arc::new(FrameQueue::new(8));
    let mut source = stub_source(4, &queue);
    // Far from the stored encoding: distance 2.0 against all-zeros.
    let probe = vec![2.0 / (128.0f32).sqrt(); 128];
    let mut oracle = StubOracle::with_constant_face(probe);
    let mut sink = RecordingSink::new();
    let shutdown = AtomicBool::new(false);

    let mut supervisor = PipelineSupervisor::new(
        PipelineConfig {
            frame_skip: 1,
            staleness_poll: Duration::from_secs(3600),
            idle_wait: Duration::from_millis(5),
            ..PipelineConfig::default()
        },
        store,
        MatchEngine::new(MatchConfig::default()),
        ThrottleController::new(ThrottleConfig::default()),
    );
    let _ = supervisor.start(&mut source, &queue, &mut oracle, &mut sink, &shutdown);

    let stats = supervisor.stats();
    assert_eq!(stats.faces_detected, 4);
    assert_eq!(stats.faces_recognized, 0);
    assert!(sink.events.is_empty());
}
