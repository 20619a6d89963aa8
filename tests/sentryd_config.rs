use std::sync::Mutex;

use tempfile::NamedTempFile;

use gate_sentry::config::SentryConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SENTRY_CONFIG",
        "SENTRY_CAMERA_SOURCE",
        "SENTRY_MODEL_PATH",
        "SENTRY_ACCESS_LOG_URL",
        "SENTRY_CAMERA_LOCATION",
        "SENTRY_QUEUE_CAPACITY",
        "SENTRY_REPORT_COOLDOWN_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": {
            "source": "http://camera-1/stream",
            "target_fps": 12,
            "width": 800,
            "height": 600
        },
        "queue_capacity": 16,
        "downscale": 0.25,
        "recognition": {
            "tolerance": 0.55,
            "min_confidence": 0.6,
            "frame_skip": 3
        },
        "cooldowns": {
            "greeting_secs": 10,
            "report_secs": 600
        },
        "model": {
            "path": "prod_model.json",
            "poll_secs": 15
        },
        "access_log": {
            "base_url": "http://logs.internal:8000",
            "timeout_secs": 2,
            "camera_location": "Loading Bay",
            "attach_snapshot": true
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SENTRY_CONFIG", file.path());
    std::env::set_var("SENTRY_CAMERA_SOURCE", "stub://override");
    std::env::set_var("SENTRY_REPORT_COOLDOWN_SECS", "120");

    let cfg = SentryConfig::load().expect("load config");

    assert_eq!(cfg.camera.source, "stub://override");
    assert_eq!(cfg.camera.target_fps, 12);
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert_eq!(cfg.queue_capacity, 16);
    assert!((cfg.downscale - 0.25).abs() < 1e-6);
    assert!((cfg.recognition.tolerance - 0.55).abs() < 1e-6);
    assert!((cfg.recognition.min_confidence - 0.6).abs() < 1e-6);
    assert_eq!(cfg.recognition.frame_skip, 3);
    assert_eq!(cfg.cooldowns.greeting.as_secs(), 10);
    assert_eq!(cfg.cooldowns.report.as_secs(), 120);
    assert_eq!(cfg.model.path, "prod_model.json");
    assert_eq!(cfg.model.poll_interval.as_secs(), 15);
    assert_eq!(cfg.access_log.base_url, "http://logs.internal:8000");
    assert_eq!(cfg.access_log.timeout.as_secs(), 2);
    assert_eq!(cfg.access_log.camera_location, "Loading Bay");
    assert!(cfg.access_log.attach_snapshot);

    clear_env();
}

#[test]
fn defaults_apply_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SentryConfig::load().expect("load defaults");

    assert_eq!(cfg.camera.source, "stub://front_door");
    assert_eq!(cfg.queue_capacity, 32);
    assert_eq!(cfg.recognition.frame_skip, 2);
    assert!((cfg.recognition.tolerance - 0.6).abs() < 1e-6);
    assert_eq!(cfg.cooldowns.greeting.as_secs(), 5);
    assert_eq!(cfg.cooldowns.report.as_secs(), 300);
    assert_eq!(cfg.model.poll_interval.as_secs(), 30);
    assert_eq!(cfg.access_log.timeout.as_secs(), 5);
    assert!(!cfg.access_log.attach_snapshot);

    clear_env();
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"recognition": {"frame_skip": 0}}"#)
        .expect("write config");
    std::env::set_var("SENTRY_CONFIG", file.path());

    let err = SentryConfig::load().unwrap_err();
    assert!(err.to_string().contains("frame_skip"));

    clear_env();
}
