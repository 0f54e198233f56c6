use fieldbot::config::Config;
use fieldbot::error::ConfigError;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

fn base() -> Value {
    json!({
        "BRAIN_ADDR": "127.0.0.1:7878",
        "REQUEST_TIMEOUT_MS": 2000,
        "LISTEN_INTERVAL_MS": 100,
        "DISPLAY_INTERVAL_MS": 1000,
        "ACTUATOR_DEV": "/dev/ttyACM0",
        "ACTUATOR_BAUD": 9600,
        "ACTUATOR_TIMEOUT_MS": 10000,
        "CAMERA_INDEX": 0,
        "CAMERA_TALL_THRESHOLD": 120,
        "NUM_ROWS": 4,
        "NUM_PLANTS": 12,
        "SLOTS_PER_ROW": 6,
        "RUN_TIME": 300,
        "GIVE_UP_TIME": 30,
        "STORE_DIR": "events"
    })
}

fn with(key: &str, value: Value) -> String {
    let mut v = base();
    v[key] = value;
    v.to_string()
}

fn without(key: &str) -> String {
    let mut v = base();
    v.as_object_mut().expect("object").remove(key);
    v.to_string()
}

fn invalid_key(result: Result<Config, ConfigError>) -> &'static str {
    match result {
        Err(ConfigError::Invalid { key, .. }) => key,
        other => panic!("expected an invalid value error, got {:?}", other),
    }
}

#[test]
fn test_valid_config_with_defaults() {
    let config = Config::from_json(&base().to_string()).expect("valid config");

    assert_eq!(config.brain_addr, "127.0.0.1:7878");
    assert_eq!(config.camera_dir, "camera");
    assert_eq!(config.camera_flush, 30);
    assert_eq!(config.store_bucket_format, "%Y%m%d");
    assert_eq!(config.store_collection, "events");
    assert_eq!(config.max_consecutive_failures, 10);
    assert_eq!(config.backoff_base_ms, 100);
    assert_eq!(config.backoff_max_ms, 5000);
    assert_eq!(config.bridge_idle_timeout(), Duration::from_secs(60));

    assert_eq!(config.run_time(), Duration::from_secs(300));
    assert_eq!(config.give_up_time(), Duration::from_secs(30));
    assert_eq!(config.listen_interval(), Duration::from_millis(100));
    assert_eq!(config.camera_path(), PathBuf::from("camera").join("0"));
    assert_eq!(config.planner().slots_per_row, 6);
    assert_eq!(config.classifier().tall_threshold, 120);
}

#[test]
fn test_unknown_key_rejected() {
    let result = Config::from_json(&with("CAMERA_FPS", json!(30)));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_key_rejected() {
    let result = Config::from_json(&without("NUM_ROWS"));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_wrong_type_rejected() {
    let result = Config::from_json(&with("RUN_TIME", json!("five minutes")));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_give_up_must_be_inside_run_time() {
    assert_eq!(invalid_key(Config::from_json(&with("GIVE_UP_TIME", json!(300)))), "GIVE_UP_TIME");
    assert_eq!(invalid_key(Config::from_json(&with("GIVE_UP_TIME", json!(301)))), "GIVE_UP_TIME");
    assert!(Config::from_json(&with("GIVE_UP_TIME", json!(0))).is_ok());
}

#[test]
fn test_out_of_range_values() {
    assert_eq!(invalid_key(Config::from_json(&with("NUM_ROWS", json!(0)))), "NUM_ROWS");
    assert_eq!(invalid_key(Config::from_json(&with("ACTUATOR_BAUD", json!(0)))), "ACTUATOR_BAUD");
    assert_eq!(invalid_key(Config::from_json(&with("BRAIN_ADDR", json!("localhost")))), "BRAIN_ADDR");
    assert_eq!(invalid_key(Config::from_json(&with("BRAIN_ADDR", json!("host:port")))), "BRAIN_ADDR");
    assert_eq!(invalid_key(Config::from_json(&with("ACTUATOR_DEV", json!("")))), "ACTUATOR_DEV");
    assert_eq!(
        invalid_key(Config::from_json(&with("STORE_COLLECTION", json!("a/b")))),
        "STORE_COLLECTION"
    );
    assert_eq!(
        invalid_key(Config::from_json(&with("BACKOFF_MAX_MS", json!(10)))),
        "BACKOFF_MAX_MS"
    );
    assert_eq!(
        invalid_key(Config::from_json(&with("BRIDGE_IDLE_TIMEOUT_MS", json!(0)))),
        "BRIDGE_IDLE_TIMEOUT_MS"
    );
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(base().to_string().as_bytes()).expect("write");

    let config = Config::load(file.path()).expect("load");
    assert_eq!(config.num_plants, 12);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = Config::load(dir.path().join("absent.json"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}
