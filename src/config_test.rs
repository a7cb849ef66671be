use super::*;

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__SC_TEST_NONEXISTENT_KEY__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__SC_TEST_EP_VALID__", "2.5") };
    let val: f64 = env_parse("__SC_TEST_EP_VALID__", 0.0);
    assert!((val - 2.5).abs() < f64::EPSILON);
    unsafe { std::env::remove_var("__SC_TEST_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__SC_TEST_EP_INVALID__", "lots") };
    let val: u64 = env_parse("__SC_TEST_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__SC_TEST_EP_INVALID__") };
}

// =============================================================================
// validate
// =============================================================================

#[test]
fn defaults_are_valid() {
    assert_eq!(AppConfig::default().validate(), Ok(()));
    assert_eq!(AppConfig::default().engine, EngineConfig::default());
}

#[test]
fn zero_canvas_is_rejected() {
    let mut config = AppConfig::default();
    config.engine.canvas_width = 0.0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidCanvas { .. })));
}

#[test]
fn nan_threshold_is_rejected() {
    let mut config = AppConfig::default();
    config.engine.drag_threshold = f64::NAN;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));
}

#[test]
fn zero_sample_limit_is_rejected() {
    let mut config = AppConfig::default();
    config.engine.sample_queue_limit = 0;
    assert_eq!(config.validate(), Err(ConfigError::Zero("SAMPLE_QUEUE_LIMIT")));
}

#[test]
fn zero_stale_lock_is_rejected() {
    let mut config = AppConfig::default();
    config.engine.stale_lock_ms = 0;
    assert_eq!(config.validate(), Err(ConfigError::Zero("STALE_LOCK_MS")));
}

#[test]
fn error_messages_name_the_problem() {
    assert_eq!(ConfigError::Zero("FRAME_INTERVAL_MS").to_string(), "FRAME_INTERVAL_MS must be greater than zero");
}
