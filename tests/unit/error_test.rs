//! Tests for error types

use prometheus_coordination::core::{ConfigError, LoaderError, MutationError};

#[test]
fn test_cancelled_error() {
    let err = LoaderError::Cancelled {
        identifier: "https://cdn.example/hero.png".to_string(),
    };
    assert_eq!(format!("{}", err), "load cancelled: https://cdn.example/hero.png");
    assert!(err.is_cancelled());
    assert_eq!(err.identifier(), Some("https://cdn.example/hero.png"));
}

#[test]
fn test_load_failed_error() {
    let err = LoaderError::LoadFailed {
        identifier: "logo.svg".to_string(),
        reason: "404".to_string(),
    };
    assert_eq!(format!("{}", err), "load failed for logo.svg: 404");
    assert!(!err.is_cancelled());
}

#[test]
fn test_invalid_limit_error() {
    let err = LoaderError::InvalidLimit(0);
    assert_eq!(format!("{}", err), "invalid concurrency limit: 0");
    assert_eq!(err.identifier(), None);
}

#[test]
fn test_mutation_errors_display_message_verbatim() {
    let rejected = MutationError::Rejected("name: required".to_string());
    assert_eq!(format!("{}", rejected), "name: required");
    assert_eq!(rejected.message(), "name: required");

    let faulted = MutationError::Faulted("Failed to save: timeout".to_string());
    assert_eq!(faulted.message(), "Failed to save: timeout");
}

#[test]
fn test_config_error() {
    let err = ConfigError::Invalid("max_concurrent must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "config invalid: max_concurrent must be greater than 0"
    );
}
