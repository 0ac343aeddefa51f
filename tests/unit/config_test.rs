//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_coordination::config::{CoordinationConfig, CoordinatorConfig, LoaderConfig};
use prometheus_coordination::core::ConflictPolicy;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults_are_valid() {
    let config = CoordinationConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.loader.max_concurrent, 4);
    assert_eq!(config.coordinator.conflict_policy, ConflictPolicy::Snapshot);
    assert_eq!(config.coordinator.default_error_context, "Operation failed");
    assert_eq!(config.audit_capacity, None);
}

#[test]
fn test_loader_config_invalid_concurrency() {
    let invalid = LoaderConfig { max_concurrent: 0 };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_coordinator_config_blank_context() {
    let invalid = CoordinatorConfig {
        conflict_policy: ConflictPolicy::Versioned,
        default_error_context: "   ".to_string(),
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_zero_audit_capacity_rejected() {
    let config = CoordinationConfig {
        audit_capacity: Some(0),
        ..CoordinationConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.contains("audit_capacity"));
}

#[test]
fn test_section_errors_are_prefixed() {
    let config = CoordinationConfig {
        loader: LoaderConfig { max_concurrent: 0 },
        ..CoordinationConfig::default()
    };
    assert!(config.validate().unwrap_err().starts_with("loader invalid"));
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "loader": { "max_concurrent": 6 },
        "coordinator": {
            "conflict_policy": "serialized",
            "default_error_context": "Request failed"
        },
        "audit_capacity": 128
    }"#;

    let config = CoordinationConfig::from_json_str(json).unwrap();
    assert_eq!(config.loader.max_concurrent, 6);
    assert_eq!(config.coordinator.conflict_policy, ConflictPolicy::Serialized);
    assert_eq!(config.coordinator.default_error_context, "Request failed");
    assert_eq!(config.audit_capacity, Some(128));
}

#[test]
fn test_config_from_json_fills_defaults() {
    let config = CoordinationConfig::from_json_str(r#"{ "loader": {} }"#).unwrap();
    assert_eq!(config, CoordinationConfig::default());
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(CoordinationConfig::from_json_str(r#"{ "loader": { "max_concurrent": 0 } }"#).is_err());
    assert!(CoordinationConfig::from_json_str("not json").unwrap_err().starts_with("parse error"));
}

#[test]
fn test_config_from_lookup() {
    let config = CoordinationConfig::from_lookup(lookup(&[
        ("COORDINATION_MAX_CONCURRENT_LOADS", " 8 "),
        ("COORDINATION_CONFLICT_POLICY", "Versioned"),
        ("COORDINATION_ERROR_CONTEXT", "Save failed"),
        ("COORDINATION_AUDIT_CAPACITY", "64"),
    ]))
    .unwrap();

    assert_eq!(config.loader.max_concurrent, 8);
    assert_eq!(config.coordinator.conflict_policy, ConflictPolicy::Versioned);
    assert_eq!(config.coordinator.default_error_context, "Save failed");
    assert_eq!(config.audit_capacity, Some(64));
}

#[test]
fn test_config_from_lookup_empty_uses_defaults() {
    let config = CoordinationConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, CoordinationConfig::default());
}

#[test]
fn test_config_from_lookup_rejects_bad_values() {
    assert!(CoordinationConfig::from_lookup(lookup(&[(
        "COORDINATION_MAX_CONCURRENT_LOADS",
        "many"
    )]))
    .is_err());
    assert!(CoordinationConfig::from_lookup(lookup(&[(
        "COORDINATION_CONFLICT_POLICY",
        "optimistic"
    )]))
    .is_err());
    assert!(CoordinationConfig::from_lookup(lookup(&[(
        "COORDINATION_MAX_CONCURRENT_LOADS",
        "0"
    )]))
    .is_err());
}
