//! Tests for builder modules

use async_trait::async_trait;
use prometheus_coordination::builders::{
    build_components, build_coordinator, build_loader, Components,
};
use prometheus_coordination::config::{CoordinationConfig, LoaderConfig};
use prometheus_coordination::core::{
    AuditAction, BoundedLoader, ConfigError, ConflictPolicy, Envelope, LoadPrimitive,
    OptimisticCoordinator, SharedCollection, UpdateOptions,
};

#[derive(Clone)]
struct LengthPrimitive;

#[async_trait]
impl LoadPrimitive<usize> for LengthPrimitive {
    async fn load(&self, identifier: &str) -> Result<usize, String> {
        Ok(identifier.len())
    }
}

#[test]
fn test_build_loader_uses_configured_concurrency() {
    let config = CoordinationConfig {
        loader: LoaderConfig { max_concurrent: 9 },
        ..CoordinationConfig::default()
    };

    let loader: BoundedLoader<usize, _> = build_loader(&config, LengthPrimitive).unwrap();
    assert_eq!(loader.max_concurrent(), 9);
}

#[test]
fn test_build_loader_rejects_invalid_config() {
    let config = CoordinationConfig {
        loader: LoaderConfig { max_concurrent: 0 },
        ..CoordinationConfig::default()
    };

    let err = build_loader::<usize, _>(&config, LengthPrimitive)
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_build_coordinator_uses_policy() {
    let mut config = CoordinationConfig::default();
    config.coordinator.conflict_policy = ConflictPolicy::Versioned;

    let coordinator: OptimisticCoordinator<u32, _> =
        build_coordinator(&config, SharedCollection::new(vec![1_u32])).unwrap();
    assert_eq!(coordinator.policy(), ConflictPolicy::Versioned);
    assert!(!coordinator.is_pending());
}

#[tokio::test]
async fn test_build_components_share_audit_sink() {
    let config = CoordinationConfig {
        audit_capacity: Some(16),
        ..CoordinationConfig::default()
    };
    let collection = SharedCollection::new(vec!["keynote"]);

    let components: Components<usize, _, &str, _> =
        build_components(&config, LengthPrimitive, collection.clone()).unwrap();
    let audit = components.audit.clone().unwrap();

    let sizes = components.loader.preload(["a.png", "bb.png"]).await.unwrap();
    assert_eq!(sizes, vec![5, 6]);

    let confirmed = components
        .coordinator
        .perform_update(
            || async { Err::<Envelope<()>, _>("offline") },
            vec!["keynote", "workshop"],
            UpdateOptions::new(),
        )
        .await;
    assert!(!confirmed);
    assert_eq!(collection.revision().items, vec!["keynote"]);

    let actions = audit.actions();
    assert_eq!(
        actions.iter().filter(|a| **a == AuditAction::LoadSettled).count(),
        2
    );
    assert!(actions.ends_with(&[AuditAction::MutationApplied, AuditAction::MutationRolledBack]));
}

#[test]
fn test_build_components_without_audit() {
    let components: Components<usize, _, u8, _> = build_components(
        &CoordinationConfig::default(),
        LengthPrimitive,
        SharedCollection::default(),
    )
    .unwrap();
    assert!(components.audit.is_none());
    assert_eq!(components.loader.active_load_count(), 0);
}
