//! Tests for audit sink

use prometheus_coordination::core::{
    build_audit_event, AuditAction, AuditSink, Component, InMemoryAuditSink,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        "7",
        Component::Loader,
        AuditAction::LoadStarted,
        Some("banner.png".to_string()),
    );

    sink.record(event.clone());
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, event.event_id);
    assert_eq!(events[0].subject, "7");
    assert_eq!(events[0].action, AuditAction::LoadStarted);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("1", Component::Loader, AuditAction::LoadStarted, None));
    sink.record(build_audit_event("1", Component::Loader, AuditAction::LoadSettled, None));
    sink.record(build_audit_event("a", Component::Coordinator, AuditAction::MutationApplied, None));

    let actions = sink.actions();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0], AuditAction::LoadSettled); // First one popped
    assert_eq!(actions[1], AuditAction::MutationApplied);
}

#[test]
fn test_clones_share_buffer() {
    let sink = InMemoryAuditSink::new(4);
    let mut writer = sink.clone();

    writer.record(build_audit_event("x", Component::Coordinator, AuditAction::RollbackRefused, None));

    assert_eq!(sink.actions(), vec![AuditAction::RollbackRefused]);
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        "attempt-1",
        Component::Coordinator,
        AuditAction::MutationRolledBack,
        Some("conflict".to_string()),
    );

    assert_eq!(event.subject, "attempt-1");
    assert_eq!(event.component, Component::Coordinator);
    assert_eq!(event.action, AuditAction::MutationRolledBack);
    assert_eq!(event.detail, Some("conflict".to_string()));
    assert_eq!(event.event_id.len(), 36);
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_audit_event_serializes_snake_case() {
    let event = build_audit_event("1", Component::Loader, AuditAction::LoadCancelled, None);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["component"], "loader");
    assert_eq!(json["action"], "load_cancelled");
}
