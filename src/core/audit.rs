//! Audit sink implementations.
//!
//! Records lifecycle events of loads and mutation attempts so hosts can
//! inspect what the primitives did after the fact.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;

/// Component that emitted an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// The bounded loader.
    Loader,
    /// The optimistic coordinator.
    Coordinator,
}

/// Lifecycle action recorded by an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A tracked load was registered and started.
    LoadStarted,
    /// A tracked load produced its resource.
    LoadSettled,
    /// A tracked load failed in the primitive.
    LoadFailed,
    /// A tracked load was cancelled.
    LoadCancelled,
    /// An optimistic state was written to the collection.
    MutationApplied,
    /// The remote call confirmed the mutation.
    MutationConfirmed,
    /// The collection was restored to its snapshot.
    MutationRolledBack,
    /// A versioned rollback was skipped because a newer write exists.
    RollbackRefused,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Load task id or mutation attempt id the event is about.
    pub subject: String,
    /// Emitting component.
    pub component: Component,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context (identifier, error message).
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Audit sink shared between a loader and a coordinator.
pub type SharedAuditSink = Arc<Mutex<Box<dyn AuditSink>>>;

/// Wrap a sink so it can be attached to several components.
pub fn shared_sink(sink: impl AuditSink + 'static) -> SharedAuditSink {
    Arc::new(Mutex::new(Box::new(sink)))
}

/// In-memory audit sink for testing and dev.
///
/// Cloning yields another handle onto the same buffer, so a test can keep one
/// handle and attach the other to a component.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Actions of stored events, oldest first.
    pub fn actions(&self) -> Vec<AuditAction> {
        self.events.lock().iter().map(|e| e.action).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    subject: impl Into<String>,
    component: Component,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        subject: subject.into(),
        component,
        action,
        created_at_ms: now_ms(),
        detail,
    }
}

/// Record an event on an optional sink.
pub(crate) fn record(
    sink: Option<&SharedAuditSink>,
    subject: impl Into<String>,
    component: Component,
    action: AuditAction,
    detail: Option<String>,
) {
    if let Some(sink) = sink {
        sink.lock()
            .record(build_audit_event(subject, component, action, detail));
    }
}
