//! Core loading and mutation-coordination primitives.

pub mod audit;
pub mod collection;
pub mod coordinator;
pub mod envelope;
pub mod error;
pub mod loader;
pub mod primitive;

pub use audit::{
    build_audit_event, shared_sink, AuditAction, AuditEvent, AuditSink, Component,
    InMemoryAuditSink, SharedAuditSink,
};
pub use collection::{ObservableCollection, Revision, SharedCollection};
pub use coordinator::{
    fault_message, ConflictPolicy, ErrorCallback, MutationOutcome, OptimisticCoordinator,
    SuccessCallback, UpdateOptions,
};
pub use envelope::{Envelope, FieldErrors, GENERIC_FAILURE_MESSAGE};
pub use error::{AppResult, ConfigError, LoaderError, MutationError};
pub use loader::{BoundedLoader, LoadRegistry, LoadTask, TaskId, DEFAULT_MAX_CONCURRENT};
pub use primitive::LoadPrimitive;
