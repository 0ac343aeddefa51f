//! Optimistic mutation coordinator with rollback and pending accounting.
//!
//! An attempt writes the caller's optimistic state to the collection before
//! the remote call is issued, then either keeps it (confirmed) or restores
//! the snapshot taken just before the write (rolled back):
//!
//! ```text
//! Idle -> Applied -> Confirmed
//!                 \-> RolledBack
//! ```
//!
//! Overlapping attempts against one collection race on rollback; see
//! [`ConflictPolicy`] for the available behaviours.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::audit::{self, AuditAction, Component, SharedAuditSink};
use crate::core::envelope::GENERIC_FAILURE_MESSAGE;
use crate::core::{Envelope, MutationError, ObservableCollection};

/// How overlapping attempts against the same collection are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Restore the captured snapshot unconditionally. A failing attempt can
    /// clobber a newer attempt's optimistic write.
    #[default]
    Snapshot,
    /// Queue attempts so only one is between apply and settle at a time.
    Serialized,
    /// Restore only if nothing wrote to the collection after this attempt's
    /// optimistic write; otherwise the newer write is kept. A failed attempt
    /// shadowed by a newer unsettled attempt hands its snapshot down, so the
    /// newer attempt restores past it if it fails too.
    Versioned,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(Self::Snapshot),
            "serialized" => Ok(Self::Serialized),
            "versioned" => Ok(Self::Versioned),
            other => Err(format!("unknown conflict policy `{other}`")),
        }
    }
}

/// Callback invoked with the confirmed payload.
pub type SuccessCallback<D> = Box<dyn FnOnce(Option<D>) + Send>;
/// Callback invoked with the display error message.
pub type ErrorCallback = Box<dyn FnOnce(&str) + Send>;

/// Callbacks and context for [`OptimisticCoordinator::perform_update`].
pub struct UpdateOptions<D> {
    on_success: Option<SuccessCallback<D>>,
    on_error: Option<ErrorCallback>,
    error_context: Option<String>,
}

impl<D> Default for UpdateOptions<D> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            error_context: None,
        }
    }
}

impl<D> UpdateOptions<D> {
    /// Options with no callbacks and the coordinator's default context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the envelope's `data` once the remote call confirms.
    #[must_use]
    pub fn on_success(mut self, callback: impl FnOnce(Option<D>) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Called with the display message after the collection was restored.
    #[must_use]
    pub fn on_error(mut self, callback: impl FnOnce(&str) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Context prefixed to fault messages, e.g. `"Failed to save vendor"`.
    #[must_use]
    pub fn error_context(mut self, context: impl Into<String>) -> Self {
        self.error_context = Some(context.into());
        self
    }
}

/// Result of one attempt: the confirmed payload, or why it was rolled back.
pub type MutationOutcome<D> = Result<Option<D>, MutationError>;

/// Coordinates optimistic writes to one observable collection.
///
/// The pending counter is owned by the instance; `is_pending` and
/// `pending_count` are read-only views of it.
pub struct OptimisticCoordinator<T, C> {
    collection: C,
    pending: AtomicUsize,
    policy: ConflictPolicy,
    lane: tokio::sync::Mutex<()>,
    unsettled: Mutex<Vec<VersionedEntry<T>>>,
    default_error_context: String,
    audit: Option<SharedAuditSink>,
}

impl<T, C> OptimisticCoordinator<T, C>
where
    T: Clone + Send + Sync + 'static,
    C: ObservableCollection<T>,
{
    /// Create a coordinator for `collection` with the snapshot policy.
    pub fn new(collection: C) -> Self {
        Self {
            collection,
            pending: AtomicUsize::new(0),
            policy: ConflictPolicy::default(),
            lane: tokio::sync::Mutex::new(()),
            unsettled: Mutex::new(Vec::new()),
            default_error_context: GENERIC_FAILURE_MESSAGE.to_owned(),
            audit: None,
        }
    }

    /// Select the conflict policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Context used for fault messages when an attempt supplies none.
    #[must_use]
    pub fn with_error_context(mut self, context: impl Into<String>) -> Self {
        self.default_error_context = context.into();
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// The coordinated collection.
    pub const fn collection(&self) -> &C {
        &self.collection
    }

    /// Active conflict policy.
    pub const fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Attempts started but not yet settled.
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// True while at least one attempt is unsettled.
    pub fn is_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// Apply `optimistic_state`, await `remote_call`, and reconcile.
    ///
    /// Callbacks in `options` run before the pending counter is released.
    /// Returns `true` when the remote call confirmed the mutation.
    pub async fn perform_update<D, E, F, Fut>(
        &self,
        remote_call: F,
        optimistic_state: Vec<T>,
        options: UpdateOptions<D>,
    ) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Envelope<D>, E>>,
        E: fmt::Display,
    {
        let UpdateOptions {
            on_success,
            on_error,
            error_context,
        } = options;

        let _pending = PendingGuard::enter(&self.pending);
        match self
            .run_attempt(remote_call, optimistic_state, error_context.as_deref())
            .await
        {
            Ok(data) => {
                if let Some(callback) = on_success {
                    callback(data);
                }
                true
            }
            Err(error) => {
                if let Some(callback) = on_error {
                    callback(error.message());
                }
                false
            }
        }
    }

    /// Result-returning form of [`OptimisticCoordinator::perform_update`].
    ///
    /// # Errors
    ///
    /// [`MutationError::Rejected`] for a failure envelope and
    /// [`MutationError::Faulted`] when the remote call returned `Err`. In
    /// both cases the collection has already been restored.
    pub async fn try_update<D, E, F, Fut>(
        &self,
        remote_call: F,
        optimistic_state: Vec<T>,
        error_context: Option<&str>,
    ) -> MutationOutcome<D>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Envelope<D>, E>>,
        E: fmt::Display,
    {
        let _pending = PendingGuard::enter(&self.pending);
        self.run_attempt(remote_call, optimistic_state, error_context)
            .await
    }

    async fn run_attempt<D, E, F, Fut>(
        &self,
        remote_call: F,
        optimistic_state: Vec<T>,
        error_context: Option<&str>,
    ) -> MutationOutcome<D>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Envelope<D>, E>>,
        E: fmt::Display,
    {
        let _lane = match self.policy {
            ConflictPolicy::Serialized => Some(self.lane.lock().await),
            ConflictPolicy::Snapshot | ConflictPolicy::Versioned => None,
        };

        let mut attempt = MutationAttempt::apply(self, optimistic_state);

        match remote_call().await {
            Ok(envelope) if envelope.success => {
                attempt.confirm();
                Ok(envelope.data)
            }
            Ok(envelope) => {
                let message = envelope.error_message();
                attempt.roll_back(&message);
                Err(MutationError::Rejected(message))
            }
            Err(fault) => {
                let context = error_context.unwrap_or(&self.default_error_context);
                let message = fault_message(context, &fault);
                attempt.roll_back(&message);
                Err(MutationError::Faulted(message))
            }
        }
    }
}

/// Build the display message for a remote call that raised instead of
/// returning an envelope.
pub fn fault_message(context: &str, fault: &impl fmt::Display) -> String {
    let detail = fault.to_string();
    if detail.trim().is_empty() {
        context.to_owned()
    } else {
        format!("{context}: {detail}")
    }
}

/// Holds one unit of the pending counter for as long as it lives.
struct PendingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptState {
    Applied,
    Confirmed,
    RolledBack,
}

/// Unsettled attempt under [`ConflictPolicy::Versioned`].
struct VersionedEntry<T> {
    attempt: Uuid,
    /// Version holding this attempt's optimistic state.
    written: u64,
    /// Version the optimistic state was written over.
    base: u64,
    backup: Vec<T>,
}

/// One optimistic write and the snapshot needed to undo it.
///
/// If dropped while still `Applied` (the caller abandoned the future), the
/// snapshot is restored.
struct MutationAttempt<'a, T, C>
where
    C: ObservableCollection<T>,
{
    id: Uuid,
    coordinator: &'a OptimisticCoordinator<T, C>,
    /// Unused under the versioned policy, whose snapshots live in the ledger.
    backup: Vec<T>,
    state: AttemptState,
}

impl<'a, T, C> MutationAttempt<'a, T, C>
where
    C: ObservableCollection<T>,
{
    fn apply(coordinator: &'a OptimisticCoordinator<T, C>, optimistic_state: Vec<T>) -> Self {
        let id = Uuid::new_v4();
        let (backup, written) = match coordinator.policy {
            ConflictPolicy::Versioned => {
                let mut unsettled = coordinator.unsettled.lock();
                let (previous, written) = coordinator.collection.swap(optimistic_state);
                unsettled.push(VersionedEntry {
                    attempt: id,
                    written,
                    base: previous.version,
                    backup: previous.items,
                });
                (Vec::new(), written)
            }
            ConflictPolicy::Snapshot | ConflictPolicy::Serialized => {
                let (previous, written) = coordinator.collection.swap(optimistic_state);
                (previous.items, written)
            }
        };
        tracing::debug!("attempt {} applied optimistic state (version {})", id, written);

        let attempt = Self {
            id,
            coordinator,
            backup,
            state: AttemptState::Applied,
        };
        attempt.record(AuditAction::MutationApplied, None);
        attempt
    }

    fn confirm(&mut self) {
        self.state = AttemptState::Confirmed;
        self.backup.clear();
        if self.coordinator.policy == ConflictPolicy::Versioned {
            self.coordinator
                .unsettled
                .lock()
                .retain(|entry| entry.attempt != self.id);
        }
        tracing::info!("attempt {} confirmed", self.id);
        self.record(AuditAction::MutationConfirmed, None);
    }

    fn roll_back(&mut self, message: &str) {
        self.state = AttemptState::RolledBack;
        tracing::warn!("attempt {} rolled back: {}", self.id, message);
        self.restore(Some(message));
    }

    fn restore(&mut self, message: Option<&str>) {
        let action = match self.coordinator.policy {
            ConflictPolicy::Versioned => self.restore_versioned(),
            ConflictPolicy::Snapshot | ConflictPolicy::Serialized => {
                self.coordinator
                    .collection
                    .replace(std::mem::take(&mut self.backup));
                AuditAction::MutationRolledBack
            }
        };
        self.record(action, message);
    }

    /// Undo this attempt's write unless something newer replaced it.
    ///
    /// A newer unsettled attempt written directly over this one inherits
    /// this attempt's snapshot instead. After a restore, the unsettled
    /// attempt this one was written over owns the restored version.
    fn restore_versioned(&self) -> AuditAction {
        let mut unsettled = self.coordinator.unsettled.lock();
        let Some(position) = unsettled.iter().position(|entry| entry.attempt == self.id) else {
            return AuditAction::RollbackRefused;
        };
        let entry = unsettled.remove(position);

        if let Some(successor) = unsettled.iter_mut().find(|other| other.base == entry.written) {
            tracing::debug!(
                "attempt {} superseded by attempt {}, handing over its snapshot",
                self.id,
                successor.attempt
            );
            successor.backup = entry.backup;
            successor.base = entry.base;
            return AuditAction::RollbackRefused;
        }

        match self
            .coordinator
            .collection
            .replace_if_version(entry.written, entry.backup)
        {
            Ok(restored) => {
                if let Some(predecessor) =
                    unsettled.iter_mut().find(|other| other.written == entry.base)
                {
                    predecessor.written = restored;
                }
                AuditAction::MutationRolledBack
            }
            Err(current) => {
                tracing::warn!(
                    "attempt {} rollback refused: collection moved from version {} to {}",
                    self.id,
                    entry.written,
                    current
                );
                AuditAction::RollbackRefused
            }
        }
    }

    fn record(&self, action: AuditAction, detail: Option<&str>) {
        audit::record(
            self.coordinator.audit.as_ref(),
            self.id.to_string(),
            Component::Coordinator,
            action,
            detail.map(str::to_owned),
        );
    }
}

impl<T, C> Drop for MutationAttempt<'_, T, C>
where
    C: ObservableCollection<T>,
{
    fn drop(&mut self) {
        if self.state == AttemptState::Applied {
            tracing::warn!("attempt {} dropped before settling, rolling back", self.id);
            self.state = AttemptState::RolledBack;
            self.restore(None);
        }
    }
}
