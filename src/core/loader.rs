//! Bounded-concurrency resource loader with cooperative cancellation.
//!
//! A [`BoundedLoader`] starts loads in input order, keeps at most
//! `max_concurrent` of them unsettled per call, and tracks every outstanding
//! load in a [`LoadRegistry`] so that [`BoundedLoader::cancel_all`] can reach
//! it. Dropping the loader cancels whatever is still registered.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::core::audit::{self, AuditAction, Component, SharedAuditSink};
use crate::core::{LoadPrimitive, LoaderError};

/// Default number of loads allowed in flight by [`BoundedLoader::preload`].
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Identifier of a tracked load, unique per loader.
pub type TaskId = u64;

/// One in-flight load tracked by a loader.
#[derive(Debug, Clone)]
pub struct LoadTask {
    /// Registry key.
    pub id: TaskId,
    /// Resource identifier (URL) being loaded.
    pub identifier: String,
    cancellation: CancellationToken,
}

impl LoadTask {
    /// Token that aborts this load when cancelled.
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Outstanding loads of one loader, keyed by task id.
///
/// An entry exists iff its load has been started and has not settled.
#[derive(Debug, Default)]
pub struct LoadRegistry {
    tasks: HashMap<TaskId, LoadTask>,
}

impl LoadRegistry {
    fn insert(&mut self, task: LoadTask) {
        self.tasks.insert(task.id, task);
    }

    fn remove(&mut self, id: TaskId) -> Option<LoadTask> {
        self.tasks.remove(&id)
    }

    fn drain(&mut self) -> Vec<LoadTask> {
        self.tasks.drain().map(|(_, task)| task).collect()
    }

    /// Number of outstanding loads.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Identifiers of outstanding loads, sorted by task id.
    pub fn identifiers(&self) -> Vec<String> {
        let mut tasks: Vec<&LoadTask> = self.tasks.values().collect();
        tasks.sort_by_key(|task| task.id);
        tasks.into_iter().map(|task| task.identifier.clone()).collect()
    }
}

/// State shared between a loader handle and its spawned loads.
struct LoaderShared {
    registry: Mutex<LoadRegistry>,
    next_id: AtomicU64,
    audit: RwLock<Option<SharedAuditSink>>,
}

impl LoaderShared {
    fn new() -> Self {
        Self {
            registry: Mutex::new(LoadRegistry::default()),
            next_id: AtomicU64::new(1),
            audit: RwLock::new(None),
        }
    }

    fn record(&self, task: &LoadTask, action: AuditAction) {
        audit::record(
            self.audit.read().as_ref(),
            task.id.to_string(),
            Component::Loader,
            action,
            Some(task.identifier.clone()),
        );
    }

    /// Register a new load. The returned guard deregisters it on drop.
    fn register(self: &Arc<Self>, identifier: &str) -> Registration {
        let task = LoadTask {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            identifier: identifier.to_owned(),
            cancellation: CancellationToken::new(),
        };
        self.registry.lock().insert(task.clone());
        tracing::debug!("registered load {} for {}", task.id, task.identifier);
        self.record(&task, AuditAction::LoadStarted);
        Registration {
            shared: Arc::clone(self),
            task,
        }
    }

    fn cancel_all(&self) -> usize {
        let drained = self.registry.lock().drain();
        for task in &drained {
            task.cancellation.cancel();
        }
        if !drained.is_empty() {
            tracing::info!("cancelled {} outstanding loads", drained.len());
        }
        drained.len()
    }
}

/// Registry membership of one load; removal happens when this is dropped,
/// whether the load settled or its future was discarded unpolled.
struct Registration {
    shared: Arc<LoaderShared>,
    task: LoadTask,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if self.shared.registry.lock().remove(self.task.id).is_some() {
            tracing::debug!("deregistered load {}", self.task.id);
        }
    }
}

/// Per-call outcomes in input order plus the first failure by settlement time.
struct Settled<R> {
    outcomes: Vec<Result<R, LoaderError>>,
    first_failure: Option<LoaderError>,
}

/// Loader that caps the number of concurrently outstanding loads.
///
/// Uses a `parking_lot::Mutex` around the [`LoadRegistry`] (insert on start,
/// delete on settle) and one `CancellationToken` per task, so cancelling one
/// load never affects its siblings.
pub struct BoundedLoader<R, L> {
    primitive: L,
    shared: Arc<LoaderShared>,
    default_concurrency: usize,
    _resource_marker: PhantomData<fn() -> R>,
}

impl<R, L> BoundedLoader<R, L>
where
    R: Send + 'static,
    L: LoadPrimitive<R>,
{
    /// Create a loader around a load primitive.
    pub fn new(primitive: L) -> Self {
        Self {
            primitive,
            shared: Arc::new(LoaderShared::new()),
            default_concurrency: DEFAULT_MAX_CONCURRENT,
            _resource_marker: PhantomData,
        }
    }

    /// Override the concurrency used by [`BoundedLoader::preload`].
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.default_concurrency = max_concurrent;
        self
    }

    /// Attach an audit sink. Loads already registered stay reachable by
    /// [`BoundedLoader::cancel_all`]; only their later events are recorded.
    #[must_use]
    pub fn with_audit(self, audit: SharedAuditSink) -> Self {
        *self.shared.audit.write() = Some(audit);
        self
    }

    /// Concurrency used by [`BoundedLoader::preload`].
    pub const fn max_concurrent(&self) -> usize {
        self.default_concurrency
    }

    /// Number of loads currently registered as outstanding.
    pub fn active_load_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    /// Identifiers of the loads currently outstanding.
    pub fn active_identifiers(&self) -> Vec<String> {
        self.shared.registry.lock().identifiers()
    }

    /// Load one resource under a caller-owned cancellation token.
    ///
    /// The load is not tracked in the registry, so only `cancellation`
    /// can abort it.
    ///
    /// # Errors
    ///
    /// [`LoaderError::Cancelled`] if the token fires before the primitive
    /// settles, [`LoaderError::LoadFailed`] if the primitive fails.
    pub async fn load_one(
        &self,
        identifier: &str,
        cancellation: &CancellationToken,
    ) -> Result<R, LoaderError> {
        load_with(&self.primitive, identifier, cancellation).await
    }

    /// Load one resource as a tracked task reachable by [`BoundedLoader::cancel_all`].
    ///
    /// # Errors
    ///
    /// Same as [`BoundedLoader::load_one`].
    pub async fn load(&self, identifier: &str) -> Result<R, LoaderError> {
        let registration = self.shared.register(identifier);
        run_tracked(self.primitive.clone(), registration).await
    }

    /// Load every identifier with at most `max_concurrent` loads unsettled.
    ///
    /// Resolves once every load has settled. Results keep input order.
    ///
    /// # Errors
    ///
    /// The first failure in settlement order if any load failed (siblings
    /// still run to completion), or [`LoaderError::InvalidLimit`] when
    /// `max_concurrent` is zero.
    pub async fn load_many<I, S>(
        &self,
        identifiers: I,
        max_concurrent: usize,
    ) -> Result<Vec<R>, LoaderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let settled = self.drive(identifiers, max_concurrent).await?;
        if let Some(failure) = settled.first_failure {
            return Err(failure);
        }
        settled.outcomes.into_iter().collect()
    }

    /// Like [`BoundedLoader::load_many`] but reports every outcome instead of
    /// failing on the first error.
    ///
    /// # Errors
    ///
    /// Only [`LoaderError::InvalidLimit`] when `max_concurrent` is zero.
    pub async fn load_many_settled<I, S>(
        &self,
        identifiers: I,
        max_concurrent: usize,
    ) -> Result<Vec<Result<R, LoaderError>>, LoaderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.drive(identifiers, max_concurrent).await?.outcomes)
    }

    /// [`BoundedLoader::load_many`] with the configured concurrency.
    ///
    /// # Errors
    ///
    /// Same as [`BoundedLoader::load_many`].
    pub async fn preload<I, S>(&self, identifiers: I) -> Result<Vec<R>, LoaderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_many(identifiers, self.default_concurrency).await
    }

    /// Cancel every outstanding load and clear the registry.
    ///
    /// Returns how many loads were signalled. Calling it with nothing
    /// outstanding is a no-op.
    pub fn cancel_all(&self) -> usize {
        self.shared.cancel_all()
    }

    /// Fill to capacity, wait for any one load to settle, refill.
    async fn drive<I, S>(
        &self,
        identifiers: I,
        max_concurrent: usize,
    ) -> Result<Settled<R>, LoaderError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if max_concurrent == 0 {
            return Err(LoaderError::InvalidLimit(max_concurrent));
        }

        let identifiers: Vec<String> = identifiers.into_iter().map(Into::into).collect();
        let mut outcomes: Vec<Option<Result<R, LoaderError>>> =
            identifiers.iter().map(|_| None).collect();
        let mut first_failure = None;
        let mut in_flight = JoinSet::new();

        tracing::debug!(
            "loading {} resources, max {} in flight",
            identifiers.len(),
            max_concurrent
        );

        for (index, identifier) in identifiers.iter().enumerate() {
            let registration = self.shared.register(identifier);
            let primitive = self.primitive.clone();
            in_flight.spawn(async move { (index, run_tracked(primitive, registration).await) });

            // Admission gate: wait for any earlier load to settle.
            if in_flight.len() >= max_concurrent {
                if let Some(joined) = in_flight.join_next().await {
                    record_outcome(joined, &mut outcomes, &mut first_failure);
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            record_outcome(joined, &mut outcomes, &mut first_failure);
        }

        let outcomes: Vec<Result<R, LoaderError>> = outcomes
            .into_iter()
            .zip(identifiers)
            .map(|(outcome, identifier)| {
                outcome.unwrap_or_else(|| {
                    let failure = LoaderError::LoadFailed {
                        identifier,
                        reason: "load task panicked".into(),
                    };
                    if first_failure.is_none() {
                        first_failure = Some(failure.clone());
                    }
                    Err(failure)
                })
            })
            .collect();

        let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
        tracing::info!(
            "settled {} loads ({} failed)",
            outcomes.len(),
            failed
        );

        Ok(Settled {
            outcomes,
            first_failure,
        })
    }
}

impl<R, L> Drop for BoundedLoader<R, L> {
    fn drop(&mut self) {
        self.shared.cancel_all();
    }
}

fn record_outcome<R>(
    joined: Result<(usize, Result<R, LoaderError>), tokio::task::JoinError>,
    outcomes: &mut [Option<Result<R, LoaderError>>],
    first_failure: &mut Option<LoaderError>,
) {
    match joined {
        Ok((index, outcome)) => {
            if let Err(error) = &outcome {
                if first_failure.is_none() {
                    *first_failure = Some(error.clone());
                }
            }
            outcomes[index] = Some(outcome);
        }
        Err(error) => {
            // Slot stays empty and is reported once all loads settle.
            tracing::error!("load task did not complete: {}", error);
        }
    }
}

/// Race the primitive against the cancellation token.
///
/// Whichever branch loses is dropped, which detaches the primitive's
/// in-flight work when cancellation wins.
async fn load_with<R, L>(
    primitive: &L,
    identifier: &str,
    cancellation: &CancellationToken,
) -> Result<R, LoaderError>
where
    R: Send + 'static,
    L: LoadPrimitive<R>,
{
    tokio::select! {
        biased;
        () = cancellation.cancelled() => Err(LoaderError::Cancelled {
            identifier: identifier.to_owned(),
        }),
        outcome = primitive.load(identifier) => outcome.map_err(|reason| LoaderError::LoadFailed {
            identifier: identifier.to_owned(),
            reason,
        }),
    }
}

async fn run_tracked<R, L>(primitive: L, registration: Registration) -> Result<R, LoaderError>
where
    R: Send + 'static,
    L: LoadPrimitive<R>,
{
    let task = &registration.task;
    let outcome = load_with(&primitive, &task.identifier, &task.cancellation).await;

    let action = match &outcome {
        Ok(_) => {
            tracing::debug!("load {} settled: {}", task.id, task.identifier);
            AuditAction::LoadSettled
        }
        Err(LoaderError::Cancelled { .. }) => {
            tracing::warn!("load {} cancelled: {}", task.id, task.identifier);
            AuditAction::LoadCancelled
        }
        Err(error) => {
            tracing::warn!("load {} failed: {}", task.id, error);
            AuditAction::LoadFailed
        }
    };
    registration.shared.record(task, action);

    outcome
}
