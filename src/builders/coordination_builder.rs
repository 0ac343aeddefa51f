//! Builders to construct loaders and coordinators from configuration.

use crate::config::CoordinationConfig;
use crate::core::{
    shared_sink, BoundedLoader, ConfigError, InMemoryAuditSink, LoadPrimitive,
    ObservableCollection, OptimisticCoordinator,
};

/// A loader and a coordinator built from one configuration.
pub struct Components<R, L, T, C> {
    /// Bounded loader using the configured concurrency.
    pub loader: BoundedLoader<R, L>,
    /// Coordinator using the configured policy and error context.
    pub coordinator: OptimisticCoordinator<T, C>,
    /// Audit buffer shared by both, when `audit_capacity` is set.
    pub audit: Option<InMemoryAuditSink>,
}

fn validated(cfg: &CoordinationConfig) -> Result<(), ConfigError> {
    cfg.validate().map_err(ConfigError::Invalid)
}

/// Build a loader from configuration.
///
/// # Errors
///
/// [`ConfigError::Invalid`] when the configuration fails validation.
pub fn build_loader<R, L>(
    cfg: &CoordinationConfig,
    primitive: L,
) -> Result<BoundedLoader<R, L>, ConfigError>
where
    R: Send + 'static,
    L: LoadPrimitive<R>,
{
    validated(cfg)?;
    Ok(BoundedLoader::new(primitive).with_max_concurrent(cfg.loader.max_concurrent))
}

/// Build a coordinator for `collection` from configuration.
///
/// # Errors
///
/// [`ConfigError::Invalid`] when the configuration fails validation.
pub fn build_coordinator<T, C>(
    cfg: &CoordinationConfig,
    collection: C,
) -> Result<OptimisticCoordinator<T, C>, ConfigError>
where
    T: Clone + Send + Sync + 'static,
    C: ObservableCollection<T>,
{
    validated(cfg)?;
    Ok(OptimisticCoordinator::new(collection)
        .with_policy(cfg.coordinator.conflict_policy)
        .with_error_context(cfg.coordinator.default_error_context.clone()))
}

/// Build both components, wiring one in-memory audit sink into each when
/// `audit_capacity` is configured.
///
/// # Errors
///
/// [`ConfigError::Invalid`] when the configuration fails validation.
pub fn build_components<R, L, T, C>(
    cfg: &CoordinationConfig,
    primitive: L,
    collection: C,
) -> Result<Components<R, L, T, C>, ConfigError>
where
    R: Send + 'static,
    L: LoadPrimitive<R>,
    T: Clone + Send + Sync + 'static,
    C: ObservableCollection<T>,
{
    let mut loader = build_loader(cfg, primitive)?;
    let mut coordinator = build_coordinator(cfg, collection)?;

    let audit = cfg.audit_capacity.map(InMemoryAuditSink::new);
    if let Some(sink) = &audit {
        let shared = shared_sink(sink.clone());
        loader = loader.with_audit(shared.clone());
        coordinator = coordinator.with_audit(shared);
    }

    tracing::info!(
        "built loader (max {} in flight) and coordinator ({:?} policy)",
        cfg.loader.max_concurrent,
        cfg.coordinator.conflict_policy
    );

    Ok(Components {
        loader,
        coordinator,
        audit,
    })
}
