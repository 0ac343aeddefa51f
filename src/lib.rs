//! # Prometheus Coordination
//!
//! In-process coordination primitives for UI-facing async workloads.
//!
//! Two independent building blocks live here:
//!
//! - **`BoundedLoader`**: loads a batch of external resources (images, blobs)
//!   with at most K loads outstanding, and cancels everything still in flight
//!   on request or when the loader is dropped.
//! - **`OptimisticCoordinator`**: writes a caller-computed next state to an
//!   observable collection before a remote call is made, then keeps it on
//!   confirmation or restores the previous contents on failure, while
//!   counting overlapping attempts.
//!
//! ## Key Features
//!
//! - **Fill-to-capacity admission**: a new load starts as soon as any earlier
//!   one settles, not when a whole batch completes
//! - **Per-task cancellation**: one `CancellationToken` per load; cancelling
//!   drops the in-flight primitive future
//! - **Guaranteed cleanup**: registry entries and the pending counter are
//!   released by drop guards on every exit path
//! - **Conflict policies**: snapshot, serialized, or versioned rollback for
//!   overlapping optimistic attempts
//! - **Audit trail**: optional in-memory record of load and mutation events
//!
//! ## BoundedLoader
//!
//! ```rust,ignore
//! use prometheus_coordination::core::{BoundedLoader, LoadPrimitive};
//!
//! let loader = BoundedLoader::new(image_decoder);
//! let images = loader.load_many(vendor_logo_urls, 4).await?;
//!
//! // Tear down: abort everything still outstanding.
//! loader.cancel_all();
//! ```
//!
//! ## OptimisticCoordinator
//!
//! ```rust,ignore
//! use prometheus_coordination::core::{
//!     Envelope, OptimisticCoordinator, SharedCollection, UpdateOptions,
//! };
//!
//! let registrations = SharedCollection::new(vec![alice, bob]);
//! let coordinator = OptimisticCoordinator::new(registrations.clone());
//!
//! let confirmed = coordinator
//!     .perform_update(
//!         || api.register(carol.clone()),
//!         vec![alice, bob, carol],
//!         UpdateOptions::new()
//!             .on_error(|message| toast(message))
//!             .error_context("Failed to register"),
//!     )
//!     .await;
//! ```
//!
//! For complete examples, see:
//! - `tests/bounded_loader_test.rs`
//! - `tests/optimistic_coordinator_test.rs`

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Loader, coordinator, collection, envelope, and audit primitives.
pub mod core;
/// Configuration models for the loader, coordinator, and auditing.
pub mod config;
/// Builders to construct components from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
