//! Builders to construct loaders and coordinators from configuration.

pub mod coordination_builder;

pub use coordination_builder::{build_components, build_coordinator, build_loader, Components};
