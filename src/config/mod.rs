//! Configuration models for the loader, the coordinator, and auditing.

pub mod coordination;

pub use coordination::{CoordinationConfig, CoordinatorConfig, LoaderConfig};
