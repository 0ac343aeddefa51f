//! Error types for loader and coordinator operations.

use thiserror::Error;

/// Errors produced by [`BoundedLoader`](crate::core::BoundedLoader) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// The load was aborted through its cancellation token before settling.
    #[error("load cancelled: {identifier}")]
    Cancelled {
        /// Identifier of the aborted load.
        identifier: String,
    },
    /// The load primitive reported a failure.
    #[error("load failed for {identifier}: {reason}")]
    LoadFailed {
        /// Identifier of the failed load.
        identifier: String,
        /// Failure reason reported by the primitive.
        reason: String,
    },
    /// Concurrency limit must be at least one.
    #[error("invalid concurrency limit: {0}")]
    InvalidLimit(usize),
}

impl LoaderError {
    /// Identifier of the load this error belongs to, if any.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Cancelled { identifier } | Self::LoadFailed { identifier, .. } => {
                Some(identifier)
            }
            Self::InvalidLimit(_) => None,
        }
    }

    /// True when the load ended because cancellation was requested.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors produced by an optimistic mutation attempt.
///
/// Both variants carry the display message handed to `on_error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The remote call returned a failure envelope.
    #[error("{0}")]
    Rejected(String),
    /// The remote call raised a fault instead of returning an envelope.
    #[error("{0}")]
    Faulted(String),
}

impl MutationError {
    /// Human-readable message for display.
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected(message) | Self::Faulted(message) => message,
        }
    }
}

/// Configuration failures surfaced by builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Configuration did not pass validation.
    #[error("config invalid: {0}")]
    Invalid(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
