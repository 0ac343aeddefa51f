//! Loader and coordinator configuration structures.

use serde::{Deserialize, Serialize};

use crate::core::envelope::GENERIC_FAILURE_MESSAGE;
use crate::core::{AppResult, ConflictPolicy, DEFAULT_MAX_CONCURRENT};

/// Environment variable holding the default load concurrency.
pub const ENV_MAX_CONCURRENT_LOADS: &str = "COORDINATION_MAX_CONCURRENT_LOADS";
/// Environment variable holding the conflict policy name.
pub const ENV_CONFLICT_POLICY: &str = "COORDINATION_CONFLICT_POLICY";
/// Environment variable holding the default fault message context.
pub const ENV_ERROR_CONTEXT: &str = "COORDINATION_ERROR_CONTEXT";
/// Environment variable holding the audit buffer capacity.
pub const ENV_AUDIT_CAPACITY: &str = "COORDINATION_AUDIT_CAPACITY";

/// Bounded loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Maximum unsettled loads per `preload` call.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

/// Optimistic coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Handling of overlapping attempts.
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Context used for fault messages when an attempt supplies none.
    #[serde(default = "default_error_context")]
    pub default_error_context: String,
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationConfig {
    /// Loader settings.
    #[serde(default)]
    pub loader: LoaderConfig,
    /// Coordinator settings.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Capacity of the in-memory audit buffer; no auditing when absent.
    #[serde(default)]
    pub audit_capacity: Option<usize>,
}

const fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}

fn default_error_context() -> String {
    GENERIC_FAILURE_MESSAGE.to_owned()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            default_error_context: default_error_context(),
        }
    }
}

impl LoaderConfig {
    /// Validate loader configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        Ok(())
    }
}

impl CoordinatorConfig {
    /// Validate coordinator configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_error_context.trim().is_empty() {
            return Err("default_error_context must not be blank".into());
        }
        Ok(())
    }
}

impl CoordinationConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.loader
            .validate()
            .map_err(|e| format!("loader invalid: {e}"))?;
        self.coordinator
            .validate()
            .map_err(|e| format!("coordinator invalid: {e}"))?;
        if self.audit_capacity == Some(0) {
            return Err("audit_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading a `.env`
    /// file first when one exists. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails when a variable cannot be parsed or validation fails.
    pub fn from_env() -> AppResult<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Fails when a variable cannot be parsed or validation fails.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_MAX_CONCURRENT_LOADS) {
            cfg.loader.max_concurrent = raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{ENV_MAX_CONCURRENT_LOADS}={raw}: {e}"))?;
        }
        if let Some(raw) = lookup(ENV_CONFLICT_POLICY) {
            cfg.coordinator.conflict_policy = raw
                .parse()
                .map_err(|e| anyhow::anyhow!("{ENV_CONFLICT_POLICY}: {e}"))?;
        }
        if let Some(raw) = lookup(ENV_ERROR_CONTEXT) {
            cfg.coordinator.default_error_context = raw;
        }
        if let Some(raw) = lookup(ENV_AUDIT_CAPACITY) {
            cfg.audit_capacity = Some(
                raw.trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("{ENV_AUDIT_CAPACITY}={raw}: {e}"))?,
            );
        }

        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}
