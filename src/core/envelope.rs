//! Remote-call envelope and error message composition.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Message used when a failure envelope carries no usable detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "Operation failed";

/// Messages reported for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldErrors {
    /// A single message.
    One(String),
    /// Several messages, joined with `", "` for display.
    Many(Vec<String>),
}

impl FieldErrors {
    fn joined(&self) -> String {
        match self {
            Self::One(message) => message.clone(),
            Self::Many(messages) => messages.join(", "),
        }
    }
}

impl From<&str> for FieldErrors {
    fn from(message: &str) -> Self {
        Self::One(message.to_owned())
    }
}

impl From<Vec<&str>> for FieldErrors {
    fn from(messages: Vec<&str>) -> Self {
        Self::Many(messages.into_iter().map(str::to_owned).collect())
    }
}

/// Structured success/failure payload returned by a remote call.
///
/// Deserialises `{ "success": bool, "data"?, "message"?, "errors"? }` where
/// `errors` maps field names to one message or a list of messages. Field
/// order is preserved as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "D: Deserialize<'de>"))]
pub struct Envelope<D> {
    /// Whether the server accepted the mutation.
    pub success: bool,
    /// Confirmed payload on success.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<D>,
    /// Human-readable failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Per-field failure messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<IndexMap<String, FieldErrors>>,
}

impl<D> Envelope<D> {
    /// Success envelope carrying `data`.
    pub const fn ok(data: D) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    /// Failure envelope carrying a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }

    /// Failure envelope carrying field errors, in the given order.
    pub fn with_field_errors<I, K, V>(errors: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldErrors>,
    {
        Self {
            success: false,
            data: None,
            message: None,
            errors: Some(
                errors
                    .into_iter()
                    .map(|(field, messages)| (field.into(), messages.into()))
                    .collect(),
            ),
        }
    }

    /// Display message for a failure envelope.
    ///
    /// Field errors win over `message` when at least one field is present:
    /// `"name: required; email: invalid, taken"`. Otherwise `message`, and
    /// [`GENERIC_FAILURE_MESSAGE`] when both are absent.
    pub fn error_message(&self) -> String {
        if let Some(errors) = self.errors.as_ref().filter(|errors| !errors.is_empty()) {
            return errors
                .iter()
                .map(|(field, messages)| format!("{field}: {}", messages.joined()))
                .collect::<Vec<_>>()
                .join("; ");
        }
        self.message
            .clone()
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_owned())
    }
}
