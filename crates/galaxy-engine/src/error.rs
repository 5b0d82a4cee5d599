//! Error types for the macro engine
//!
//! Provides error handling for:
//! - Registry misses and dangling bindings
//! - Tree resolution cycles
//! - Remote execution failures
//! - Results the splicer cannot apply
//! - Collaborator (storage, ledger, prompt, network) failures

use galaxy_scene::{ElementId, ResolveError, SpliceError};
use std::fmt;

/// Main macro error type
///
/// Every variant is caught per invocation by the batch loop and surfaced as
/// a toast; none of them aborts the remaining invocations.
#[derive(Debug, thiserror::Error)]
pub enum MacroError {
    /// Name lookup miss
    #[error("macro `{0}` is not registered")]
    MacroNotRegistered(String),

    /// Input or output id does not resolve in the current scene
    #[error("{role} element {} is not in the scene", display_id(.id.as_ref()))]
    MissingBinding {
        /// Which side of the invocation
        role: BindingRole,
        /// Unresolved id, `None` when the arrow end is unbound
        id: Option<ElementId>,
    },

    /// Tree resolver safety trip
    #[error("cycle detected while resolving path: {}", join_ids(.path))]
    CycleDetected {
        /// Walked ids, ending with the repeated one
        path: Vec<ElementId>,
    },

    /// Remote script raised or the bridge signalled failure
    #[error("remote execution failed: {0}")]
    BridgeExecution(String),

    /// Result cannot be applied to the output element
    #[error("invalid result shape: {0}")]
    InvalidResultShape(String),

    /// Storage, ledger, prompt or network failure
    #[error(transparent)]
    ExternalCollaborator(#[from] CollabError),

    /// Macro received an input it cannot work with
    #[error("invalid macro input: {0}")]
    InvalidInput(String),
}

impl MacroError {
    /// Check if the user dismissed a prompt
    #[inline]
    #[must_use]
    pub fn is_user_cancellation(&self) -> bool {
        matches!(
            self,
            Self::ExternalCollaborator(CollabError {
                kind: CollabErrorKind::Cancelled,
                ..
            })
        )
    }

    /// Check if the failure came from outside the engine
    #[inline]
    #[must_use]
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, Self::ExternalCollaborator(_) | Self::BridgeExecution(_))
    }

    /// Missing input binding
    #[inline]
    pub fn missing_input(id: impl Into<ElementId>) -> Self {
        Self::MissingBinding {
            role: BindingRole::Input,
            id: Some(id.into()),
        }
    }

    /// Missing or unbound output
    #[inline]
    pub fn missing_output(id: Option<ElementId>) -> Self {
        Self::MissingBinding {
            role: BindingRole::Output,
            id,
        }
    }
}

impl From<ResolveError> for MacroError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::CycleDetected { path } => Self::CycleDetected { path },
        }
    }
}

impl From<SpliceError> for MacroError {
    fn from(err: SpliceError) -> Self {
        match err {
            SpliceError::MissingOutput(id) => Self::missing_output(Some(id)),
            other => Self::InvalidResultShape(other.to_string()),
        }
    }
}

/// Side of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingRole {
    Input,
    Output,
}

impl fmt::Display for BindingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Collaborator failure, passed through opaquely
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct CollabError {
    /// Failure classification
    pub kind: CollabErrorKind,
    /// Collaborator-provided message
    pub message: String,
}

impl CollabError {
    /// User dismissed a modal
    #[inline]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            kind: CollabErrorKind::Cancelled,
            message: message.into(),
        }
    }

    /// Capability not configured
    #[inline]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: CollabErrorKind::Unavailable,
            message: message.into(),
        }
    }

    /// Collaborator reported an error
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: CollabErrorKind::Failed,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CollabError {
    fn from(err: serde_json::Error) -> Self {
        Self::failed(format!("malformed payload: {err}"))
    }
}

/// Collaborator failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollabErrorKind {
    /// Modal cancelled
    Cancelled,
    /// Capability missing
    Unavailable,
    /// Network, storage or contract failure
    Failed,
}

impl fmt::Display for CollabErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::Unavailable => f.write_str("unavailable"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Remote execution bridge errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// Request could not be handed to the runner
    #[error("bridge transport closed: {0}")]
    Transport(String),

    /// Runner reported `success: false`
    #[error("{0}")]
    Remote(String),

    /// No reply within the configured limit
    #[error("task {task_id} got no reply within {secs}s")]
    TimedOut {
        /// Correlation id of the call
        task_id: String,
        /// Configured limit
        secs: u64,
    },

    /// Reply slot dropped before a reply arrived
    #[error("task {0} was abandoned by the bridge")]
    Abandoned(String),
}

impl From<BridgeError> for MacroError {
    fn from(err: BridgeError) -> Self {
        Self::BridgeExecution(err.to_string())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

fn display_id(id: Option<&ElementId>) -> String {
    id.map_or_else(|| "<unbound>".to_string(), ToString::to_string)
}

fn join_ids(path: &[ElementId]) -> String {
    path.iter()
        .map(ElementId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_error_display() {
        let err = MacroError::MacroNotRegistered("increment".to_string());
        assert_eq!(err.to_string(), "macro `increment` is not registered");

        let err = MacroError::missing_output(None);
        assert_eq!(err.to_string(), "output element <unbound> is not in the scene");

        let err = MacroError::missing_input("abc");
        assert!(err.to_string().starts_with("input element abc"));
    }

    #[test]
    fn collaborator_classification() {
        let cancelled = MacroError::from(CollabError::cancelled("closed"));
        assert!(cancelled.is_user_cancellation());
        assert!(cancelled.is_collaborator_failure());

        let failed = MacroError::from(CollabError::failed("503"));
        assert!(!failed.is_user_cancellation());

        let bridge = MacroError::from(BridgeError::Remote("ZeroDivisionError".into()));
        assert!(bridge.is_collaborator_failure());
        assert_eq!(bridge.to_string(), "remote execution failed: ZeroDivisionError");

        assert!(!MacroError::InvalidInput("x".into()).is_collaborator_failure());
    }

    #[test]
    fn splice_missing_output_maps_to_binding() {
        let err = MacroError::from(SpliceError::MissingOutput("out".into()));
        assert!(matches!(
            err,
            MacroError::MissingBinding {
                role: BindingRole::Output,
                ..
            }
        ));
    }

    #[test]
    fn resolve_cycle_keeps_path() {
        let err = MacroError::from(ResolveError::CycleDetected {
            path: vec!["a".into(), "a".into()],
        });
        assert_eq!(err.to_string(), "cycle detected while resolving path: a -> a");
    }
}
