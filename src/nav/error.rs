use thiserror::Error;

use super::lifecycle::Phase;

/// Everything a navigation request can fail with.
///
/// Ordering violations (hiding a popup that is not on top) are not errors;
/// `Navigator::hide_popup` reports them as `Ok(false)`.
#[derive(Debug, Error)]
pub enum NavError {
    /// The name is not in the view catalog
    #[error("no view registered under '{0}'")]
    NotFound(String),

    /// The injector or a factory failed while building the controller
    #[error("failed to construct '{name}': {cause:#}")]
    Construction { name: String, cause: anyhow::Error },

    /// A typed request named a presenter or view type the entry does not have
    #[error("'{name}' is a {actual}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The controller is already the page or already on the popup stack
    #[error("'{0}' is already on screen")]
    AlreadyActive(String),

    /// The controller is in the middle of another transition
    #[error("'{name}' is {phase:?}, cannot start another transition")]
    Busy { name: String, phase: Phase },

    /// A view transition returned an error
    #[error("transition of '{name}' failed: {cause:#}")]
    Transition { name: String, cause: anyhow::Error },

    /// The task running the navigation step was aborted or panicked
    #[error("navigation task for '{name}' did not complete: {reason}")]
    Aborted { name: String, reason: String },

    /// `Navigator::shutdown` has run
    #[error("navigator has been shut down")]
    ShutDown,
}

impl NavError {
    pub(crate) fn construction(name: &str, cause: anyhow::Error) -> Self {
        NavError::Construction {
            name: name.to_string(),
            cause,
        }
    }

    pub(crate) fn transition(name: &str, cause: anyhow::Error) -> Self {
        NavError::Transition {
            name: name.to_string(),
            cause,
        }
    }

    /// True for failures that happen before any state changes
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            NavError::NotFound(_) | NavError::Construction { .. } | NavError::TypeMismatch { .. }
        )
    }
}
