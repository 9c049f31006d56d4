use std::path::PathBuf;

use thiserror::Error;

/// Errors originating from data loading and view derivation.
///
/// All of these surface to the interactive caller as a message attached to
/// the view region they affect; none crash the process, and none are
/// retried — they are corrected by the user re-selecting valid inputs.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("failed to load {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("stale reference {label:?}: {reason}")]
    StaleReference { label: String, reason: String },

    #[error(transparent)]
    Core(#[from] tomolens_core::CoreError),
}

impl ViewError {
    /// Shorthand for a [`ViewError::DataLoad`] with a formatted reason.
    pub fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn stale(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StaleReference {
            label: label.into(),
            reason: reason.into(),
        }
    }
}
