use thiserror::Error;

/// Errors originating from the core extraction engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("instance id {0} not present in label volume")]
    InstanceNotFound(u32),

    #[error("volume shape {volume:?} does not match label volume shape {labels:?}")]
    ShapeMismatch {
        volume: [usize; 3],
        labels: [usize; 3],
    },

    #[error("invalid volume shape: {reason}")]
    InvalidShape { reason: String },
}
