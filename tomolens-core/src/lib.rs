pub mod bbox;
pub mod error;
pub mod patch;
pub mod volume;

// Re-export primary types for convenience.
pub use bbox::{locate, BoundingBox};
pub use error::CoreError;
pub use patch::{build, extract, Patch, PatchSet, CANONICAL_SHAPE};
pub use volume::{Axis, LabelVolume, Volume};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
