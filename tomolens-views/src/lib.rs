pub mod error;
pub mod export;
pub mod graph;
pub mod index;
pub mod overlay;
pub mod points;
pub mod scatter;
pub mod schema;
pub mod session;
pub mod slice;
pub mod table;

pub use error::ViewError;
pub use graph::{ArtifactId, ViewController};
pub use index::{LabelEntry, LabelIndex};
pub use scatter::{scatter_from_table, ScatterData, ScatterPoint};
pub use session::{
    DataSource, LoadedData, MemorySource, SelectionContext, Session, ViewMode,
};
pub use slice::{SliceFrame, SliceSequence};
pub use table::{
    resolve_subcluster, split_back_reference, subcluster_file_name, EmbeddingRow, EmbeddingTable,
    SubclusterSource,
};

/// Convenience result type for the views crate.
pub type Result<T> = std::result::Result<T, ViewError>;
