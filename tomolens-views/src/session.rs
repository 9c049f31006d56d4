use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use tomolens_core::{Axis, LabelVolume, Volume};

use crate::error::ViewError;
use crate::index::LabelIndex;
use crate::table::{resolve_subcluster, split_back_reference, EmbeddingTable, SubclusterSource};

/// What the 2-D slice view shows: the intensity crop or the membership mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Intensity,
    Mask,
}

impl ViewMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Intensity => "image",
            Self::Mask => "mask",
        }
    }

    pub const ALL: [ViewMode; 2] = [ViewMode::Intensity, ViewMode::Mask];
}

/// Snapshot of "what is currently being viewed".
///
/// An explicit value passed into and out of every event handler — there is
/// no process-wide mutable view state anywhere in the workspace. Cloneable
/// and comparable so derived views can detect unchanged inputs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionContext {
    pub file_stem: Option<String>,
    pub cluster: Option<String>,
    pub subcluster: Option<String>,
    pub instance: Option<u32>,
    pub slice_axis: Axis,
    pub view_mode: ViewMode,
}

/// Trait seam to the external collaborators that own file formats.
///
/// Static dispatch — sessions are generic over `S: DataSource` so the core
/// never links against a container decoder or a rendering widget.
pub trait DataSource {
    fn load_volume(&self, stem: &str) -> crate::Result<Volume>;
    fn load_label_volume(&self, stem: &str) -> crate::Result<LabelVolume>;
    fn load_embedding_table(&self, stem: &str) -> crate::Result<EmbeddingTable>;

    /// The precomputed subcluster table for `cluster_id`, when one exists.
    /// `Ok(None)` means "no such file" and triggers the in-memory fallback;
    /// an existing-but-unreadable table is an error.
    fn load_subcluster_table(&self, cluster_id: &str) -> crate::Result<Option<EmbeddingTable>>;
}

/// Everything loaded for the active file. Replaced wholesale on every file
/// switch — the cache policy is keep-only-active.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub stem: String,
    pub volume: Volume,
    pub labels: LabelVolume,
    pub table: EmbeddingTable,
    pub index: LabelIndex,
}

/// The resolved subcluster table for the active cluster.
#[derive(Debug, Clone)]
pub struct ActiveSubcluster {
    pub cluster_id: String,
    pub table: EmbeddingTable,
    pub source: SubclusterSource,
}

/// Owns the selection context and the data backing it.
///
/// Every operation is synchronous and atomic: it reads the context,
/// performs any required load, mutates the context, and returns. A failed
/// load leaves the previous selection fully intact.
pub struct Session<S: DataSource> {
    source: S,
    context: SelectionContext,
    data: Option<LoadedData>,
    subcluster: Option<ActiveSubcluster>,
}

impl<S: DataSource> Session<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            context: SelectionContext::default(),
            data: None,
            subcluster: None,
        }
    }

    pub fn context(&self) -> &SelectionContext {
        &self.context
    }

    pub fn data(&self) -> Option<&LoadedData> {
        self.data.as_ref()
    }

    pub fn subcluster(&self) -> Option<&ActiveSubcluster> {
        self.subcluster.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Replace the active file: reload volume, label volume, and embedding
    /// table, then reset the instance/cluster/subcluster selection.
    ///
    /// Loads are staged and committed together — on any error the previous
    /// selection stays intact.
    pub fn select_file(&mut self, stem: &str) -> crate::Result<()> {
        let volume = self.source.load_volume(stem)?;
        let labels = self.source.load_label_volume(stem)?;
        labels
            .check_paired(&volume)
            .map_err(|e| ViewError::data_load(PathBuf::from(stem), e.to_string()))?;
        let table = self.source.load_embedding_table(stem)?;
        let index = LabelIndex::build(&labels);

        info!(
            stem,
            shape = ?volume.shape,
            instances = index.len(),
            rows = table.len(),
            "Selected file"
        );

        self.data = Some(LoadedData {
            stem: stem.to_string(),
            volume,
            labels,
            table,
            index,
        });
        self.subcluster = None;
        self.context.file_stem = Some(stem.to_string());
        self.context.cluster = None;
        self.context.subcluster = None;
        self.context.instance = None;
        Ok(())
    }

    /// Select an instance by id. The id must be present in the active label
    /// volume; background (0) is never a valid instance.
    pub fn select_instance(&mut self, id: u32) -> crate::Result<()> {
        let present = self
            .data
            .as_ref()
            .is_some_and(|d| d.index.contains(id));
        if !present {
            return Err(tomolens_core::CoreError::InstanceNotFound(id).into());
        }
        self.context.instance = Some(id);
        Ok(())
    }

    /// Select a cluster: a precomputed subcluster table takes precedence;
    /// otherwise one is derived by filtering the primary table.
    pub fn select_cluster(&mut self, cluster_id: &str) -> crate::Result<SubclusterSource> {
        let precomputed = self.source.load_subcluster_table(cluster_id)?;
        let empty = EmbeddingTable::empty();
        let primary = self.data.as_ref().map(|d| &d.table).unwrap_or(&empty);
        let (table, source) = resolve_subcluster(precomputed, primary, cluster_id);

        info!(cluster_id, ?source, rows = table.len(), "Selected cluster");
        self.subcluster = Some(ActiveSubcluster {
            cluster_id: cluster_id.to_string(),
            table,
            source,
        });
        self.context.cluster = Some(cluster_id.to_string());
        self.context.subcluster = None;
        Ok(source)
    }

    pub fn select_subcluster(&mut self, subcluster_id: &str) {
        self.context.subcluster = Some(subcluster_id.to_string());
    }

    pub fn set_slice_axis(&mut self, axis: Axis) {
        self.context.slice_axis = axis;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.context.view_mode = mode;
    }

    /// Resolve an embedding row's back-reference against the loaded data.
    ///
    /// Fails with `StaleReference` when the label encodes a different file
    /// than the active one or an instance id absent from its label volume —
    /// a mismatch means the caller passed a stale table, and extraction must
    /// fail rather than fall back to another instance.
    pub fn resolve_back_reference(&self, label: &str) -> crate::Result<u32> {
        let (stem, id) = split_back_reference(label)?;
        let data = self.data.as_ref().ok_or_else(|| {
            ViewError::stale(label, "no file is currently loaded")
        })?;
        if data.stem != stem {
            return Err(ViewError::stale(
                label,
                format!("references file {:?} but {:?} is loaded", stem, data.stem),
            ));
        }
        if !data.index.contains(id) {
            return Err(ViewError::stale(
                label,
                format!("instance {id} is not present in the label volume"),
            ));
        }
        Ok(id)
    }
}

/// An in-memory data source, for tests and for embedding TomoLens as a
/// library over already-decoded arrays.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, (Volume, LabelVolume, EmbeddingTable)>,
    subclusters: HashMap<String, EmbeddingTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_file(
        &mut self,
        stem: &str,
        volume: Volume,
        labels: LabelVolume,
        table: EmbeddingTable,
    ) {
        self.files.insert(stem.to_string(), (volume, labels, table));
    }

    pub fn insert_subcluster(&mut self, cluster_id: &str, table: EmbeddingTable) {
        self.subclusters.insert(cluster_id.to_string(), table);
    }

    fn missing(stem: &str) -> ViewError {
        ViewError::data_load(PathBuf::from(stem), "no such file")
    }
}

impl DataSource for MemorySource {
    fn load_volume(&self, stem: &str) -> crate::Result<Volume> {
        self.files
            .get(stem)
            .map(|(v, _, _)| v.clone())
            .ok_or_else(|| Self::missing(stem))
    }

    fn load_label_volume(&self, stem: &str) -> crate::Result<LabelVolume> {
        self.files
            .get(stem)
            .map(|(_, l, _)| l.clone())
            .ok_or_else(|| Self::missing(stem))
    }

    fn load_embedding_table(&self, stem: &str) -> crate::Result<EmbeddingTable> {
        self.files
            .get(stem)
            .map(|(_, _, t)| t.clone())
            .ok_or_else(|| Self::missing(stem))
    }

    fn load_subcluster_table(&self, cluster_id: &str) -> crate::Result<Option<EmbeddingTable>> {
        Ok(self.subclusters.get(cluster_id).cloned())
    }
}
