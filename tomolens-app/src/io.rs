//! The on-disk volume container and the folder-backed data source.
//!
//! Volumes are stored as a single file: an 8-byte little-endian length, a
//! JSON header (`dims` in (Z, Y, X) order plus `dtype`), padding to a
//! 16-byte boundary, then the raw little-endian voxel payload. Files are
//! memory-mapped on read so only the touched pages cost anything.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tomolens_core::{LabelVolume, Volume};
use tomolens_views::overlay::{membership_overlay, LabelOverlay};
use tomolens_views::{
    subcluster_file_name, DataSource, EmbeddingTable, ViewError,
};

use crate::config::VisConfig;

#[derive(Debug, Serialize, Deserialize)]
struct ContainerMeta {
    dims: [usize; 3],
    dtype: String,
}

fn data_load(path: &Path, reason: impl Into<String>) -> ViewError {
    ViewError::DataLoad {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn read_container(path: &Path, dtype: &str) -> Result<(ContainerMeta, Vec<u8>), ViewError> {
    let file = File::open(path).map_err(|e| data_load(path, e.to_string()))?;
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| data_load(path, e.to_string()))?;

    if mmap.len() < 8 {
        return Err(data_load(path, "file too small for container header"));
    }
    let json_len = u64::from_le_bytes(mmap[0..8].try_into().expect("8-byte slice")) as usize;
    let json_end = 8 + json_len;
    if mmap.len() < json_end {
        return Err(data_load(path, "header length exceeds file size"));
    }
    let meta: ContainerMeta = serde_json::from_slice(&mmap[8..json_end])
        .map_err(|e| data_load(path, format!("bad container header: {e}")))?;
    if meta.dtype != dtype {
        return Err(data_load(
            path,
            format!("expected dtype {dtype:?}, found {:?}", meta.dtype),
        ));
    }

    // Payload starts at the next 16-byte boundary after the header.
    let pad = (16 - (json_end % 16)) % 16;
    let data_start = json_end + pad;
    let voxels = meta.dims[0] * meta.dims[1] * meta.dims[2];
    let data_end = data_start + voxels * 4;
    if mmap.len() < data_end {
        return Err(data_load(
            path,
            format!("payload truncated: need {voxels} voxels for dims {:?}", meta.dims),
        ));
    }

    debug!(path = %path.display(), dims = ?meta.dims, dtype, "Read volume container");
    Ok((meta, mmap[data_start..data_end].to_vec()))
}

/// Read an `f32` intensity volume from a container file.
pub fn load_volume_file(path: &Path) -> Result<Volume, ViewError> {
    let (meta, bytes) = read_container(path, "f32")?;
    let data = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes(c.try_into().expect("4-byte chunk")))
        .collect();
    Volume::new(meta.dims, data).map_err(|e| data_load(path, e.to_string()))
}

/// Read a `u32` label volume from a container file.
pub fn load_label_file(path: &Path) -> Result<LabelVolume, ViewError> {
    let (meta, bytes) = read_container(path, "u32")?;
    let data = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes(c.try_into().expect("4-byte chunk")))
        .collect();
    LabelVolume::new(meta.dims, data).map_err(|e| data_load(path, e.to_string()))
}

fn write_container(path: &Path, dims: [usize; 3], dtype: &str, payload: &[u8]) -> Result<(), ViewError> {
    let header = serde_json::to_vec(&ContainerMeta {
        dims,
        dtype: dtype.to_string(),
    })
    .map_err(|e| data_load(path, e.to_string()))?;
    let json_end = 8 + header.len();
    let pad = (16 - (json_end % 16)) % 16;

    let mut file = File::create(path).map_err(|e| data_load(path, e.to_string()))?;
    file.write_all(&(header.len() as u64).to_le_bytes())
        .and_then(|_| file.write_all(&header))
        .and_then(|_| file.write_all(&vec![0u8; pad]))
        .and_then(|_| file.write_all(payload))
        .map_err(|e| data_load(path, e.to_string()))
}

/// Write an intensity volume as a container file (used by the patch-saving
/// action and by tests).
pub fn write_volume_file(path: &Path, shape: [usize; 3], data: &[f32]) -> Result<(), ViewError> {
    let payload: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_container(path, shape, "f32", &payload)
}

/// Write a label volume as a container file.
pub fn write_label_file(path: &Path, labels: &LabelVolume) -> Result<(), ViewError> {
    let payload: Vec<u8> = labels.data.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_container(path, labels.shape, "u32", &payload)
}

/// Folder-backed data source following the pipeline's naming conventions.
pub struct FolderSource {
    config: VisConfig,
}

impl FolderSource {
    pub fn new(config: VisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VisConfig {
        &self.config
    }

    /// The filtered-segmentation overlay for a tomogram: semantic voxels
    /// whose label is in the configured keep list. `None` when no filtering
    /// folder is configured.
    pub fn load_filtering_overlay(&self, stem: &str) -> Result<Option<LabelOverlay>, ViewError> {
        let Some(path) = self.config.semantic_path(stem) else {
            return Ok(None);
        };
        let semantic = load_label_file(&path)?;
        Ok(Some(membership_overlay(
            &semantic,
            &self.config.filtering_mask_labels,
        )))
    }
}

impl DataSource for FolderSource {
    fn load_volume(&self, stem: &str) -> tomolens_views::Result<Volume> {
        load_volume_file(&self.config.volume_path(stem))
    }

    fn load_label_volume(&self, stem: &str) -> tomolens_views::Result<LabelVolume> {
        load_label_file(&self.config.labels_path(stem))
    }

    fn load_embedding_table(&self, stem: &str) -> tomolens_views::Result<EmbeddingTable> {
        EmbeddingTable::load(&self.config.table_path(stem))
    }

    fn load_subcluster_table(
        &self,
        cluster_id: &str,
    ) -> tomolens_views::Result<Option<EmbeddingTable>> {
        let path = self
            .config
            .prediction_folder
            .join(subcluster_file_name(cluster_id));
        if !path.exists() {
            return Ok(None);
        }
        EmbeddingTable::load(&path).map(Some)
    }
}
