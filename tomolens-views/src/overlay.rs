//! Full-volume label layers for the filtered-segmentation view.
//!
//! The render sink draws these on top of the tomogram: the semantic mask
//! restricted to the configured keep labels, and the surviving particle
//! voxels. Values follow the display convention of the original filtered
//! view (mask voxels 1, particle voxels 2).

use tomolens_core::LabelVolume;

/// A named full-volume overlay for the render sink.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelOverlay {
    pub name: String,
    pub shape: [usize; 3],
    pub data: Vec<u8>,
}

impl LabelOverlay {
    /// Number of non-zero voxels.
    pub fn active_voxels(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// Voxels whose semantic label is in `keep`: value 1, everything else 0.
pub fn membership_overlay(labels: &LabelVolume, keep: &[u32]) -> LabelOverlay {
    LabelOverlay {
        name: "mask".to_string(),
        shape: labels.shape,
        data: labels
            .data
            .iter()
            .map(|v| u8::from(keep.contains(v)))
            .collect(),
    }
}

/// All instance voxels at value 2, background 0.
pub fn particle_overlay(instances: &LabelVolume) -> LabelOverlay {
    LabelOverlay {
        name: "filtered_particles".to_string(),
        shape: instances.shape,
        data: instances.data.iter().map(|&v| if v > 0 { 2 } else { 0 }).collect(),
    }
}
