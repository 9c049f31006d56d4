use tracing::debug;

use crate::bbox::locate;
use crate::volume::{LabelVolume, Volume};

/// Default canonical patch shape, matching the 64³ training crop size.
pub const CANONICAL_SHAPE: [usize; 3] = [64, 64, 64];

/// A dense fixed-shape 3-D crop, axes ordered (Z, Y, X) like [`Volume`].
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub shape: [usize; 3],
    pub data: Vec<f32>,
}

impl Patch {
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape[0] * shape[1] * shape[2]],
        }
    }

    #[inline]
    pub fn index(&self, z: usize, y: usize, x: usize) -> usize {
        (z * self.shape[1] + y) * self.shape[2] + x
    }

    #[inline]
    pub fn get(&self, z: usize, y: usize, x: usize) -> f32 {
        self.data[self.index(z, y, x)]
    }

    /// Min/max over the patch, for display normalization.
    pub fn intensity_range(&self) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in &self.data {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        if min > max {
            (0.0, 0.0)
        } else {
            (min, max)
        }
    }
}

/// All three canonical crops of one instance, produced by a single
/// extraction pass: the plain intensity crop, the masked intensity crop,
/// and the membership mask (1.0 inside the instance, 0.0 outside).
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSet {
    pub image: Patch,
    pub masked: Patch,
    pub mask: Patch,
}

/// Per-axis placement of the bounding-box crop inside the canonical patch.
///
/// Pre-pad is `max(ceil((canonical - actual) / 2), 0)`, post-pad
/// `max(floor(..), 0)` — the crop sits centered when it fits, flush at the
/// origin when it does not.
fn pre_pad(canonical: usize, actual: usize) -> usize {
    let deficit = canonical as isize - actual as isize;
    if deficit > 0 {
        ((deficit + 1) / 2) as usize
    } else {
        0
    }
}

/// Extract the canonical patches of `instance_id` from a volume/label pair.
///
/// Crops both arrays to the instance's bounding box, then pads with zeros to
/// the canonical shape (centered), then truncates to exactly `canonical`
/// voxels per axis.
///
/// **Origin-anchored truncation**: when the bounding box exceeds the
/// canonical size on an axis, the output keeps the first `canonical` voxels
/// from the box's origin corner on that axis — not a centered window. Large
/// instances are therefore clipped asymmetrically toward their low-index
/// corner.
///
/// Fails with [`CoreError::ShapeMismatch`](crate::CoreError::ShapeMismatch)
/// on an unpaired volume/label pair and propagates
/// [`CoreError::InstanceNotFound`](crate::CoreError::InstanceNotFound) from
/// the bounding-box search; there is no other error path.
pub fn extract(
    volume: &Volume,
    labels: &LabelVolume,
    instance_id: u32,
    canonical: [usize; 3],
) -> crate::Result<PatchSet> {
    labels.check_paired(volume)?;
    let bbox = locate(labels, instance_id)?;
    let size = bbox.size();
    debug!(instance_id, ?size, "Extracting canonical patch");

    let mut image = Patch::zeros(canonical);
    let mut masked = Patch::zeros(canonical);
    let mut mask = Patch::zeros(canonical);

    let pre = [
        pre_pad(canonical[0], size[0]),
        pre_pad(canonical[1], size[1]),
        pre_pad(canonical[2], size[2]),
    ];

    // Overlap of the (padded) crop with the canonical output on each axis.
    let span = [
        size[0].min(canonical[0] - pre[0]),
        size[1].min(canonical[1] - pre[1]),
        size[2].min(canonical[2] - pre[2]),
    ];

    for dz in 0..span[0] {
        let sz = bbox.min[0] + dz;
        let oz = pre[0] + dz;
        for dy in 0..span[1] {
            let sy = bbox.min[1] + dy;
            let oy = pre[1] + dy;
            let src_row = volume.index(sz, sy, bbox.min[2]);
            let dst_row = image.index(oz, oy, pre[2]);
            for dx in 0..span[2] {
                let v = volume.data[src_row + dx];
                let member = labels.data[src_row + dx] == instance_id;
                image.data[dst_row + dx] = v;
                if member {
                    masked.data[dst_row + dx] = v;
                    mask.data[dst_row + dx] = 1.0;
                }
            }
        }
    }

    Ok(PatchSet {
        image,
        masked,
        mask,
    })
}

/// Build a single canonical patch of `instance_id`.
///
/// With `masked` set, voxels outside the instance's membership mask are
/// zeroed; otherwise the crop is taken from the volume unchanged. Same
/// padding and origin-anchored truncation policy as [`extract`].
pub fn build(
    volume: &Volume,
    labels: &LabelVolume,
    instance_id: u32,
    canonical: [usize; 3],
    masked: bool,
) -> crate::Result<Patch> {
    let set = extract(volume, labels, instance_id, canonical)?;
    Ok(if masked { set.masked } else { set.image })
}
