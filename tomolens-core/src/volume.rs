use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One of the three volume axes, in (Z, Y, X) storage order.
///
/// Z is the slowest-varying axis; X the fastest. Slice views and bounding
/// boxes index their per-axis data through [`Axis::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Z,
    Y,
    X,
}

impl Axis {
    /// Position of this axis in a `[usize; 3]` shape array.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::Z => 0,
            Self::Y => 1,
            Self::X => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Z => "z",
            Self::Y => "y",
            Self::X => "x",
        }
    }

    pub const ALL: [Axis; 3] = [Axis::Z, Axis::Y, Axis::X];
}

impl Default for Axis {
    fn default() -> Self {
        Self::Z
    }
}

fn check_len(shape: [usize; 3], len: usize) -> crate::Result<()> {
    let expected = shape[0] * shape[1] * shape[2];
    if expected == 0 {
        return Err(CoreError::InvalidShape {
            reason: format!("dimensions must be > 0, got {shape:?}"),
        });
    }
    if len != expected {
        return Err(CoreError::InvalidShape {
            reason: format!("data length {len} does not match shape {shape:?} ({expected} voxels)"),
        });
    }
    Ok(())
}

/// A dense 3-D array of scalar intensities, axes ordered (Z, Y, X).
///
/// Stored as a flat row-major `Vec<f32>`; `data[(z * ny + y) * nx + x]`.
/// Immutable once loaded — the session replaces whole volumes, never
/// mutates voxels.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub shape: [usize; 3],
    pub data: Vec<f32>,
}

impl Volume {
    pub fn new(shape: [usize; 3], data: Vec<f32>) -> crate::Result<Self> {
        check_len(shape, data.len())?;
        Ok(Self { shape, data })
    }

    /// An all-zero volume, mainly for tests and placeholder patches.
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

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Min/max intensity over the whole volume, for display normalization.
    /// Returns `(0.0, 0.0)` for an all-NaN or empty volume.
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

/// A dense 3-D array of instance ids, same layout and shape as its paired
/// [`Volume`]. Background voxels carry id 0; instances are positive ids.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVolume {
    pub shape: [usize; 3],
    pub data: Vec<u32>,
}

impl LabelVolume {
    pub fn new(shape: [usize; 3], data: Vec<u32>) -> crate::Result<Self> {
        check_len(shape, data.len())?;
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            shape,
            data: vec![0; shape[0] * shape[1] * shape[2]],
        }
    }

    #[inline]
    pub fn index(&self, z: usize, y: usize, x: usize) -> usize {
        (z * self.shape[1] + y) * self.shape[2] + x
    }

    #[inline]
    pub fn get(&self, z: usize, y: usize, x: usize) -> u32 {
        self.data[self.index(z, y, x)]
    }

    /// Whether any voxel carries `id`. Linear scan — callers issuing many
    /// queries should build a label index instead.
    pub fn contains(&self, id: u32) -> bool {
        id != 0 && self.data.contains(&id)
    }

    /// Check that this label volume is shape-paired with `volume`.
    pub fn check_paired(&self, volume: &Volume) -> crate::Result<()> {
        if self.shape != volume.shape {
            return Err(CoreError::ShapeMismatch {
                volume: volume.shape,
                labels: self.shape,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_rejects_bad_length() {
        assert!(Volume::new([2, 2, 2], vec![0.0; 7]).is_err());
        assert!(Volume::new([2, 2, 2], vec![0.0; 8]).is_ok());
    }

    #[test]
    fn volume_rejects_zero_dimension() {
        assert!(Volume::new([0, 4, 4], vec![]).is_err());
    }

    #[test]
    fn index_is_row_major_zyx() {
        let mut v = Volume::zeros([2, 3, 4]);
        v.data[v.index(1, 2, 3)] = 7.0;
        assert_eq!(v.data[23], 7.0);
        assert_eq!(v.get(1, 2, 3), 7.0);
    }

    #[test]
    fn intensity_range_spans_data() {
        let v = Volume::new([1, 1, 4], vec![-2.0, 0.5, 3.0, 1.0]).unwrap();
        assert_eq!(v.intensity_range(), (-2.0, 3.0));
    }

    #[test]
    fn labels_contains_ignores_background() {
        let l = LabelVolume::new([1, 1, 3], vec![0, 5, 0]).unwrap();
        assert!(l.contains(5));
        assert!(!l.contains(0));
        assert!(!l.contains(6));
    }

    #[test]
    fn paired_shapes_are_enforced() {
        let v = Volume::zeros([2, 2, 2]);
        let good = LabelVolume::zeros([2, 2, 2]);
        let bad = LabelVolume::zeros([2, 2, 3]);
        assert!(good.check_paired(&v).is_ok());
        assert!(bad.check_paired(&v).is_err());
    }

    #[test]
    fn axis_roundtrips_through_serde() {
        let json = serde_json::to_string(&Axis::Y).unwrap();
        assert_eq!(json, "\"y\"");
        let back: Axis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Axis::Y);
    }
}
