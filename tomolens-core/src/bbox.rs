use crate::error::CoreError;
use crate::volume::LabelVolume;

/// The tightest axis-aligned region containing all voxels of one instance.
///
/// Half-open on every axis: a voxel `(z, y, x)` is inside when
/// `min[a] <= coord[a] < max[a]` for all three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: [usize; 3],
    pub max: [usize; 3],
}

impl BoundingBox {
    /// A degenerate box containing exactly one voxel.
    pub fn voxel(z: usize, y: usize, x: usize) -> Self {
        Self {
            min: [z, y, x],
            max: [z + 1, y + 1, x + 1],
        }
    }

    /// Extent along one axis, in voxels.
    #[inline]
    pub fn extent(&self, axis: usize) -> usize {
        self.max[axis] - self.min[axis]
    }

    /// Extents along all three axes.
    pub fn size(&self) -> [usize; 3] {
        [self.extent(0), self.extent(1), self.extent(2)]
    }

    #[inline]
    pub fn contains(&self, z: usize, y: usize, x: usize) -> bool {
        let p = [z, y, x];
        (0..3).all(|a| self.min[a] <= p[a] && p[a] < self.max[a])
    }

    /// Grow the box to include one more voxel.
    pub fn include(&mut self, z: usize, y: usize, x: usize) {
        let p = [z, y, x];
        for a in 0..3 {
            self.min[a] = self.min[a].min(p[a]);
            self.max[a] = self.max[a].max(p[a] + 1);
        }
    }

    /// The union of two boxes.
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        let mut min = [0; 3];
        let mut max = [0; 3];
        for a in 0..3 {
            min[a] = self.min[a].min(other.min[a]);
            max[a] = self.max[a].max(other.max[a]);
        }
        BoundingBox { min, max }
    }
}

/// Find the tightest bounding box of `instance_id` in `labels`.
///
/// One deterministic pass over the volume. Fails with
/// [`CoreError::InstanceNotFound`] when no voxel carries the id; id 0 is
/// background and never locatable.
pub fn locate(labels: &LabelVolume, instance_id: u32) -> crate::Result<BoundingBox> {
    if instance_id == 0 {
        return Err(CoreError::InstanceNotFound(0));
    }
    let [nz, ny, nx] = labels.shape;
    let mut bbox: Option<BoundingBox> = None;

    let mut i = 0;
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                if labels.data[i] == instance_id {
                    match bbox.as_mut() {
                        Some(b) => b.include(z, y, x),
                        None => bbox = Some(BoundingBox::voxel(z, y, x)),
                    }
                }
                i += 1;
            }
        }
    }

    bbox.ok_or(CoreError::InstanceNotFound(instance_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_with_cube(
        shape: [usize; 3],
        id: u32,
        origin: [usize; 3],
        size: [usize; 3],
    ) -> LabelVolume {
        let mut l = LabelVolume::zeros(shape);
        for z in origin[0]..origin[0] + size[0] {
            for y in origin[1]..origin[1] + size[1] {
                for x in origin[2]..origin[2] + size[2] {
                    let i = l.index(z, y, x);
                    l.data[i] = id;
                }
            }
        }
        l
    }

    #[test]
    fn locate_finds_tight_box() {
        let l = labels_with_cube([20, 20, 20], 5, [3, 4, 5], [2, 3, 4]);
        let b = locate(&l, 5).unwrap();
        assert_eq!(b.min, [3, 4, 5]);
        assert_eq!(b.max, [5, 7, 9]);
        assert_eq!(b.size(), [2, 3, 4]);
    }

    #[test]
    fn locate_box_is_tight_on_every_face() {
        let l = labels_with_cube([10, 10, 10], 2, [1, 2, 3], [4, 3, 2]);
        let b = locate(&l, 2).unwrap();
        // Every face of the box must touch at least one voxel of the id.
        for a in 0..3 {
            let mut lo_touched = false;
            let mut hi_touched = false;
            for z in b.min[0]..b.max[0] {
                for y in b.min[1]..b.max[1] {
                    for x in b.min[2]..b.max[2] {
                        if l.get(z, y, x) == 2 {
                            let p = [z, y, x];
                            lo_touched |= p[a] == b.min[a];
                            hi_touched |= p[a] == b.max[a] - 1;
                        }
                    }
                }
            }
            assert!(lo_touched && hi_touched, "axis {a} not tight");
        }
    }

    #[test]
    fn locate_spans_disconnected_components() {
        let mut l = LabelVolume::zeros([10, 10, 10]);
        let i0 = l.index(1, 1, 1);
        let i1 = l.index(8, 2, 7);
        l.data[i0] = 9;
        l.data[i1] = 9;
        let b = locate(&l, 9).unwrap();
        assert_eq!(b.min, [1, 1, 1]);
        assert_eq!(b.max, [9, 3, 8]);
    }

    #[test]
    fn locate_single_voxel() {
        let mut l = LabelVolume::zeros([5, 5, 5]);
        let i = l.index(2, 3, 4);
        l.data[i] = 1;
        let b = locate(&l, 1).unwrap();
        assert_eq!(b.size(), [1, 1, 1]);
        assert!(b.contains(2, 3, 4));
    }

    #[test]
    fn locate_absent_id_fails() {
        let l = labels_with_cube([8, 8, 8], 3, [0, 0, 0], [2, 2, 2]);
        assert!(matches!(
            locate(&l, 4),
            Err(CoreError::InstanceNotFound(4))
        ));
    }

    #[test]
    fn locate_background_fails() {
        let l = LabelVolume::zeros([4, 4, 4]);
        assert!(matches!(
            locate(&l, 0),
            Err(CoreError::InstanceNotFound(0))
        ));
    }

    #[test]
    fn merge_is_union() {
        let a = BoundingBox {
            min: [0, 2, 4],
            max: [1, 5, 6],
        };
        let b = BoundingBox {
            min: [3, 0, 5],
            max: [4, 3, 9],
        };
        let m = a.merge(&b);
        assert_eq!(m.min, [0, 0, 4]);
        assert_eq!(m.max, [4, 5, 9]);
    }
}
