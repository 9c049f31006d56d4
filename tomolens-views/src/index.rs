use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use tomolens_core::{BoundingBox, LabelVolume};

/// Per-instance summary recorded by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelEntry {
    pub bbox: BoundingBox,
    pub voxels: usize,
}

/// Bounding boxes and voxel counts for every instance in a label volume.
///
/// One scan amortizes what repeated [`tomolens_core::locate`] calls would
/// cost across many instances: the session validates ids against the index
/// in O(1), and batch extraction reuses the recorded boxes. The scan is
/// parallelized over z-slabs and merged by box union, so the result is
/// identical to a sequential pass.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    entries: HashMap<u32, LabelEntry>,
}

impl LabelIndex {
    pub fn build(labels: &LabelVolume) -> Self {
        let [nz, ny, nx] = labels.shape;
        let slab = ny * nx;

        let entries = (0..nz)
            .into_par_iter()
            .map(|z| {
                let mut local: HashMap<u32, LabelEntry> = HashMap::new();
                let base = z * slab;
                for y in 0..ny {
                    let row = base + y * nx;
                    for x in 0..nx {
                        let id = labels.data[row + x];
                        if id == 0 {
                            continue;
                        }
                        local
                            .entry(id)
                            .and_modify(|e| {
                                e.bbox.include(z, y, x);
                                e.voxels += 1;
                            })
                            .or_insert(LabelEntry {
                                bbox: BoundingBox::voxel(z, y, x),
                                voxels: 1,
                            });
                    }
                }
                local
            })
            .reduce(HashMap::new, |mut acc, local| {
                for (id, entry) in local {
                    acc.entry(id)
                        .and_modify(|e| {
                            e.bbox = e.bbox.merge(&entry.bbox);
                            e.voxels += entry.voxels;
                        })
                        .or_insert(entry);
                }
                acc
            });

        debug!(instances = entries.len(), "Built label index");
        Self { entries }
    }

    pub fn get(&self, id: u32) -> Option<&LabelEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// All instance ids, ascending.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tomolens_core::locate;

    fn synthetic_labels() -> LabelVolume {
        let mut l = LabelVolume::zeros([24, 24, 24]);
        // Three instances, one of them split across distant corners.
        for (id, origin, size) in [
            (1u32, [0usize, 0, 0], [3usize, 3, 3]),
            (2, [10, 12, 14], [5, 2, 6]),
            (7, [20, 20, 20], [2, 2, 2]),
        ] {
            for z in origin[0]..origin[0] + size[0] {
                for y in origin[1]..origin[1] + size[1] {
                    for x in origin[2]..origin[2] + size[2] {
                        let i = l.index(z, y, x);
                        l.data[i] = id;
                    }
                }
            }
        }
        let i = l.index(0, 23, 0);
        l.data[i] = 7;
        l
    }

    #[test]
    fn index_agrees_with_locate_for_every_id() {
        let labels = synthetic_labels();
        let index = LabelIndex::build(&labels);
        assert_eq!(index.ids(), vec![1, 2, 7]);
        for id in index.ids() {
            let expected = locate(&labels, id).unwrap();
            assert_eq!(index.get(id).unwrap().bbox, expected, "id {id}");
        }
    }

    #[test]
    fn index_never_contains_background() {
        let index = LabelIndex::build(&synthetic_labels());
        assert!(!index.contains(0));
    }

    #[test]
    fn voxel_counts_are_exact() {
        let index = LabelIndex::build(&synthetic_labels());
        assert_eq!(index.get(1).unwrap().voxels, 27);
        assert_eq!(index.get(2).unwrap().voxels, 60);
        assert_eq!(index.get(7).unwrap().voxels, 9);
    }

    #[test]
    fn empty_volume_builds_empty_index() {
        let index = LabelIndex::build(&LabelVolume::zeros([8, 8, 8]));
        assert!(index.is_empty());
    }
}
