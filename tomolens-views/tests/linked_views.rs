use std::path::Path;

use tomolens_core::{Axis, LabelVolume, Volume};
use tomolens_views::{
    subcluster_file_name, ArtifactId, EmbeddingTable, MemorySource, SubclusterSource,
    ViewController, ViewMode,
};

/// Build a source with one tomogram: a bright 4³ cube (id 3) and a 2³ cube
/// (id 8), plus an embedding table referencing both.
fn source() -> MemorySource {
    let shape = [32, 32, 32];
    let mut volume = Volume::zeros(shape);
    let mut labels = LabelVolume::zeros(shape);
    for (id, origin, side, value) in [
        (3u32, [4usize, 4, 4], 4usize, 10.0f32),
        (8, [20, 20, 20], 2, 20.0),
    ] {
        for z in origin[0]..origin[0] + side {
            for y in origin[1]..origin[1] + side {
                for x in origin[2]..origin[2] + side {
                    let i = volume.index(z, y, x);
                    volume.data[i] = value;
                    labels.data[i] = id;
                }
            }
        }
    }
    let table = EmbeddingTable::read_from(
        "x,y,class,label\n-1.0,0.5,2,TS_3_3\n1.5,-0.5,4,TS_3_8\n".as_bytes(),
        Path::new("TS_3.csv"),
    )
    .unwrap();

    let mut s = MemorySource::new();
    s.insert_file("TS_3", volume, labels, table);
    s
}

#[test]
fn full_drill_down_flow() {
    let mut c = ViewController::new(source()).with_canonical_shape([16, 16, 16]);
    c.file_selected("TS_3").unwrap();

    let scatter = c.primary_scatter().unwrap();
    assert_eq!(scatter.points.len(), 2);
    assert_eq!(scatter.classes, ["2", "4"]);

    // Click the id-3 point: cluster "2" selected, instance 3 selected.
    let src = c.point_clicked("TS_3_3").unwrap();
    assert_eq!(src, SubclusterSource::Derived);
    assert_eq!(c.context().cluster.as_deref(), Some("2"));
    assert_eq!(c.context().instance, Some(3));

    let sub = c.subcluster_scatter().unwrap();
    assert_eq!(sub.points.len(), 1);
    assert_eq!(sub.points[0].label, "TS_3_3");

    // The patch is the masked cube padded to 16³: deficit 12 → offset 6.
    let patch = c.patch3d().unwrap().expect("patch");
    assert_eq!(patch.masked.shape, [16, 16, 16]);
    assert_eq!(patch.masked.get(6, 6, 6), 10.0);
    assert_eq!(patch.masked.get(5, 6, 6), 0.0);
    assert_eq!(patch.mask.get(9, 9, 9), 1.0);
    assert_eq!(patch.mask.get(10, 9, 9), 0.0);

    // Slices along every axis have the canonical frame count.
    for axis in Axis::ALL {
        c.axis_changed(axis);
        let seq = c.slice2d().unwrap().expect("slices");
        assert_eq!(seq.len(), 16);
        assert_eq!(seq.clone().count(), 16);
    }

    // Mask mode swaps the slice content, not its geometry.
    c.view_mode_changed(ViewMode::Mask);
    let seq = c.slice2d().unwrap().expect("slices");
    let frame = seq.frame(8).unwrap();
    assert!(frame.data.iter().all(|&v| v == 0.0 || v == 1.0));
}

#[test]
fn precomputed_subcluster_file_beats_in_memory_filter() {
    // Write a precomputed table whose rows differ from what the in-memory
    // filter would produce.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(subcluster_file_name("2"));
    std::fs::write(&path, "x,y,class,label\n0.0,0.0,sub_a,TS_3_8\n").unwrap();
    let precomputed = EmbeddingTable::load(&path).unwrap();

    let mut s = source();
    s.insert_subcluster("2", precomputed);

    let mut c = ViewController::new(s);
    c.file_selected("TS_3").unwrap();
    let src = c.point_clicked("TS_3_3").unwrap();
    assert_eq!(src, SubclusterSource::Precomputed);

    // The scatter shows the precomputed rows, not the class-2 filter rows.
    let sub = c.subcluster_scatter().unwrap();
    assert_eq!(sub.points.len(), 1);
    assert_eq!(sub.points[0].label, "TS_3_8");
    assert_eq!(sub.points[0].class, "sub_a");
}

#[test]
fn subcluster_click_selects_instance_without_touching_scatters() {
    let mut c = ViewController::new(source());
    c.file_selected("TS_3").unwrap();
    c.point_clicked("TS_3_3").unwrap();
    c.primary_scatter().unwrap();
    c.subcluster_scatter().unwrap();

    let revs = (
        c.revision(ArtifactId::PrimaryScatter),
        c.revision(ArtifactId::SubclusterScatter),
        c.revision(ArtifactId::Patch3D),
    );
    c.subcluster_point_clicked("TS_3_8").unwrap();
    assert_eq!(c.context().instance, Some(8));

    c.primary_scatter().unwrap();
    c.subcluster_scatter().unwrap();
    c.patch3d().unwrap();
    assert_eq!(revs.0, c.revision(ArtifactId::PrimaryScatter));
    assert_eq!(revs.1, c.revision(ArtifactId::SubclusterScatter));
    assert_eq!(revs.2 + 1, c.revision(ArtifactId::Patch3D));
}

#[test]
fn reselecting_the_file_resets_the_drill_down() {
    let mut c = ViewController::new(source());
    c.file_selected("TS_3").unwrap();
    c.point_clicked("TS_3_8").unwrap();
    assert!(c.patch3d().unwrap().is_some());

    c.file_selected("TS_3").unwrap();
    assert_eq!(c.context().instance, None);
    assert_eq!(c.context().cluster, None);
    assert!(c.patch3d().unwrap().is_none());
    assert!(c.subcluster_scatter().unwrap().is_empty());
}
