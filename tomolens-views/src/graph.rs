use tracing::debug;

use tomolens_core::{extract, Axis, PatchSet, CANONICAL_SHAPE};

use crate::error::ViewError;
use crate::scatter::{scatter_from_table, ScatterData};
use crate::session::{DataSource, LoadedData, SelectionContext, Session, ViewMode};
use crate::slice::SliceSequence;
use crate::table::{EmbeddingTable, SubclusterSource};

/// The derived artifacts linked to the selection context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactId {
    PrimaryScatter,
    SubclusterScatter,
    Patch3D,
    Slice2D,
}

impl ArtifactId {
    pub const ALL: [ArtifactId; 4] = [
        ArtifactId::PrimaryScatter,
        ArtifactId::SubclusterScatter,
        ArtifactId::Patch3D,
        ArtifactId::Slice2D,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::PrimaryScatter => "primary scatter",
            Self::SubclusterScatter => "subcluster scatter",
            Self::Patch3D => "3-D patch",
            Self::Slice2D => "2-D slice",
        }
    }
}

/// A cached derived value plus the revision it was built at.
///
/// `value == None` means invalidated; the next demand recomputes and bumps
/// the revision. Re-deriving without an intervening invalidation returns
/// the cached value untouched, so unchanged contexts yield bit-identical
/// artifacts and stable revisions.
#[derive(Debug)]
struct Cached<T> {
    value: Option<T>,
    revision: u64,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            value: None,
            revision: 0,
        }
    }
}

impl<T> Cached<T> {
    fn invalidate(&mut self) {
        self.value = None;
    }
}

/// The view-linking controller: a small dependency graph over the four
/// derived artifacts.
///
/// Each user event mutates the session and invalidates exactly the
/// artifacts transitively downstream of the context field it changes;
/// recomputation is demand-driven and synchronous. Failures are
/// per-artifact: an unavailable patch leaves both scatters intact.
pub struct ViewController<S: DataSource> {
    session: Session<S>,
    canonical: [usize; 3],
    primary: Cached<ScatterData>,
    subcluster: Cached<ScatterData>,
    patch: Cached<PatchSet>,
    slice: Cached<SliceSequence>,
}

impl<S: DataSource> ViewController<S> {
    pub fn new(source: S) -> Self {
        Self {
            session: Session::new(source),
            canonical: CANONICAL_SHAPE,
            primary: Cached::default(),
            subcluster: Cached::default(),
            patch: Cached::default(),
            slice: Cached::default(),
        }
    }

    /// Use a non-default canonical patch shape.
    pub fn with_canonical_shape(mut self, canonical: [usize; 3]) -> Self {
        self.canonical = canonical;
        self
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn context(&self) -> &SelectionContext {
        self.session.context()
    }

    /// Revision counter of one artifact; bumped only when an invalidated
    /// artifact is actually recomputed. Render sinks key texture uploads
    /// off this.
    pub fn revision(&self, id: ArtifactId) -> u64 {
        match id {
            ArtifactId::PrimaryScatter => self.primary.revision,
            ArtifactId::SubclusterScatter => self.subcluster.revision,
            ArtifactId::Patch3D => self.patch.revision,
            ArtifactId::Slice2D => self.slice.revision,
        }
    }

    fn invalidate(&mut self, ids: &[ArtifactId]) {
        for id in ids {
            debug!(artifact = id.label(), "Invalidating");
            match id {
                ArtifactId::PrimaryScatter => self.primary.invalidate(),
                ArtifactId::SubclusterScatter => self.subcluster.invalidate(),
                ArtifactId::Patch3D => self.patch.invalidate(),
                ArtifactId::Slice2D => self.slice.invalidate(),
            }
        }
    }

    // -- Events ----------------------------------------------------------

    /// A file was picked: reload everything and reset the selection.
    pub fn file_selected(&mut self, stem: &str) -> crate::Result<()> {
        self.session.select_file(stem)?;
        self.invalidate(&ArtifactId::ALL);
        Ok(())
    }

    /// A point on the primary scatter was clicked: select its cluster and
    /// its instance in one step.
    pub fn point_clicked(&mut self, label: &str) -> crate::Result<SubclusterSource> {
        let id = self.session.resolve_back_reference(label)?;
        let class = self
            .session
            .data()
            .and_then(|d| d.table.find(label))
            .map(|row| row.class.clone())
            .ok_or_else(|| ViewError::stale(label, "not present in the active table"))?;

        let source = self.session.select_cluster(&class)?;
        self.session.select_instance(id)?;
        self.invalidate(&[
            ArtifactId::SubclusterScatter,
            ArtifactId::Patch3D,
            ArtifactId::Slice2D,
        ]);
        Ok(source)
    }

    /// A point on the subcluster scatter was clicked: select its instance
    /// (and record its subcluster id); the scatters stay as they are.
    pub fn subcluster_point_clicked(&mut self, label: &str) -> crate::Result<()> {
        let id = self.session.resolve_back_reference(label)?;
        if let Some(row) = self
            .session
            .subcluster()
            .and_then(|s| s.table.find(label))
        {
            let class = row.class.clone();
            self.session.select_subcluster(&class);
        }
        self.session.select_instance(id)?;
        self.invalidate(&[ArtifactId::Patch3D, ArtifactId::Slice2D]);
        Ok(())
    }

    /// A numeric instance id was entered directly.
    pub fn instance_entered(&mut self, id: u32) -> crate::Result<()> {
        if self.context().instance == Some(id) {
            return Ok(());
        }
        self.session.select_instance(id)?;
        self.invalidate(&[ArtifactId::Patch3D, ArtifactId::Slice2D]);
        Ok(())
    }

    pub fn axis_changed(&mut self, axis: Axis) {
        if self.context().slice_axis == axis {
            return;
        }
        self.session.set_slice_axis(axis);
        self.invalidate(&[ArtifactId::Slice2D]);
    }

    pub fn view_mode_changed(&mut self, mode: ViewMode) {
        if self.context().view_mode == mode {
            return;
        }
        self.session.set_view_mode(mode);
        self.invalidate(&[ArtifactId::Slice2D]);
    }

    // -- Derived artifacts -----------------------------------------------

    /// The primary embedding scatter for the active file. Empty (not an
    /// error) when no file is selected or no rows match the file.
    pub fn primary_scatter(&mut self) -> crate::Result<&ScatterData> {
        let value = match self.primary.value.take() {
            Some(v) => v,
            None => {
                self.primary.revision = self.primary.revision.wrapping_add(1);
                derive_primary(self.session.data())
            }
        };
        Ok(self.primary.value.insert(value))
    }

    /// The drill-down scatter for the active cluster; empty until a
    /// cluster is selected.
    pub fn subcluster_scatter(&mut self) -> crate::Result<&ScatterData> {
        let value = match self.subcluster.value.take() {
            Some(v) => v,
            None => {
                self.subcluster.revision = self.subcluster.revision.wrapping_add(1);
                let table = self
                    .session
                    .subcluster()
                    .map(|s| match self.session.data() {
                        Some(d) => s.table.filter_stem(&d.stem),
                        None => s.table.clone(),
                    })
                    .unwrap_or_default();
                scatter_from_table(&table)
            }
        };
        Ok(self.subcluster.value.insert(value))
    }

    /// The canonical patch set of the selected instance; `None` until an
    /// instance is selected.
    pub fn patch3d(&mut self) -> crate::Result<Option<&PatchSet>> {
        if self.patch.value.is_none() {
            let Some(id) = self.context().instance else {
                return Ok(None);
            };
            let Some(data) = self.session.data() else {
                return Ok(None);
            };
            let set = extract(&data.volume, &data.labels, id, self.canonical)?;
            self.patch.revision = self.patch.revision.wrapping_add(1);
            self.patch.value = Some(set);
        }
        Ok(self.patch.value.as_ref())
    }

    /// The slice sequence through the selected instance's patch along the
    /// current axis and view mode; `None` until an instance is selected.
    pub fn slice2d(&mut self) -> crate::Result<Option<&SliceSequence>> {
        if self.slice.value.is_none() {
            let axis = self.context().slice_axis;
            let mode = self.context().view_mode;
            let Some(set) = self.patch3d()? else {
                return Ok(None);
            };
            let sequence = SliceSequence::new(set, axis, mode);
            self.slice.revision = self.slice.revision.wrapping_add(1);
            self.slice.value = Some(sequence);
        }
        Ok(self.slice.value.as_ref())
    }
}

fn derive_primary(data: Option<&LoadedData>) -> ScatterData {
    let table = match data {
        Some(d) => d.table.filter_stem(&d.stem),
        None => EmbeddingTable::empty(),
    };
    scatter_from_table(&table)
}
