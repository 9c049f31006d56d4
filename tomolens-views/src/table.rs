use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::ViewError;
use crate::schema::{resolve_column, require_column, CLASS_COLUMNS, LABEL_COLUMNS};

/// One embedding-table row: a 2-D projected coordinate, a categorical
/// class/cluster label, and the back-reference to the instance it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRow {
    pub x: f64,
    pub y: f64,
    pub class: String,
    /// `<file_stem>_<instance_id>`; the stem may itself contain underscores,
    /// so the id is whatever follows the *last* underscore.
    pub label: String,
}

/// Split a back-reference label into its file stem and instance id.
pub fn split_back_reference(label: &str) -> crate::Result<(&str, u32)> {
    let (stem, id) = label
        .rsplit_once('_')
        .ok_or_else(|| ViewError::stale(label, "missing '_<instance_id>' suffix"))?;
    let id = id
        .parse::<u32>()
        .map_err(|_| ViewError::stale(label, format!("instance id {id:?} is not an integer")))?;
    Ok((stem, id))
}

/// A table of embedding rows, one row per instance.
///
/// Loaded from a UMAP export CSV with schema dialect probing (see
/// [`crate::schema`]). Labels are unique within a table; a duplicate is a
/// load error, not a silent overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingTable {
    rows: Vec<EmbeddingRow>,
}

impl EmbeddingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from rows, enforcing the label-uniqueness invariant.
    pub fn from_rows(rows: Vec<EmbeddingRow>, origin: &Path) -> crate::Result<Self> {
        let mut seen = std::collections::HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.label.as_str()) {
                return Err(ViewError::data_load(
                    origin,
                    format!("duplicate label {:?}", row.label),
                ));
            }
        }
        Ok(Self { rows })
    }

    /// Load a table from a CSV file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| ViewError::data_load(path, e.to_string()))?;
        let table = Self::read_csv(reader, path)?;
        debug!(path = %path.display(), rows = table.len(), "Loaded embedding table");
        Ok(table)
    }

    /// Parse a table from any reader; `origin` is used in error messages.
    pub fn read_from<R: Read>(reader: R, origin: &Path) -> crate::Result<Self> {
        let reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        Self::read_csv(reader, origin)
    }

    fn read_csv<R: Read>(mut reader: csv::Reader<R>, origin: &Path) -> crate::Result<Self> {
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ViewError::data_load(origin, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let col_x = require_column(&headers, "x")
            .ok_or_else(|| ViewError::data_load(origin, "missing 'x' column"))?;
        let col_y = require_column(&headers, "y")
            .ok_or_else(|| ViewError::data_load(origin, "missing 'y' column"))?;
        let col_label = resolve_column(&headers, &LABEL_COLUMNS).ok_or_else(|| {
            ViewError::data_load(origin, format!("no label column among {LABEL_COLUMNS:?}"))
        })?;
        let col_class = resolve_column(&headers, &CLASS_COLUMNS).ok_or_else(|| {
            ViewError::data_load(origin, format!("no class column among {CLASS_COLUMNS:?}"))
        })?;

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ViewError::data_load(origin, e.to_string()))?;
            let field = |col: usize| record.get(col).unwrap_or("").trim();
            let parse = |col: usize, name: &str| {
                field(col).parse::<f64>().map_err(|_| {
                    ViewError::data_load(
                        origin,
                        format!("row {}: bad {name} value {:?}", line + 1, field(col)),
                    )
                })
            };
            rows.push(EmbeddingRow {
                x: parse(col_x, "x")?,
                y: parse(col_y, "y")?,
                // Class values are stringified whatever the source dialect.
                class: field(col_class).to_string(),
                label: field(col_label).to_string(),
            });
        }
        Self::from_rows(rows, origin)
    }

    pub fn rows(&self) -> &[EmbeddingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn find(&self, label: &str) -> Option<&EmbeddingRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    /// Rows whose back-reference stem equals `stem` exactly. Rows with an
    /// unparseable label are skipped.
    pub fn filter_stem(&self, stem: &str) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| matches!(split_back_reference(&r.label), Ok((s, _)) if s == stem))
                .cloned()
                .collect(),
        }
    }

    /// Rows of one class/cluster.
    pub fn filter_class(&self, class: &str) -> Self {
        Self {
            rows: self.rows.iter().filter(|r| r.class == class).cloned().collect(),
        }
    }
}

/// Where an active subcluster table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubclusterSource {
    /// Loaded from a precomputed per-cluster file; authoritative.
    Precomputed,
    /// Derived in memory by filtering the primary table on the cluster id.
    Derived,
}

/// File name of the precomputed subcluster table for one cluster.
pub fn subcluster_file_name(cluster_id: &str) -> String {
    format!("subcluster_clusters_selected_{cluster_id}_umap_data.csv")
}

/// Resolve the subcluster table for `cluster_id`.
///
/// A precomputed table, when the source has one, takes precedence over the
/// in-memory filter even when the two would contain different rows.
pub fn resolve_subcluster(
    precomputed: Option<EmbeddingTable>,
    primary: &EmbeddingTable,
    cluster_id: &str,
) -> (EmbeddingTable, SubclusterSource) {
    match precomputed {
        Some(table) => (table, SubclusterSource::Precomputed),
        None => (primary.filter_class(cluster_id), SubclusterSource::Derived),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> crate::Result<EmbeddingTable> {
        EmbeddingTable::read_from(csv.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn loads_rows_with_class_dialect() {
        let t = table("x,y,semantic_class,label\n1.0,2.0,3,tomo_a_17\n-0.5,0.25,4,tomo_a_18\n")
            .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[0].class, "3");
        assert_eq!(t.rows()[1].x, -0.5);
    }

    #[test]
    fn semantic_class2_beats_semantic_class() {
        let t = table("x,y,semantic_class,semantic_class2,label\n0,0,old,new,t_1\n").unwrap();
        assert_eq!(t.rows()[0].class, "new");
    }

    #[test]
    fn plural_labels_column_is_accepted() {
        let t = table("class,x,y,labels\n2,0.0,1.0,run_3_tomo_9\n").unwrap();
        assert_eq!(t.rows()[0].label, "run_3_tomo_9");
    }

    #[test]
    fn duplicate_labels_are_a_load_error() {
        let err = table("x,y,class,label\n0,0,1,t_1\n1,1,2,t_1\n").unwrap_err();
        assert!(matches!(err, ViewError::DataLoad { .. }));
    }

    #[test]
    fn missing_class_column_is_a_load_error() {
        assert!(table("x,y,label\n0,0,t_1\n").is_err());
    }

    #[test]
    fn back_reference_splits_on_last_underscore() {
        let (stem, id) = split_back_reference("TS_01_bin4_123").unwrap();
        assert_eq!(stem, "TS_01_bin4");
        assert_eq!(id, 123);
    }

    #[test]
    fn back_reference_rejects_non_numeric_id() {
        assert!(split_back_reference("tomo_abc").is_err());
        assert!(split_back_reference("plain").is_err());
    }

    #[test]
    fn filter_stem_matches_exactly_not_substring() {
        let t = table(
            "x,y,class,label\n0,0,1,run_1_5\n1,1,1,run_11_5\n2,2,2,run_1_9\n",
        )
        .unwrap();
        let filtered = t.filter_stem("run_1");
        let labels: Vec<_> = filtered.rows().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["run_1_5", "run_1_9"]);
    }

    #[test]
    fn precomputed_subcluster_takes_precedence() {
        let primary = table("x,y,class,label\n0,0,3,t_1\n1,1,3,t_2\n2,2,4,t_3\n").unwrap();
        let pre = table("x,y,class,label\n9,9,0,other_7\n").unwrap();

        let (t, src) = resolve_subcluster(Some(pre.clone()), &primary, "3");
        assert_eq!(src, SubclusterSource::Precomputed);
        assert_eq!(t, pre);

        let (t, src) = resolve_subcluster(None, &primary, "3");
        assert_eq!(src, SubclusterSource::Derived);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn subcluster_file_name_convention() {
        assert_eq!(
            subcluster_file_name("3"),
            "subcluster_clusters_selected_3_umap_data.csv"
        );
    }
}
