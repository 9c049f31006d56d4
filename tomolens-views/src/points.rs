//! Particle coordinate tables exported from picking pipelines.
//!
//! Coordinates arrive in star-style tables whose RELION column names come in
//! two dialects (bare and underscore-prefixed); the prefix is resolved once
//! per table and applied to every column.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::ViewError;
use crate::schema::{require_column, resolve_relion_prefix};

/// One picked particle: (Z, Y, X) coordinate, optional class number, and
/// the micrograph/tomogram it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateRow {
    pub position: [f64; 3],
    pub class: Option<i64>,
    pub micrograph: String,
}

/// A layer of same-class particle positions for the render sink.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLayer {
    pub class: Option<i64>,
    pub positions: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateTable {
    rows: Vec<CoordinateRow>,
}

impl CoordinateTable {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| ViewError::data_load(path, e.to_string()))?;
        let table = Self::read_csv(reader, path)?;
        debug!(path = %path.display(), rows = table.rows.len(), "Loaded coordinate table");
        Ok(table)
    }

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

        let prefix = resolve_relion_prefix(&headers).ok_or_else(|| {
            ViewError::data_load(origin, "no rlnCoordinateZ column in either dialect")
        })?;
        let coord = |axis: &str| {
            require_column(&headers, &format!("{prefix}rlnCoordinate{axis}")).ok_or_else(|| {
                ViewError::data_load(origin, format!("missing {prefix}rlnCoordinate{axis} column"))
            })
        };
        let col_z = coord("Z")?;
        let col_y = coord("Y")?;
        let col_x = coord("X")?;
        let col_micrograph = require_column(&headers, &format!("{prefix}rlnMicrographName"));
        let col_class = require_column(&headers, &format!("{prefix}rlnClassNumber"));

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ViewError::data_load(origin, e.to_string()))?;
            let field = |col: usize| record.get(col).unwrap_or("").trim();
            let parse = |col: usize| {
                field(col).parse::<f64>().map_err(|_| {
                    ViewError::data_load(
                        origin,
                        format!("row {}: bad coordinate {:?}", line + 1, field(col)),
                    )
                })
            };
            rows.push(CoordinateRow {
                position: [parse(col_z)?, parse(col_y)?, parse(col_x)?],
                class: col_class.and_then(|c| field(c).parse::<i64>().ok()),
                micrograph: col_micrograph.map(|c| field(c).to_string()).unwrap_or_default(),
            });
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[CoordinateRow] {
        &self.rows
    }

    /// Rows whose micrograph name stem (extension stripped) equals `stem`.
    pub fn filter_micrograph(&self, stem: &str) -> Self {
        let matches = |name: &str| {
            let name_stem = name.split_once('.').map(|(s, _)| s).unwrap_or(name);
            name_stem == stem
        };
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| matches(&r.micrograph))
                .cloned()
                .collect(),
        }
    }

    /// Group positions by class number into render-sink layers, classless
    /// rows first, then ascending class.
    pub fn layers(&self) -> Vec<PointLayer> {
        let mut grouped: BTreeMap<Option<i64>, Vec<[f64; 3]>> = BTreeMap::new();
        for row in &self.rows {
            grouped.entry(row.class).or_default().push(row.position);
        }
        grouped
            .into_iter()
            .map(|(class, positions)| PointLayer { class, positions })
            .collect()
    }
}
