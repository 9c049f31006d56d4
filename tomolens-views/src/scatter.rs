use crate::table::EmbeddingTable;

/// One plotted embedding point.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub class: String,
    pub label: String,
}

/// Plain scatter-plot data for the render sink.
///
/// Points are sorted by class (stably, preserving row order within a class)
/// so legends and per-class colors come out in a deterministic order and
/// re-derivations compare bit-identical.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScatterData {
    pub points: Vec<ScatterPoint>,
    /// Sorted unique class values, for legend/color assignment.
    pub classes: Vec<String>,
}

impl ScatterData {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of a class in the legend order.
    pub fn class_slot(&self, class: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == class)
    }

    /// Index of the point carrying `label`, for selection markers.
    pub fn find_label(&self, label: &str) -> Option<usize> {
        self.points.iter().position(|p| p.label == label)
    }

    /// Data-space bounds as `(min_x, max_x, min_y, max_y)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.points.first()?;
        let mut b = (first.x, first.x, first.y, first.y);
        for p in &self.points {
            b.0 = b.0.min(p.x);
            b.1 = b.1.max(p.x);
            b.2 = b.2.min(p.y);
            b.3 = b.3.max(p.y);
        }
        Some(b)
    }
}

/// Build scatter data from a table.
pub fn scatter_from_table(table: &EmbeddingTable) -> ScatterData {
    let mut points: Vec<ScatterPoint> = table
        .rows()
        .iter()
        .map(|r| ScatterPoint {
            x: r.x,
            y: r.y,
            class: r.class.clone(),
            label: r.label.clone(),
        })
        .collect();
    points.sort_by(|a, b| a.class.cmp(&b.class));

    let mut classes: Vec<String> = points.iter().map(|p| p.class.clone()).collect();
    classes.dedup();

    ScatterData { points, classes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn table() -> EmbeddingTable {
        EmbeddingTable::read_from(
            "x,y,class,label\n3.0,1.0,b,t_3\n1.0,2.0,a,t_1\n2.0,0.0,b,t_2\n".as_bytes(),
            Path::new("t.csv"),
        )
        .unwrap()
    }

    #[test]
    fn points_sort_by_class_stably() {
        let s = scatter_from_table(&table());
        let labels: Vec<_> = s.points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["t_1", "t_3", "t_2"]);
        assert_eq!(s.classes, ["a", "b"]);
    }

    #[test]
    fn find_label_resolves_after_sorting() {
        let s = scatter_from_table(&table());
        assert_eq!(s.find_label("t_2"), Some(2));
        assert_eq!(s.find_label("absent"), None);
    }

    #[test]
    fn class_slots_follow_legend_order() {
        let s = scatter_from_table(&table());
        assert_eq!(s.class_slot("a"), Some(0));
        assert_eq!(s.class_slot("b"), Some(1));
        assert_eq!(s.class_slot("c"), None);
    }

    #[test]
    fn empty_table_yields_empty_scatter() {
        let s = scatter_from_table(&EmbeddingTable::empty());
        assert!(s.is_empty());
        assert!(s.bounds().is_none());
    }

    #[test]
    fn bounds_span_all_points() {
        let s = scatter_from_table(&table());
        assert_eq!(s.bounds(), Some((1.0, 3.0, 0.0, 2.0)));
    }
}
