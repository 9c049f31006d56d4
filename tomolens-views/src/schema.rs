//! Column-name dialect resolution for exported prediction tables.
//!
//! The upstream pipelines have produced several header dialects over time
//! (`semantic_class` vs `semantic_class2`, `label` vs `labels`, RELION
//! columns with and without a leading underscore). Known variants are probed
//! in a fixed priority order; nothing beyond that order is guessed.

/// Class/cluster column variants, highest priority first.
pub const CLASS_COLUMNS: [&str; 4] = ["semantic_class2", "semantic_class", "class", "log_area"];

/// Back-reference label column variants, highest priority first.
pub const LABEL_COLUMNS: [&str; 2] = ["label", "labels"];

/// RELION column prefixes, highest priority first: bare names, then the
/// underscore-prefixed dialect.
pub const RELION_PREFIXES: [&str; 2] = ["", "_"];

/// Index of the first header matching any of `variants`, probed in variant
/// priority order (a lower-priority variant never wins over a higher one,
/// whatever the header order).
pub fn resolve_column(headers: &[String], variants: &[&str]) -> Option<usize> {
    variants
        .iter()
        .find_map(|v| headers.iter().position(|h| h == v))
}

/// Index of an exactly-named header.
pub fn require_column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Resolve the RELION prefix dialect for a table by probing for
/// `{prefix}rlnCoordinateZ`. The winning prefix applies to every RELION
/// column in the table.
pub fn resolve_relion_prefix(headers: &[String]) -> Option<&'static str> {
    RELION_PREFIXES
        .iter()
        .copied()
        .find(|p| headers.iter().any(|h| h == &format!("{p}rlnCoordinateZ")))
}
