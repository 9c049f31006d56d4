use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Suffix of per-tomogram embedding table exports; stripping it from a file
/// name yields the tomogram stem.
pub const EMBEDS_SUFFIX: &str = "_embeds_umap_data.csv";

/// Suffix of instance label volume files, before the container extension.
pub const INSTANCES_SUFFIX: &str = "_instance_preds";

/// Suffix of semantic prediction files used by the filtering overlay.
pub const SEMANTIC_SUFFIX: &str = "_preds";

fn default_file_extension() -> String {
    ".t3d".to_string()
}

/// The visualization config, written by the prediction pipeline.
///
/// All paths are resolved here, at the outermost layer; the library crates
/// only ever see already-resolved paths through the data-source seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisConfig {
    /// Folder containing the (denoised) tomogram volumes.
    pub data_folder: PathBuf,
    /// Folder containing embedding tables and subcluster exports.
    pub prediction_folder: PathBuf,
    /// Folder containing instance label volumes; defaults to the
    /// prediction folder when absent.
    #[serde(default)]
    pub instances_mask_folder: Option<PathBuf>,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    /// Semantic prediction folder for the filtered-segmentation overlay.
    #[serde(default)]
    pub filtering_mask_folder: Option<PathBuf>,
    /// Semantic labels kept by the filtering overlay.
    #[serde(default)]
    pub filtering_mask_labels: Vec<u32>,
}

impl VisConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| format!("failed to parse config {}: {e}", path.display()))?;
        info!(path = %path.display(), "Loaded visualization config");
        Ok(config)
    }

    pub fn instances_folder(&self) -> &Path {
        self.instances_mask_folder
            .as_deref()
            .unwrap_or(&self.prediction_folder)
    }

    /// Tomogram stems available for visualization: every file in the
    /// prediction folder ending in the embedding-table suffix, sorted.
    pub fn discover_stems(&self) -> Result<Vec<String>, String> {
        let entries = fs::read_dir(&self.prediction_folder).map_err(|e| {
            format!(
                "failed to list prediction folder {}: {e}",
                self.prediction_folder.display()
            )
        })?;
        let mut stems: Vec<String> = entries
            .filter_map(|entry| {
                let name = entry.ok()?.file_name().to_string_lossy().into_owned();
                name.strip_suffix(EMBEDS_SUFFIX).map(str::to_string)
            })
            .collect();
        stems.sort();
        Ok(stems)
    }

    // -- Path conventions ------------------------------------------------

    pub fn volume_path(&self, stem: &str) -> PathBuf {
        self.data_folder
            .join(format!("{stem}{}", self.file_extension))
    }

    pub fn labels_path(&self, stem: &str) -> PathBuf {
        self.instances_folder()
            .join(format!("{stem}{INSTANCES_SUFFIX}{}", self.file_extension))
    }

    pub fn table_path(&self, stem: &str) -> PathBuf {
        self.prediction_folder.join(format!("{stem}{EMBEDS_SUFFIX}"))
    }

    pub fn semantic_path(&self, stem: &str) -> Option<PathBuf> {
        self.filtering_mask_folder
            .as_ref()
            .map(|dir| dir.join(format!("{stem}{SEMANTIC_SUFFIX}{}", self.file_extension)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let json = r#"{"data_folder": "/data", "prediction_folder": "/preds"}"#;
        let c: VisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.file_extension, ".t3d");
        assert_eq!(c.instances_folder(), Path::new("/preds"));
        assert!(c.filtering_mask_labels.is_empty());
        assert!(c.semantic_path("TS_1").is_none());
    }

    #[test]
    fn separate_instances_folder_is_honored() {
        let json = r#"{
            "data_folder": "/data",
            "prediction_folder": "/preds",
            "instances_mask_folder": "/instances",
            "file_extension": ".vol"
        }"#;
        let c: VisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.labels_path("TS_1"), Path::new("/instances/TS_1_instance_preds.vol"));
        assert_eq!(c.volume_path("TS_1"), Path::new("/data/TS_1.vol"));
        assert_eq!(
            c.table_path("TS_1"),
            Path::new("/preds/TS_1_embeds_umap_data.csv")
        );
    }

    #[test]
    fn discovery_strips_the_embeds_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "TS_2_embeds_umap_data.csv",
            "TS_10_embeds_umap_data.csv",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let c = VisConfig {
            data_folder: dir.path().into(),
            prediction_folder: dir.path().into(),
            instances_mask_folder: None,
            file_extension: ".t3d".into(),
            filtering_mask_folder: None,
            filtering_mask_labels: vec![],
        };
        assert_eq!(c.discover_stems().unwrap(), vec!["TS_10", "TS_2"]);
    }
}
