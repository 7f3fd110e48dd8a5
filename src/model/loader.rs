use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    error::LoadError,
    model::{FeatureSchema, Predictor, Scorecard},
};

/// Filename marker that identifies a predictor artifact: `<product>_model.<ext>`.
pub const MODEL_MARKER: &str = "_model";

/// Turns one artifact file into a predictor.
pub trait ArtifactLoader {
    /// Extension (without the dot) of the files this loader understands.
    fn extension(&self) -> &str;

    fn load(&self, path: &Path, schema: &FeatureSchema) -> Result<Box<dyn Predictor>, LoadError>;
}

/// Reads [`Scorecard`] artifacts stored as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArtifactLoader;

impl ArtifactLoader for JsonArtifactLoader {
    fn extension(&self) -> &str {
        "json"
    }

    fn load(&self, path: &Path, schema: &FeatureSchema) -> Result<Box<dyn Predictor>, LoadError> {
        let raw = fs::read(path)?;
        let scorecard: Scorecard = serde_json::from_slice(&raw)?;
        scorecard.validate(schema)?;
        Ok(Box::new(scorecard))
    }
}

/// A file in the model directory that looks like an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub product: String,
    pub path: PathBuf,
}

/// Product id for an artifact file name, or `None` when the name does not
/// follow the `<product>_model.<ext>` convention.
pub fn product_id(file_name: &str, extension: &str) -> Option<String> {
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    let product = stem.strip_suffix(MODEL_MARKER)?;
    (!product.is_empty()).then(|| product.to_string())
}

/// Lists artifact files in `dir`. An unreadable directory yields an empty list.
pub fn scan_artifacts(dir: &Path, extension: &str) -> Vec<ArtifactEntry> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "failed to read model directory");
            return Vec::new();
        }
    };

    let mut artifacts: Vec<ArtifactEntry> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to read directory entry");
                None
            }
        })
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_file() {
                return None;
            }
            let name = entry.file_name();
            let name = name.to_str()?;
            match product_id(name, extension) {
                Some(product) => Some(ArtifactEntry { product, path }),
                None => {
                    debug!(file = name, "skipping non-artifact file");
                    None
                }
            }
        })
        .collect();

    artifacts.sort_by(|a, b| a.product.cmp(&b.product));
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_strips_marker_and_extension() {
        assert_eq!(
            product_id("ind_cco_fin_ult1_model.json", "json"),
            Some("ind_cco_fin_ult1".to_string())
        );
        assert_eq!(product_id("ind_cco_fin_ult1_model.pkl", "json"), None);
        assert_eq!(product_id("notes.json", "json"), None);
        assert_eq!(product_id("_model.json", "json"), None);
        assert_eq!(product_id("a_modeljson", "json"), None);
    }

    #[test]
    fn scan_picks_only_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b_model.json"), "{}").unwrap();
        fs::write(dir.path().join("a_model.json"), "{}").unwrap();
        fs::write(dir.path().join("readme.txt"), "hi").unwrap();
        fs::create_dir(dir.path().join("c_model.json")).unwrap();

        let found = scan_artifacts(dir.path(), "json");
        let products: Vec<&str> = found.iter().map(|a| a.product.as_str()).collect();
        assert_eq!(products, vec!["a", "b"]);
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_artifacts(&dir.path().join("nope"), "json").is_empty());
    }

    #[test]
    fn json_loader_validates_against_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x_model.json");
        fs::write(&path, r#"{"kind": "logistic", "numeric": {"shoe_size": 1.0}}"#).unwrap();

        let schema = FeatureSchema::new(["age"]);
        let err = JsonArtifactLoader.load(&path, &schema).err().unwrap();
        assert!(matches!(err, LoadError::Invalid(_)));

        fs::write(&path, "not json").unwrap();
        let err = JsonArtifactLoader.load(&path, &schema).err().unwrap();
        assert!(matches!(err, LoadError::Json(_)));
    }
}
