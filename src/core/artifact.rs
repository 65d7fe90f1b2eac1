//! On-disk layout of a stage model directory.

use crate::core::constants::{MODEL_GRAPH_FILE, MODEL_WEIGHTS_FILE};
use crate::core::errors::OCRError;
use std::path::{Path, PathBuf};

/// The pair of files a stage model is loaded from.
///
/// Each stage directory holds a serialized graph and its weights under
/// fixed names; the recognizer additionally consumes a label map passed
/// separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageArtifact {
    /// Path to the serialized inference graph.
    pub graph: PathBuf,
    /// Path to the serialized weights.
    pub weights: PathBuf,
}

impl StageArtifact {
    /// Derives the artifact paths from a stage model directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            graph: dir.join(MODEL_GRAPH_FILE),
            weights: dir.join(MODEL_WEIGHTS_FILE),
        }
    }

    /// Checks that both artifact files exist on disk.
    pub fn verify(&self) -> Result<(), OCRError> {
        for path in [&self.graph, &self.weights] {
            if !path.is_file() {
                return Err(OCRError::model_load_error(
                    path,
                    "artifact file not found",
                    None,
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_fixed_file_names() {
        let artifact = StageArtifact::from_dir("/models/det");
        assert_eq!(
            artifact.graph,
            Path::new("/models/det").join("inference.pdmodel")
        );
        assert_eq!(
            artifact.weights,
            Path::new("/models/det").join("inference.pdiparams")
        );
    }

    #[test]
    fn test_verify_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = StageArtifact::from_dir(dir.path());
        assert!(artifact.verify().is_err());

        std::fs::write(&artifact.graph, b"graph").unwrap();
        assert!(artifact.verify().is_err(), "weights still missing");

        std::fs::write(&artifact.weights, b"weights").unwrap();
        assert!(artifact.verify().is_ok());
    }
}
