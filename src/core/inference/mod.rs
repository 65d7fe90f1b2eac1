//! ONNX Runtime session management and inference entry points.
//!
//! [`OrtInfer`] owns the session for one stage model. Sessions are created
//! from the stage's graph artifact with the execution providers resolved
//! from a [`RuntimeOption`], and are guarded by a mutex so a built pipeline
//! can be invoked from multiple request workers concurrently.

use crate::core::config::RuntimeOption;
use crate::core::errors::OCRError;
use ort::logging::LogLevel;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;

#[path = "options.rs"]
mod options;

#[path = "execution.rs"]
mod execution;

/// Inference engine for a single stage model.
pub struct OrtInfer {
    pub(super) session: Mutex<Session>,
    pub(super) input_name: String,
    pub(super) model_path: std::path::PathBuf,
    pub(super) model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("input_name", &self.input_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Creates an inference engine from a graph artifact, applying the
    /// execution providers selected by the runtime option.
    pub fn from_graph(
        model_path: impl AsRef<Path>,
        option: &RuntimeOption,
        input_name: &str,
    ) -> Result<Self, OCRError> {
        let path = model_path.as_ref();
        let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
        let builder = Self::apply_runtime_option(builder, option)?;
        let session = builder.commit_from_file(path).map_err(|e| {
            OCRError::model_load_error(
                path,
                "failed to create inference session",
                Some(Box::new(e)),
            )
        })?;

        let model_name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        Ok(OrtInfer {
            session: Mutex::new(session),
            input_name: input_name.to_string(),
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    /// Returns the model path associated with this engine.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns the model name associated with this engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}
