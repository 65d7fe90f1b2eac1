//! Typed inference entry points over the session.

use super::*;
use crate::core::{Tensor2D, Tensor3D, Tensor4D};
use ndarray::{ArrayView2, ArrayView3, ArrayView4};
use ort::value::TensorRef;

impl OrtInfer {
    fn run_inference_with_processor<T>(
        &self,
        x: &Tensor4D,
        processor: impl FnOnce(&[i64], &[f32]) -> Result<T, OCRError>,
    ) -> Result<T, OCRError> {
        let input_shape = x.shape().to_vec();

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            OCRError::inference_error(
                self.model_name.as_str(),
                format!("failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let mut session = self.session.lock().map_err(|_| OCRError::Processing {
            kind: crate::core::errors::ProcessingStage::PipelineExecution,
            context: format!("session lock poisoned for model '{}'", self.model_name),
        })?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| OCRError::InvalidInput {
                message: format!("model '{}' declares no outputs", self.model_name),
            })?;

        let outputs = session.run(inputs).map_err(|e| {
            OCRError::inference_error(
                self.model_name.as_str(),
                format!("forward pass failed for input shape {input_shape:?}"),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                OCRError::inference_error(
                    self.model_name.as_str(),
                    format!("failed to extract output tensor '{output_name}' as f32"),
                    e,
                )
            })?;

        processor(output_shape, output_data)
    }

    /// Runs inference expecting a 4D output (detection heatmaps).
    pub fn infer_4d(&self, x: &Tensor4D) -> Result<Tensor4D, OCRError> {
        let model_name = self.model_name.clone();
        self.run_inference_with_processor(x, |output_shape, output_data| {
            if output_shape.len() != 4 {
                return Err(OCRError::InvalidInput {
                    message: format!(
                        "model '{}': expected 4D output, got {}D with shape {:?}",
                        model_name,
                        output_shape.len(),
                        output_shape
                    ),
                });
            }
            let dims = (
                output_shape[0] as usize,
                output_shape[1] as usize,
                output_shape[2] as usize,
                output_shape[3] as usize,
            );
            let view = ArrayView4::from_shape(dims, output_data).map_err(OCRError::Tensor)?;
            Ok(view.to_owned())
        })
    }

    /// Runs inference expecting a 2D output (classification logits).
    pub fn infer_2d(&self, x: &Tensor4D) -> Result<Tensor2D, OCRError> {
        let model_name = self.model_name.clone();
        self.run_inference_with_processor(x, |output_shape, output_data| {
            if output_shape.len() != 2 {
                return Err(OCRError::InvalidInput {
                    message: format!(
                        "model '{}': expected 2D output, got {}D with shape {:?}",
                        model_name,
                        output_shape.len(),
                        output_shape
                    ),
                });
            }
            let dims = (output_shape[0] as usize, output_shape[1] as usize);
            let view = ArrayView2::from_shape(dims, output_data).map_err(OCRError::Tensor)?;
            Ok(view.to_owned())
        })
    }

    /// Runs inference expecting a 3D output (sequence logits).
    pub fn infer_3d(&self, x: &Tensor4D) -> Result<Tensor3D, OCRError> {
        let model_name = self.model_name.clone();
        self.run_inference_with_processor(x, |output_shape, output_data| {
            if output_shape.len() != 3 {
                return Err(OCRError::InvalidInput {
                    message: format!(
                        "model '{}': expected 3D output, got {}D with shape {:?}",
                        model_name,
                        output_shape.len(),
                        output_shape
                    ),
                });
            }
            let dims = (
                output_shape[0] as usize,
                output_shape[1] as usize,
                output_shape[2] as usize,
            );
            let view = ArrayView3::from_shape(dims, output_data).map_err(OCRError::Tensor)?;
            Ok(view.to_owned())
        })
    }
}
