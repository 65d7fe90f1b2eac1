//! Translation of a [`RuntimeOption`] into ONNX Runtime session settings.

use super::*;
use crate::core::config::{Backend, Device};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::builder::SessionBuilder;

impl OrtInfer {
    pub(super) fn apply_runtime_option(
        builder: SessionBuilder,
        option: &RuntimeOption,
    ) -> Result<SessionBuilder, OCRError> {
        let providers = Self::build_execution_providers(option)?;
        if providers.is_empty() {
            return Ok(builder);
        }
        Ok(builder.with_execution_providers(providers)?)
    }

    /// Resolves the (device, backend) selection into an ordered provider
    /// list. An unset device or backend falls through to plain CPU
    /// execution.
    fn build_execution_providers(
        option: &RuntimeOption,
    ) -> Result<Vec<ExecutionProviderDispatch>, OCRError> {
        let device = match option.device {
            Some(device) => device,
            None => return Ok(Vec::new()),
        };
        let backend = match option.backend {
            Some(backend) => backend,
            None => return Ok(Vec::new()),
        };

        match (device, backend) {
            (Device::Cpu, Backend::Paddle) | (Device::Cpu, Backend::OnnxRuntime) => {
                Ok(vec![cpu_provider()])
            }
            (Device::Cpu, Backend::OpenVino) => {
                Ok(vec![openvino_provider()?, cpu_provider()])
            }
            (Device::Cpu, Backend::Lite) => Ok(vec![xnnpack_provider()?, cpu_provider()]),
            (Device::Cpu, Backend::TensorRt) => Err(OCRError::config_error(
                "backend selection",
                "TensorRT backend requires the GPU device",
            )),
            (Device::Gpu, Backend::Paddle) if option.enable_paddle_trt => Ok(vec![
                tensorrt_provider(option)?,
                cuda_provider()?,
                cpu_provider(),
            ]),
            (Device::Gpu, Backend::Paddle) | (Device::Gpu, Backend::OnnxRuntime) => {
                Ok(vec![cuda_provider()?, cpu_provider()])
            }
            (Device::Gpu, Backend::TensorRt) => {
                Ok(vec![tensorrt_provider(option)?, cpu_provider()])
            }
            (Device::Gpu, Backend::OpenVino) | (Device::Gpu, Backend::Lite) => {
                Err(OCRError::config_error(
                    "backend selection",
                    format!("backend {backend:?} is not available on the GPU device"),
                ))
            }
        }
    }
}

fn cpu_provider() -> ExecutionProviderDispatch {
    ort::execution_providers::CPUExecutionProvider::default().build()
}

#[cfg(feature = "cuda")]
fn cuda_provider() -> Result<ExecutionProviderDispatch, OCRError> {
    Ok(ort::execution_providers::CUDAExecutionProvider::default().build())
}

#[cfg(not(feature = "cuda"))]
fn cuda_provider() -> Result<ExecutionProviderDispatch, OCRError> {
    Err(OCRError::config_error(
        "backend selection",
        "GPU execution requested but the cuda feature is not enabled",
    ))
}

#[cfg(feature = "tensorrt")]
fn tensorrt_provider(option: &RuntimeOption) -> Result<ExecutionProviderDispatch, OCRError> {
    let mut provider = ort::execution_providers::TensorRTExecutionProvider::default();
    if let Some(ref profile) = option.trt_shape_profile {
        provider = provider
            .with_profile_min_shapes(profile.min_spec())
            .with_profile_opt_shapes(profile.opt_spec())
            .with_profile_max_shapes(profile.max_spec());
    }
    Ok(provider.build())
}

#[cfg(not(feature = "tensorrt"))]
fn tensorrt_provider(_option: &RuntimeOption) -> Result<ExecutionProviderDispatch, OCRError> {
    Err(OCRError::config_error(
        "backend selection",
        "TensorRT execution requested but the tensorrt feature is not enabled",
    ))
}

#[cfg(feature = "openvino")]
fn openvino_provider() -> Result<ExecutionProviderDispatch, OCRError> {
    Ok(ort::execution_providers::OpenVINOExecutionProvider::default().build())
}

#[cfg(not(feature = "openvino"))]
fn openvino_provider() -> Result<ExecutionProviderDispatch, OCRError> {
    Err(OCRError::config_error(
        "backend selection",
        "OpenVINO execution requested but the openvino feature is not enabled",
    ))
}

#[cfg(feature = "xnnpack")]
fn xnnpack_provider() -> Result<ExecutionProviderDispatch, OCRError> {
    Ok(ort::execution_providers::XNNPACKExecutionProvider::default().build())
}

#[cfg(not(feature = "xnnpack"))]
fn xnnpack_provider() -> Result<ExecutionProviderDispatch, OCRError> {
    Err(OCRError::config_error(
        "backend selection",
        "lite execution requested but the xnnpack feature is not enabled",
    ))
}
