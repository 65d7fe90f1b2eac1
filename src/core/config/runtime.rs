//! Runtime option describing how the stage models execute.
//!
//! [`RuntimeOption`] is the configuration record consumed when an ONNX
//! Runtime session is created for a stage model. It selects the target
//! device and backend, and optionally carries a TensorRT dynamic shape
//! profile for the stage's input tensor. Each stage receives its own copy
//! of the option so shape profiles stay independent between stages.

use serde::{Deserialize, Serialize};

/// Target device for model execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    /// Execute on the CPU.
    Cpu,
    /// Execute on an NVIDIA GPU.
    Gpu,
}

/// Tensor-execution backend for a selected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Native inference backend (the default engine for the device).
    Paddle,
    /// Cross-platform OpenVINO backend (CPU only).
    OpenVino,
    /// Plain ONNX Runtime backend.
    OnnxRuntime,
    /// Mobile-oriented lite backend (XNNPACK).
    Lite,
    /// Pure TensorRT backend (GPU only).
    TensorRt,
}

/// A (min, optimal, max) dynamic shape profile over (N, C, H, W) for a
/// named input tensor.
///
/// Tensor-compilation backends use the profile to pre-plan kernels for
/// the range of input shapes a stage will see at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrtShapeProfile {
    /// Name of the input tensor the profile applies to.
    pub tensor_name: String,
    /// Minimum input shape.
    pub min: [i64; 4],
    /// Optimal input shape.
    pub opt: [i64; 4],
    /// Maximum input shape.
    pub max: [i64; 4],
}

impl TrtShapeProfile {
    /// Creates a new shape profile for the given tensor.
    pub fn new(tensor_name: impl Into<String>, min: [i64; 4], opt: [i64; 4], max: [i64; 4]) -> Self {
        Self {
            tensor_name: tensor_name.into(),
            min,
            opt,
            max,
        }
    }

    /// Formats one bound in the `name:NxCxHxW` form expected by the
    /// TensorRT execution provider.
    fn format_bound(&self, shape: &[i64; 4]) -> String {
        format!(
            "{}:{}x{}x{}x{}",
            self.tensor_name, shape[0], shape[1], shape[2], shape[3]
        )
    }

    /// The minimum bound as a TensorRT profile string.
    pub fn min_spec(&self) -> String {
        self.format_bound(&self.min)
    }

    /// The optimal bound as a TensorRT profile string.
    pub fn opt_spec(&self) -> String {
        self.format_bound(&self.opt)
    }

    /// The maximum bound as a TensorRT profile string.
    pub fn max_spec(&self) -> String {
        self.format_bound(&self.max)
    }
}

/// Configuration record consumed by the inference session builder.
///
/// Defaults to no explicit device or backend, which resolves to plain CPU
/// execution. The option is cheap to clone; the pipeline builder clones it
/// once per stage before attaching stage-specific shape profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeOption {
    /// Target device, if explicitly selected.
    pub device: Option<Device>,
    /// Backend kind, if explicitly selected.
    pub backend: Option<Backend>,
    /// Run the native backend with a TensorRT subgraph engine.
    pub enable_paddle_trt: bool,
    /// Ask the runtime to collect dynamic shapes while running TRT.
    pub collect_trt_shapes: bool,
    /// Dynamic shape profile for the stage input tensor.
    pub trt_shape_profile: Option<TrtShapeProfile>,
}

impl RuntimeOption {
    /// Creates a new option with no explicit device or backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates the CLI run-option flag into a runtime option.
    ///
    /// The mapping is total over `0..=7`; any other value yields the
    /// default option without error.
    pub fn from_flag(flag: i32) -> Self {
        let option = Self::new();
        match flag {
            0 => option.use_cpu().use_paddle_backend(),
            1 => option.use_cpu().use_openvino_backend(),
            2 => option.use_cpu().use_ort_backend(),
            3 => option.use_cpu().use_lite_backend(),
            4 => option.use_gpu().use_paddle_backend(),
            5 => option
                .use_gpu()
                .use_paddle_backend()
                .enable_paddle_trt()
                .collect_trt_shapes(),
            6 => option.use_gpu().use_ort_backend(),
            7 => option.use_gpu().use_trt_backend(),
            _ => option,
        }
    }

    /// Targets the CPU.
    pub fn use_cpu(mut self) -> Self {
        self.device = Some(Device::Cpu);
        self
    }

    /// Targets the GPU.
    pub fn use_gpu(mut self) -> Self {
        self.device = Some(Device::Gpu);
        self
    }

    /// Selects the native inference backend.
    pub fn use_paddle_backend(mut self) -> Self {
        self.backend = Some(Backend::Paddle);
        self
    }

    /// Selects the OpenVINO backend.
    pub fn use_openvino_backend(mut self) -> Self {
        self.backend = Some(Backend::OpenVino);
        self
    }

    /// Selects the plain ONNX Runtime backend.
    pub fn use_ort_backend(mut self) -> Self {
        self.backend = Some(Backend::OnnxRuntime);
        self
    }

    /// Selects the mobile lite backend.
    pub fn use_lite_backend(mut self) -> Self {
        self.backend = Some(Backend::Lite);
        self
    }

    /// Selects the pure TensorRT backend.
    pub fn use_trt_backend(mut self) -> Self {
        self.backend = Some(Backend::TensorRt);
        self
    }

    /// Enables the TensorRT engine inside the native backend.
    pub fn enable_paddle_trt(mut self) -> Self {
        self.enable_paddle_trt = true;
        self
    }

    /// Requests dynamic shape collection while running TRT.
    pub fn collect_trt_shapes(mut self) -> Self {
        self.collect_trt_shapes = true;
        self
    }

    /// Attaches a dynamic shape profile for the named input tensor.
    pub fn set_trt_input_shape(
        mut self,
        tensor_name: impl Into<String>,
        min: [i64; 4],
        opt: [i64; 4],
        max: [i64; 4],
    ) -> Self {
        self.trt_shape_profile = Some(TrtShapeProfile::new(tensor_name, min, opt, max));
        self
    }

    /// Whether any TensorRT path (pure or native-with-TRT) is active.
    pub fn trt_active(&self) -> bool {
        self.enable_paddle_trt || self.backend == Some(Backend::TensorRt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_mapping_matrix() {
        let cases = [
            (0, Some(Device::Cpu), Some(Backend::Paddle), false, false),
            (1, Some(Device::Cpu), Some(Backend::OpenVino), false, false),
            (2, Some(Device::Cpu), Some(Backend::OnnxRuntime), false, false),
            (3, Some(Device::Cpu), Some(Backend::Lite), false, false),
            (4, Some(Device::Gpu), Some(Backend::Paddle), false, false),
            (5, Some(Device::Gpu), Some(Backend::Paddle), true, true),
            (6, Some(Device::Gpu), Some(Backend::OnnxRuntime), false, false),
            (7, Some(Device::Gpu), Some(Backend::TensorRt), false, false),
        ];

        for (flag, device, backend, trt, collect) in cases {
            let option = RuntimeOption::from_flag(flag);
            assert_eq!(option.device, device, "flag {flag}");
            assert_eq!(option.backend, backend, "flag {flag}");
            assert_eq!(option.enable_paddle_trt, trt, "flag {flag}");
            assert_eq!(option.collect_trt_shapes, collect, "flag {flag}");
        }
    }

    #[test]
    fn test_out_of_range_flag_yields_default() {
        for flag in [-1, 8, 42, i32::MAX, i32::MIN] {
            assert_eq!(RuntimeOption::from_flag(flag), RuntimeOption::default());
        }
    }

    #[test]
    fn test_trt_active() {
        assert!(RuntimeOption::from_flag(5).trt_active());
        assert!(RuntimeOption::from_flag(7).trt_active());
        assert!(!RuntimeOption::from_flag(4).trt_active());
        assert!(!RuntimeOption::default().trt_active());
    }

    #[test]
    fn test_shape_profile_specs() {
        let option = RuntimeOption::new().set_trt_input_shape(
            "x",
            [1, 3, 64, 64],
            [1, 3, 640, 640],
            [1, 3, 960, 960],
        );
        let profile = option.trt_shape_profile.expect("profile attached");
        assert_eq!(profile.min_spec(), "x:1x3x64x64");
        assert_eq!(profile.opt_spec(), "x:1x3x640x640");
        assert_eq!(profile.max_spec(), "x:1x3x960x960");
    }

    #[test]
    fn test_cloned_options_are_independent() {
        let base = RuntimeOption::from_flag(7);
        let a = base
            .clone()
            .set_trt_input_shape("x", [1, 3, 64, 64], [1, 3, 640, 640], [1, 3, 960, 960]);
        let b = base
            .clone()
            .set_trt_input_shape("x", [1, 3, 48, 10], [1, 3, 48, 320], [1, 3, 48, 1024]);

        assert_ne!(a.trt_shape_profile, b.trt_shape_profile);
        assert!(base.trt_shape_profile.is_none());
    }
}
