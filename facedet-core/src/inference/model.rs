use ort::{
    execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch},
    session::{
        Session,
        builder::{GraphOptimizationLevel, SessionBuilder},
    },
};
use snafu::ResultExt;
use tracing::{info, warn};

use crate::{
    config::DeviceType,
    error::{DetectError, OrtInitSnafu},
    pipeline::{Blob, RawOutput},
};

/// Backend that turns a preprocessed blob into the raw detection head output.
///
/// Implementations are synchronous and must not carry state between calls
/// that would change how the output decodes.
pub trait InferenceAdapter {
    /// Input shape the backend accepts, `[1, 3, H, W]`.
    fn input_shape(&self) -> [usize; 4];

    fn run(&mut self, blob: Blob) -> Result<RawOutput, DetectError>;
}

impl<A: InferenceAdapter + ?Sized> InferenceAdapter for Box<A> {
    fn input_shape(&self) -> [usize; 4] {
        (**self).input_shape()
    }

    fn run(&mut self, blob: Blob) -> Result<RawOutput, DetectError> {
        (**self).run(blob)
    }
}

/// Execution providers in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    #[cfg(all(feature = "tensorrt", feature = "cuda"))]
    TensorRt,
    #[cfg(feature = "cuda")]
    Cuda,
    #[cfg(all(feature = "coreml", target_os = "macos"))]
    CoreMl,
    Cpu,
}

impl Provider {
    fn build(self) -> ExecutionProviderDispatch {
        match self {
            #[cfg(all(feature = "tensorrt", feature = "cuda"))]
            Provider::TensorRt => {
                use ort::execution_providers::TensorRTExecutionProvider;
                TensorRTExecutionProvider::default().build()
            }
            #[cfg(feature = "cuda")]
            Provider::Cuda => {
                use ort::execution_providers::CUDAExecutionProvider;
                CUDAExecutionProvider::default().build()
            }
            #[cfg(all(feature = "coreml", target_os = "macos"))]
            Provider::CoreMl => {
                use ort::execution_providers::CoreMLExecutionProvider;
                use ort::execution_providers::coreml::*;
                CoreMLExecutionProvider::default()
                    .with_model_format(CoreMLModelFormat::MLProgram)
                    .build()
            }
            Provider::Cpu => CPUExecutionProvider::default().build(),
        }
    }
}

/// Providers compiled in for `device`, always ending with the CPU fallback.
fn providers_for(device: DeviceType) -> Vec<Provider> {
    let mut providers = Vec::new();

    match device {
        DeviceType::Cpu => {}
        #[cfg(feature = "cuda")]
        DeviceType::Cuda => {
            #[cfg(feature = "tensorrt")]
            providers.push(Provider::TensorRt);
            providers.push(Provider::Cuda);
        }
        #[cfg(all(feature = "coreml", target_os = "macos"))]
        DeviceType::CoreMl => providers.push(Provider::CoreMl),
        #[allow(unreachable_patterns)]
        other => {
            warn!(
                "Device `{}` requested but support was not compiled in, using CPU",
                other
            );
        }
    }

    providers.push(Provider::Cpu);
    providers
}

fn execution_providers(device: DeviceType) -> Vec<ExecutionProviderDispatch> {
    providers_for(device)
        .into_iter()
        .map(Provider::build)
        .collect()
}

/// common session builder
pub fn session_builder(
    device: DeviceType,
    intra_threads: usize,
) -> Result<SessionBuilder, DetectError> {
    info!(
        "Building ONNX Runtime session for {} with {} intra-op threads",
        device, intra_threads
    );

    let session_builder = Session::builder()
        .context(OrtInitSnafu { stage: "builder" })?
        .with_execution_providers(execution_providers(device))
        .context(OrtInitSnafu { stage: "provider" })?
        .with_optimization_level(GraphOptimizationLevel::Level1)
        .context(OrtInitSnafu {
            stage: "optimization",
        })?
        .with_intra_threads(intra_threads)
        .context(OrtInitSnafu {
            stage: "intra-threads",
        })?;

    Ok(session_builder)
}
