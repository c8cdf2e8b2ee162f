use std::path::Path;

use ort::{
    session::{Session, builder::SessionBuilder},
    value::TensorRef,
};
use snafu::{OptionExt, ResultExt};
use tracing::{info, warn};

use crate::{
    analysis::letterbox::TargetSize,
    error::*,
    inference::model::InferenceAdapter,
    pipeline::{Blob, RawOutput},
};

/// ONNX Runtime backed [`InferenceAdapter`].
///
/// Feeds the blob to the first model input and reads the first model output.
pub struct OnnxAdapter {
    session: Session,
    input_name: String,
    output_name: String,
    input_shape: [usize; 4],
}

impl OnnxAdapter {
    pub fn new<P: AsRef<Path>>(
        session: SessionBuilder,
        model_path: P,
        target: TargetSize,
    ) -> Result<Self, DetectError> {
        let model_path = model_path.as_ref();
        let model = model_path.display().to_string();
        info!("Loading model from {}", model);

        let session = session
            .commit_from_file(model_path)
            .context(OrtInitSnafu { stage: "commit" })?;

        let input = session.inputs.first().context(ModelMismatchSnafu {
            model: model.as_str(),
            message: "model declares no inputs",
        })?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .context(ModelMismatchSnafu {
                model: model.as_str(),
                message: "model declares no outputs",
            })?;

        let dims = input.input_type.tensor_shape().context(ModelMismatchSnafu {
            model: model.as_str(),
            message: format!("input `{}` is not a tensor", input.name),
        })?;
        let input_shape = resolve_input_shape(&model, dims, target)?;
        if input_shape != target.blob_shape() {
            warn!(
                "Model input {:?} differs from configured size {}x{}",
                input_shape, target.width, target.height
            );
        }
        let input_name = input.name.clone();

        info!(
            "Model loaded successfully. Inputs: {}, Outputs: {} (`{}` {:?} -> `{}`)",
            session.inputs.len(),
            session.outputs.len(),
            input_name,
            input_shape,
            output_name
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            input_shape,
        })
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

/// Resolves the declared `[N, C, H, W]` input dims of a model.
///
/// Dynamic dimensions (reported as `-1` or `0`) take the value the configured
/// target would produce; fixed ones are kept as the model declares them.
fn resolve_input_shape(
    model: &str,
    dims: &[i64],
    target: TargetSize,
) -> Result<[usize; 4], DetectError> {
    let fallback = target.blob_shape();
    if dims.len() != fallback.len() {
        return ModelMismatchSnafu {
            model,
            message: format!("expected a 4d input, got {:?}", dims),
        }
        .fail();
    }

    let mut shape = fallback;
    for (resolved, &dim) in shape.iter_mut().zip(dims) {
        if dim > 0 {
            *resolved = dim as usize;
        }
    }
    Ok(shape)
}

impl InferenceAdapter for OnnxAdapter {
    fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    fn run(&mut self, blob: Blob) -> Result<RawOutput, DetectError> {
        let input = TensorRef::from_array_view(&blob).context(TensorSnafu { stage: "input" })?;
        let output = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .context(InferenceSnafu {})?;

        let tensor = output
            .get(self.output_name.as_str())
            .context(NotFoundOutputSnafu {
                output_name: self.output_name.as_str(),
            })?
            .try_extract_array::<f32>()
            .context(TensorSnafu { stage: "extract" })?;

        Ok(tensor.to_owned())
    }
}
