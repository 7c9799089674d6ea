use ndarray::Array4;
use std::path::Path;
use tract_onnx::prelude::*;

use super::Model;
use crate::error::ClassifierError;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// An ONNX graph optimized for a fixed input shape.
pub struct OnnxModel {
    plan: Plan,
}

impl OnnxModel {
    pub fn load(
        path: &Path,
        input_shape: [usize; 4],
        num_classes: usize,
    ) -> Result<Self, ClassifierError> {
        if !path.is_file() {
            return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
        }
        let load_err = |stage: &str, e: TractError| ClassifierError::ModelLoad {
            path: path.to_path_buf(),
            reason: format!("{}: {}", stage, e),
        };

        let input_fact = InferenceFact::dt_shape(f32::datum_type(), tvec!(
            input_shape[0],
            input_shape[1],
            input_shape[2],
            input_shape[3]
        ));
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| load_err("parse", e))?
            .with_input_fact(0, input_fact)
            .map_err(|e| load_err("input shape", e))?
            .into_optimized()
            .map_err(|e| load_err("optimize", e))?;

        // Class dimension is the product of the non-batch output dims.
        let output = model.output_fact(0).map_err(|e| load_err("output", e))?;
        if let Some(dims) = output.shape.as_concrete() {
            let actual: usize = dims.iter().skip(1).product();
            if actual != num_classes {
                return Err(ClassifierError::OutputMismatch {
                    expected: num_classes,
                    actual,
                });
            }
        }

        let plan = model.into_runnable().map_err(|e| load_err("runnable", e))?;
        log::debug!(
            "ONNX model {} ready for input {:?}",
            path.display(),
            input_shape
        );
        Ok(Self { plan })
    }
}

impl Model for OnnxModel {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        let shape = input.dim();
        let tensor = tract_ndarray::Array4::from_shape_vec(shape, input.into_raw_vec())
            .map_err(|e| ClassifierError::Tensor(e.to_string()))?
            .into_tensor();

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| ClassifierError::Inference("model produced no outputs".to_string()))?;
        let scores = output
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        Ok(scores.iter().copied().collect())
    }
}
