use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::anyhow;
use log::info;
use ndarray::{Array2, Array4, Ix2};
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use super::error::ClassifierError;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// A loaded neural-network graph with a single input and a single output tensor.
///
/// Implementations are invoked synchronously, once per prediction, and must be
/// safe to call from several threads at once. The classifier wraps any error
/// returned from [`run`](InferenceEngine::run) into
/// [`ClassifierError::Inference`].
pub trait InferenceEngine: Send + Sync + fmt::Debug {
    /// Name of the graph's input tensor
    fn input_name(&self) -> &str;

    /// Name of the graph's output tensor
    fn output_name(&self) -> &str;

    /// Declared input shape; dynamic dimensions are reported as `-1`
    fn input_shape(&self) -> Vec<i64>;

    /// Declared output shape; dynamic dimensions are reported as `-1`
    fn output_shape(&self) -> Vec<i64>;

    /// Runs the graph on a `(1, 3, H, W)` tensor and returns `(1, num_classes)` logits.
    fn run(&self, input: Array4<f32>) -> anyhow::Result<Array2<f32>>;

    /// Number of classes declared by the output shape, if it is static.
    fn num_classes(&self) -> Option<usize> {
        self.output_shape()
            .last()
            .and_then(|&dim| usize::try_from(dim).ok())
    }
}

/// ONNX Runtime backed engine.
///
/// Input and output names are read from the session metadata rather than
/// hardcoded, so any single-input classification graph works.
pub struct OrtEngine {
    session: Session,
    input_name: String,
    output_name: String,
    input_shape: Vec<i64>,
    output_shape: Vec<i64>,
}

impl fmt::Debug for OrtEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrtEngine")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_shape", &self.input_shape)
            .field("output_shape", &self.output_shape)
            .finish()
    }
}

impl OrtEngine {
    /// Loads an ONNX graph from disk.
    ///
    /// # Errors
    /// - `Load` if the file is missing, is not a valid graph, or has no
    ///   input or output tensors
    pub fn from_file<P: AsRef<Path>>(
        model_path: P,
        config: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(ClassifierError::Load(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = create_session_builder(config)?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::Load(format!("Failed to initialize model: {}", e)))?;

        let engine = Self::from_session(session)?;
        info!(
            "Model loaded from {:?} (input '{}' {:?}, output '{}' {:?})",
            model_path, engine.input_name, engine.input_shape, engine.output_name, engine.output_shape
        );
        Ok(engine)
    }

    /// Wraps an already committed session.
    pub fn from_session(session: Session) -> Result<Self, ClassifierError> {
        Self::validate_model(&session)?;

        let input = &session.inputs[0];
        let output = &session.outputs[0];
        let input_name = input.name.clone();
        let output_name = output.name.clone();
        let input_shape = tensor_dimensions(&input.input_type);
        let output_shape = tensor_dimensions(&output.output_type);

        Ok(Self {
            session,
            input_name,
            output_name,
            input_shape,
            output_shape,
        })
    }

    /// Validates that the model has at least one input and one output tensor
    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        if session.inputs.is_empty() {
            return Err(ClassifierError::Load("Model has no input tensors".into()));
        }
        if session.outputs.is_empty() {
            return Err(ClassifierError::Load("Model has no output tensors".into()));
        }
        Ok(())
    }
}

fn tensor_dimensions(value_type: &ValueType) -> Vec<i64> {
    match value_type {
        ValueType::Tensor { dimensions, .. } => dimensions.clone(),
        _ => Vec::new(),
    }
}

impl InferenceEngine for OrtEngine {
    fn input_name(&self) -> &str {
        &self.input_name
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }

    fn input_shape(&self) -> Vec<i64> {
        self.input_shape.clone()
    }

    fn output_shape(&self) -> Vec<i64> {
        self.output_shape.clone()
    }

    fn run(&self, input: Array4<f32>) -> anyhow::Result<Array2<f32>> {
        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(input)
                .map_err(|e| anyhow!("Failed to create input tensor: {}", e))?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| anyhow!("Failed to run model: {}", e))?;
        let output_tensor = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| anyhow!("Failed to extract output tensor: {}", e))?;

        output_tensor
            .to_owned()
            .into_dimensionality::<Ix2>()
            .map_err(|_| anyhow!("Expected 2-D output, got shape {:?}", output_tensor.shape()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Shapes(Vec<i64>);

    impl InferenceEngine for Shapes {
        fn input_name(&self) -> &str {
            "data"
        }
        fn output_name(&self) -> &str {
            "scores"
        }
        fn input_shape(&self) -> Vec<i64> {
            vec![1, 3, 224, 224]
        }
        fn output_shape(&self) -> Vec<i64> {
            self.0.clone()
        }
        fn run(&self, _input: Array4<f32>) -> anyhow::Result<Array2<f32>> {
            Ok(Array2::zeros((1, 1)))
        }
    }

    #[test]
    fn test_num_classes_from_static_shape() {
        assert_eq!(Shapes(vec![1, 1000]).num_classes(), Some(1000));
    }

    #[test]
    fn test_num_classes_unknown_for_dynamic_shape() {
        assert_eq!(Shapes(vec![1, -1]).num_classes(), None);
        assert_eq!(Shapes(vec![]).num_classes(), None);
    }

    #[test]
    fn test_missing_model_is_load_error() {
        let result = OrtEngine::from_file("/nonexistent/model.onnx", &RuntimeConfig::default());
        assert!(matches!(result, Err(ClassifierError::Load(_))));
    }
}
