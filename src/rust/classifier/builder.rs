use std::path::Path;
use std::sync::Arc;
use log::{info, warn};

use super::classifier::Classifier;
use super::engine::{InferenceEngine, OrtEngine};
use super::error::ClassifierError;
use super::labels::load_labels;
use super::{DEFAULT_INPUT_SIZE, DEFAULT_TOP_K};
use crate::{BuiltinModel, ModelManager, runtime::RuntimeConfig};

/// A builder for constructing a Classifier with a fluent interface.
#[derive(Debug)]
pub struct ClassifierBuilder {
    model_path: Option<String>,
    labels_path: Option<String>,
    engine: Option<Arc<dyn InferenceEngine>>,
    labels: Option<Vec<String>>,
    input_size: Option<(u32, u32)>,
    top_k: usize,
    runtime_config: RuntimeConfig,
}

impl Default for ClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use occipital::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            model_path: None,
            labels_path: None,
            engine: None,
            labels: None,
            input_size: None,
            top_k: DEFAULT_TOP_K,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration for ONNX model execution.
    /// Must be called before the model is loaded to take effect.
    ///
    /// # Example
    /// ```
    /// use occipital::{ClassifierBuilder, RuntimeConfig};
    ///
    /// let config = RuntimeConfig::default();
    /// let builder = ClassifierBuilder::new()
    ///     .with_runtime_config(config);
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Loads a built-in model from the default model cache
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - A model is already set
    ///   - The model is not downloaded
    ///   - The model or labels failed to load
    ///
    /// # Example
    /// ```no_run
    /// use occipital::{ClassifierBuilder, BuiltinModel};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_model(BuiltinModel::SqueezeNet);
    /// ```
    pub fn with_model(self, model: BuiltinModel) -> Result<Self, ClassifierError> {
        let manager = ModelManager::new_default()
            .map_err(|e| ClassifierError::Build(format!("Failed to create model manager: {}", e)))?;
        self.with_managed_model(&manager, model)
    }

    /// Loads a built-in model from the given model cache
    pub fn with_managed_model(
        self,
        manager: &ModelManager,
        model: BuiltinModel,
    ) -> Result<Self, ClassifierError> {
        if !manager.is_model_downloaded(model) {
            return Err(ClassifierError::Build(format!(
                "Model '{:?}' is not downloaded. Please download it first using ModelManager::download_model()",
                model
            )));
        }

        let model_path = manager.get_model_path(model);
        let labels_path = manager.get_labels_path(model);
        let mut builder = self.with_custom_model(&model_path, &labels_path)?;
        if builder.input_size.is_none() {
            builder.input_size = Some(model.characteristics().input_size);
        }
        Ok(builder)
    }

    /// Sets a custom ONNX model and labels file for the classifier
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - The paths are empty or a model is already set
    ///   - The model or labels file cannot be loaded
    ///
    /// # Example
    /// ```no_run
    /// use occipital::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_custom_model("models/squeezenet1.1-7.onnx", "models/imagenet_labels.txt");
    /// ```
    pub fn with_custom_model(
        mut self,
        model_path: impl AsRef<Path>,
        labels_path: impl AsRef<Path>,
    ) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        let labels_path = labels_path.as_ref();
        if model_path.as_os_str().is_empty() || labels_path.as_os_str().is_empty() {
            return Err(ClassifierError::Build("Model and labels paths cannot be empty".to_string()));
        }
        if self.engine.is_some() {
            return Err(ClassifierError::Build("Model already set".to_string()));
        }

        let labels = load_labels(labels_path)?;
        let engine = OrtEngine::from_file(model_path, &self.runtime_config)?;
        info!("Model structure validated successfully");

        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.labels_path = Some(labels_path.to_string_lossy().to_string());
        self.engine = Some(Arc::new(engine));
        self.labels = Some(labels);
        Ok(self)
    }

    /// Uses an already loaded engine and label table.
    ///
    /// This is the seam for substituting the inference backend, e.g. with a
    /// deterministic engine in tests.
    pub fn with_engine(
        mut self,
        engine: Arc<dyn InferenceEngine>,
        labels: Vec<String>,
    ) -> Result<Self, ClassifierError> {
        if self.engine.is_some() {
            return Err(ClassifierError::Build("Model already set".to_string()));
        }
        self.engine = Some(engine);
        self.labels = Some(labels);
        Ok(self)
    }

    /// Sets the width and height images are resized to before inference
    pub fn with_input_size(mut self, size: (u32, u32)) -> Result<Self, ClassifierError> {
        if size.0 == 0 || size.1 == 0 {
            return Err(ClassifierError::Build(format!(
                "Input size must be non-zero, got {}x{}",
                size.0, size.1
            )));
        }
        self.input_size = Some(size);
        Ok(self)
    }

    /// Sets how many predictions are returned per image
    pub fn with_top_k(mut self, k: usize) -> Result<Self, ClassifierError> {
        if k == 0 {
            return Err(ClassifierError::Build("top_k must be at least 1".to_string()));
        }
        self.top_k = k;
        Ok(self)
    }

    /// Builds and returns the final Classifier instance
    ///
    /// When no input size was given, it is taken from the model's declared
    /// `(1, 3, H, W)` input shape, falling back to 224x224.
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - The constructed Classifier if successful, or an error if:
    ///   - No model has been set
    ///   - The label table is empty
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        let engine = self.engine
            .ok_or_else(|| ClassifierError::Build("A model must be set before building".to_string()))?;
        let labels = self.labels
            .ok_or_else(|| ClassifierError::Build("Labels must be loaded before building".to_string()))?;
        if labels.is_empty() {
            return Err(ClassifierError::Build("At least one label must be loaded".to_string()));
        }

        if let Some(num_classes) = engine.num_classes() {
            if num_classes != labels.len() {
                warn!(
                    "Model declares {} classes but {} labels were loaded; predictions may fail",
                    num_classes,
                    labels.len()
                );
            }
        }

        let input_size = self.input_size
            .or_else(|| declared_input_size(&engine.input_shape()))
            .unwrap_or(DEFAULT_INPUT_SIZE);

        info!(
            "Classifier ready: {} labels, input {}x{}, top {}",
            labels.len(),
            input_size.0,
            input_size.1,
            self.top_k
        );

        Ok(Classifier {
            model_path: self.model_path,
            labels_path: self.labels_path,
            engine,
            labels: Arc::new(labels),
            input_size,
            top_k: self.top_k,
        })
    }
}

/// Reads `(W, H)` from a static NCHW input shape
fn declared_input_size(shape: &[i64]) -> Option<(u32, u32)> {
    match shape {
        [_, _, height, width] if *height > 0 && *width > 0 => {
            Some((u32::try_from(*width).ok()?, u32::try_from(*height).ok()?))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_input_size() {
        assert_eq!(declared_input_size(&[1, 3, 224, 224]), Some((224, 224)));
        assert_eq!(declared_input_size(&[1, 3, 120, 160]), Some((160, 120)));
        assert_eq!(declared_input_size(&[-1, 3, -1, -1]), None);
        assert_eq!(declared_input_size(&[1, 1000]), None);
    }

    #[test]
    fn test_build_without_model() {
        let result = ClassifierBuilder::new().build();
        assert!(matches!(result, Err(ClassifierError::Build(_))));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            ClassifierBuilder::new().with_input_size((0, 224)),
            Err(ClassifierError::Build(_))
        ));
        assert!(matches!(
            ClassifierBuilder::new().with_top_k(0),
            Err(ClassifierError::Build(_))
        ));
        assert!(matches!(
            ClassifierBuilder::new().with_custom_model("", "labels.txt"),
            Err(ClassifierError::Build(_))
        ));
    }

    #[test]
    fn test_missing_labels_file() {
        let result = ClassifierBuilder::new()
            .with_custom_model("/nonexistent/model.onnx", "/nonexistent/labels.txt");
        assert!(matches!(result, Err(ClassifierError::Load(_))));
    }
}
