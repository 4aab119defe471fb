use std::sync::Arc;
use image::RgbImage;
use log::{debug, error};

use super::engine::InferenceEngine;
use super::error::ClassifierError;
use super::postprocess::{postprocess, Prediction};
use super::preprocess::{decode_image, preprocess};

/// A thread-safe image classifier: preprocessing, ONNX inference and top-k
/// postprocessing behind one call.
///
/// # Thread Safety
///
/// This type is automatically `Send + Sync` because all of its fields are thread-safe:
/// - `String`, `(u32, u32)` and `usize` are `Send + Sync`
/// - the engine and the label table are shared through `Arc` and never mutated
///
/// Build it once at startup and hand out `Arc<Classifier>`:
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use occipital::{Classifier, BuiltinModel};
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(Classifier::builder()
///     .with_model(BuiltinModel::SqueezeNet)?
///     .build()?);
///
/// let image = image::open("cat.jpg")?.to_rgb8();
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     classifier_clone.predict(&image, (224, 224)).unwrap();
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Classifier {
    pub model_path: Option<String>,
    pub labels_path: Option<String>,
    pub engine: Arc<dyn InferenceEngine>,
    pub labels: Arc<Vec<String>>,
    pub input_size: (u32, u32),
    pub top_k: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            num_labels: self.labels.len(),
            input_name: self.engine.input_name().to_string(),
            output_name: self.engine.output_name().to_string(),
            input_shape: self.engine.input_shape(),
            output_shape: self.engine.output_shape(),
            input_size: self.input_size,
            top_k: self.top_k,
        }
    }

    /// Classifies an image resized to `target_size` (width, height).
    ///
    /// # Returns
    /// Up to `top_k` predictions sorted by descending confidence.
    ///
    /// # Errors
    /// - `Inference` if the engine rejects the tensor or fails internally
    /// - `LabelIndexMismatch` if the label table is shorter than the model output
    pub fn predict(
        &self,
        image: &RgbImage,
        target_size: (u32, u32),
    ) -> Result<Vec<Prediction>, ClassifierError> {
        let input = preprocess(image, target_size);

        let output = self.engine.run(input).map_err(|e| {
            error!("Prediction failed: {:#}", e);
            ClassifierError::Inference(format!("{:#}", e))
        })?;
        if output.nrows() == 0 {
            return Err(ClassifierError::Inference("Model returned an empty batch".into()));
        }

        let predictions = postprocess(output.row(0), &self.labels, self.top_k)?;
        debug!(
            "Top prediction for {}x{} image: {:?}",
            image.width(),
            image.height(),
            predictions.first()
        );
        Ok(predictions)
    }

    /// Classifies an image at the configured input size
    pub fn predict_default(&self, image: &RgbImage) -> Result<Vec<Prediction>, ClassifierError> {
        self.predict(image, self.input_size)
    }

    /// Decodes encoded image bytes (PNG, JPEG, ...) and classifies them
    ///
    /// # Errors
    /// - `InvalidInput` if the bytes are not an image; the engine is not invoked
    /// - anything [`predict`](Self::predict) returns
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Vec<Prediction>, ClassifierError> {
        let image = decode_image(bytes)?;
        self.predict_default(&image)
    }
}
