mod error;
mod classifier;
mod labels;
mod postprocess;
mod preprocess;
pub mod builder;
pub mod engine;

pub use error::ClassifierError;
pub use classifier::Classifier;
pub use builder::ClassifierBuilder;
pub use engine::{InferenceEngine, OrtEngine};
pub use labels::load_labels;
pub use postprocess::{postprocess, softmax, top_k, Prediction};
pub use preprocess::{decode_image, preprocess, RESIZE_FILTER};

/// Number of predictions returned per image unless configured otherwise
pub const DEFAULT_TOP_K: usize = 10;

/// Input size used when neither the caller nor the model declares one
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (224, 224);

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Path to the ONNX model file, if loaded from disk
    pub model_path: Option<String>,
    /// Path to the labels file, if loaded from disk
    pub labels_path: Option<String>,
    /// Number of entries in the label table
    pub num_labels: usize,
    /// Name of the model's input tensor
    pub input_name: String,
    /// Name of the model's output tensor
    pub output_name: String,
    /// Declared input shape, `-1` for dynamic dimensions
    pub input_shape: Vec<i64>,
    /// Declared output shape, `-1` for dynamic dimensions
    pub output_shape: Vec<i64>,
    /// Width and height images are resized to
    pub input_size: (u32, u32),
    /// Number of predictions returned per image
    pub top_k: usize,
}
