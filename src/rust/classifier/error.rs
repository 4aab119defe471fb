use ort::Error as OrtError;

/// Represents the different types of errors that can occur in the image classifier.
///
/// Every lower-level failure (image decoding, ONNX Runtime, file IO) is folded
/// into one of these kinds with the original message preserved.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The label file or the ONNX graph could not be loaded
    #[error("Load error: {0}")]
    Load(String),
    /// The caller supplied bytes that do not decode to an image
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The inference engine rejected the tensor or failed internally
    #[error("Inference failed: {0}")]
    Inference(String),
    /// Postprocessing selected a class index the label table does not cover
    #[error("Label index {index} out of range for {labels} labels")]
    LabelIndexMismatch { index: usize, labels: usize },
    /// Error occurred during the build phase
    #[error("Build error: {0}")]
    Build(String),
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::Load(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_message() {
        let err = ClassifierError::Inference("bad shape".into());
        assert_eq!(err.to_string(), "Inference failed: bad shape");

        let err = ClassifierError::LabelIndexMismatch { index: 12, labels: 10 };
        assert_eq!(err.to_string(), "Label index 12 out of range for 10 labels");
    }
}
