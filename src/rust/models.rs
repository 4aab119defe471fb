/// Represents the available built-in models in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModel {
    /// SqueezeNet 1.1 trained on ImageNet, opset 7
    ///
    /// Characteristics:
    /// - Input: 224x224 RGB, NCHW, values in [0, 1]
    /// - Output: 1000 ImageNet class logits
    /// - Size: ~5MB
    SqueezeNet,
}

/// Characteristics of a model including its capabilities and requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCharacteristics {
    /// Width and height the model expects its input resized to
    pub input_size: (u32, u32),
    /// Number of output classes (length of the logit vector)
    pub num_classes: usize,
    /// Approximate size of the model on disk
    pub model_size_mb: usize,
}

/// Where to fetch a model from and how to present it
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Cache directory name
    pub name: String,
    /// Human readable model name
    pub display_name: String,
    pub description: String,
    pub model_url: String,
    pub labels_url: String,
    /// Expected SHA-256 of the model file; unchecked when `None`
    pub model_hash: Option<String>,
}

const SQUEEZENET_MODEL_URL: &str = "https://github.com/onnx/models/raw/main/validated/vision/classification/squeezenet/model/squeezenet1.1-7.onnx";
const IMAGENET_LABELS_URL: &str = "https://raw.githubusercontent.com/pytorch/hub/master/imagenet_classes.txt";

impl BuiltinModel {
    /// Get the characteristics of the model
    pub fn characteristics(&self) -> ModelCharacteristics {
        match self {
            Self::SqueezeNet => ModelCharacteristics {
                input_size: (224, 224),
                num_classes: 1000,
                model_size_mb: 5,
            },
        }
    }

    /// Get the download and presentation details of the model
    pub fn get_model_info(&self) -> ModelInfo {
        match self {
            Self::SqueezeNet => ModelInfo {
                name: "squeezenet1.1".to_string(),
                display_name: "SqueezeNet 1.1".to_string(),
                description: "A lightweight CNN model for image classification, offering a smaller architecture with reduced computational requirements".to_string(),
                model_url: SQUEEZENET_MODEL_URL.to_string(),
                labels_url: IMAGENET_LABELS_URL.to_string(),
                model_hash: None,
            },
        }
    }
}
