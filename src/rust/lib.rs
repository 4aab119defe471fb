//! A thread-safe image classifier library and HTTP service using ONNX models.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use occipital::{Classifier, BuiltinModel};
//!
//! let classifier = Classifier::builder()
//!     .with_model(BuiltinModel::SqueezeNet)?
//!     .with_top_k(5)?
//!     .build()?;
//!
//! let bytes = std::fs::read("cat.jpg")?;
//! for prediction in classifier.predict_bytes(&bytes)? {
//!     println!("{}: {:.3}", prediction.class_name, prediction.confidence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Models
//!
//! Any ONNX model taking a `[1, 3, H, W]` float tensor in `[0, 1]` and
//! producing one row of logits works, given a labels file with one class name
//! per line:
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use occipital::Classifier;
//!
//! let classifier = Classifier::builder()
//!     .with_custom_model("models/resnet.onnx", "models/labels.txt")?
//!     .with_input_size((224, 224))?
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The classifier is thread-safe and can be shared across threads using `Arc`:
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use occipital::{Classifier, BuiltinModel};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let classifier = Arc::new(Classifier::builder()
//!     .with_model(BuiltinModel::SqueezeNet)?
//!     .build()?);
//! let image = image::RgbImage::from_pixel(64, 64, image::Rgb([255, 0, 0]));
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let classifier = Arc::clone(&classifier);
//!     let image = image.clone();
//!     handles.push(thread::spawn(move || {
//!         classifier.predict_default(&image).unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod model_manager;
pub mod models;
pub mod monitoring;
mod runtime;
pub mod server;

pub use classifier::{
    Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo, InferenceEngine, OrtEngine,
    Prediction,
};
pub use config::{ConfigError, Settings};
pub use model_manager::{ModelError, ModelManager};
pub use models::{BuiltinModel, ModelCharacteristics, ModelInfo};
pub use monitoring::{MetricsSummary, MonitoringClient, MonitoringError};
pub use runtime::{create_session_builder, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
