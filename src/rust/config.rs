//! Service settings with environment variable overrides.
//!
//! Every field has a default; `Settings::from_env` replaces each one whose
//! `OCCIPITAL_*` variable is set. Command line flags are applied on top by the
//! binary.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::classifier::{DEFAULT_INPUT_SIZE, DEFAULT_TOP_K};
use crate::{BuiltinModel, ModelManager, RuntimeConfig};

#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {name}: {value:?} ({reason})")]
pub struct ConfigError {
    pub name: String,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub project_name: String,
    /// ONNX model file; `None` means the built-in model from the cache
    pub model_path: Option<PathBuf>,
    /// Labels file; `None` means the built-in labels from the cache
    pub labels_path: Option<PathBuf>,
    pub image_size: (u32, u32),
    pub top_k: usize,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
    pub prometheus_url: String,
    pub runtime: RuntimeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_name: "Image Classification Service".to_string(),
            model_path: None,
            labels_path: None,
            image_size: DEFAULT_INPUT_SIZE,
            top_k: DEFAULT_TOP_K,
            api_prefix: "/api/v1".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            body_limit_bytes: 10 * 1024 * 1024,
            prometheus_url: "http://localhost:9090".to_string(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Settings {
    /// Reads settings from `OCCIPITAL_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup("OCCIPITAL_PROJECT_NAME") {
            settings.project_name = value;
        }
        if let Some(value) = lookup("OCCIPITAL_MODEL_PATH") {
            settings.model_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("OCCIPITAL_LABELS_PATH") {
            settings.labels_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("OCCIPITAL_IMAGE_SIZE") {
            settings.image_size = parse_image_size(&value)
                .map_err(|reason| invalid("OCCIPITAL_IMAGE_SIZE", &value, reason))?;
        }
        if let Some(value) = lookup("OCCIPITAL_TOP_K") {
            settings.top_k = parse_var("OCCIPITAL_TOP_K", &value)?;
        }
        if let Some(value) = lookup("OCCIPITAL_API_PREFIX") {
            settings.api_prefix = normalize_prefix(&value);
        }
        if let Some(value) = lookup("OCCIPITAL_HOST") {
            settings.host = value;
        }
        if let Some(value) = lookup("OCCIPITAL_PORT") {
            settings.port = parse_var("OCCIPITAL_PORT", &value)?;
        }
        if let Some(value) = lookup("OCCIPITAL_BODY_LIMIT_BYTES") {
            settings.body_limit_bytes = parse_var("OCCIPITAL_BODY_LIMIT_BYTES", &value)?;
        }
        if let Some(value) = lookup("OCCIPITAL_PROMETHEUS_URL") {
            settings.prometheus_url = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = lookup("OCCIPITAL_INTRA_THREADS") {
            settings.runtime.intra_threads = parse_var("OCCIPITAL_INTRA_THREADS", &value)?;
        }
        if let Some(value) = lookup("OCCIPITAL_INTER_THREADS") {
            settings.runtime.inter_threads = parse_var("OCCIPITAL_INTER_THREADS", &value)?;
        }
        if let Some(value) = lookup("OCCIPITAL_OPT_LEVEL") {
            let level: u8 = parse_var("OCCIPITAL_OPT_LEVEL", &value)?;
            settings.runtime.optimization_level = RuntimeConfig::optimization_level_from(level);
        }

        Ok(settings)
    }

    /// Model and labels paths, resolving unset ones to the built-in model's
    /// cache location.
    pub fn resolved_paths(&self, manager: &ModelManager) -> (PathBuf, PathBuf) {
        let model = BuiltinModel::SqueezeNet;
        (
            self.model_path
                .clone()
                .unwrap_or_else(|| manager.get_model_path(model)),
            self.labels_path
                .clone()
                .unwrap_or_else(|| manager.get_labels_path(model)),
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(name: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(name, value, e.to_string()))
}

/// Parses `WIDTHxHEIGHT` (or `WIDTH,HEIGHT`) into a non-zero size.
pub fn parse_image_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(|c: char| c == 'x' || c == 'X' || c == ',')
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width: u32 = width.trim().parse().map_err(|e| format!("width: {}", e))?;
    let height: u32 = height.trim().parse().map_err(|e| format!("height: {}", e))?;
    if width == 0 || height == 0 {
        return Err("width and height must be non-zero".to_string());
    }
    Ok((width, height))
}

fn normalize_prefix(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
