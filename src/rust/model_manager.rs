use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use reqwest::Url;
use sha2::{Sha256, Digest};
use log;

use crate::models::{BuiltinModel, ModelInfo};

/// Hosts model and label files may be downloaded from
const ALLOWED_HOSTS: [&str; 2] = ["github.com", "raw.githubusercontent.com"];

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Unsafe or invalid URL: {0}")]
    UnsafeUrl(String),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Returns true for `https` URLs on an allowed host.
pub fn is_safe_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            parsed.scheme() == "https"
                && parsed
                    .host_str()
                    .map_or(false, |host| ALLOWED_HOSTS.contains(&host))
        }
        Err(_) => false,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        Self::models_dir_from(|name| env::var(name).ok())
    }

    /// Resolves the models directory from an arbitrary variable lookup
    pub fn models_dir_from<F>(lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. Check environment variable
        if let Some(path) = lookup("OCCIPITAL_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("occipital").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("occipital").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("occipital").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_path(&self, model: BuiltinModel) -> PathBuf {
        let info = model.get_model_info();
        self.models_dir.join(info.name).join("model.onnx")
    }

    pub fn get_labels_path(&self, model: BuiltinModel) -> PathBuf {
        let info = model.get_model_info();
        self.models_dir.join(info.name).join("labels.txt")
    }

    pub fn is_model_downloaded(&self, model: BuiltinModel) -> bool {
        let model_path = self.get_model_path(model);
        let labels_path = self.get_labels_path(model);
        log::debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        log::debug!("Labels path: {:?} (exists: {})", labels_path, labels_path.exists());
        model_path.exists() && labels_path.exists()
    }

    /// Downloads the model and label files, skipping files that already exist
    /// and pass verification. Partially downloaded files are removed on failure.
    pub async fn download_model(&self, model: BuiltinModel) -> Result<(), ModelError> {
        let info = model.get_model_info();
        let _lock = self.download_lock.lock().await;

        let model_dir = self.models_dir.join(&info.name);
        log::info!("Creating model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        let result = self.fetch_files(model, &info).await;
        match result {
            Ok(()) => {
                log::info!("Model and labels ready to use");
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to set up {}: {}", info.display_name, e);
                let _ = self.remove_download(model);
                Err(e)
            }
        }
    }

    async fn fetch_files(&self, model: BuiltinModel, info: &ModelInfo) -> Result<(), ModelError> {
        let model_path = self.get_model_path(model);
        if model_path.exists() && self.verify_file(&model_path, info.model_hash.as_deref())? {
            log::info!("Existing model file verified at {:?}", model_path);
        } else {
            log::info!("Downloading model file to {:?}", model_path);
            self.download_and_verify_file(&info.model_url, &model_path, info.model_hash.as_deref(), "model")
                .await?;
        }

        let labels_path = self.get_labels_path(model);
        if labels_path.exists() {
            log::info!("Labels file exists at {:?}", labels_path);
        } else {
            log::info!("Downloading labels file to {:?}", labels_path);
            self.download_and_verify_file(&info.labels_url, &labels_path, None, "labels")
                .await?;
        }
        Ok(())
    }

    /// Hashes a file and compares it with `expected_hash`; any readable file
    /// passes when no hash is pinned.
    fn verify_file(&self, path: &Path, expected_hash: Option<&str>) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::info!("Verifying {:?}: {} bytes, sha256 {}", path, bytes.len(), hash);
        match expected_hash {
            Some(expected) => Ok(hash == expected),
            None => Ok(!bytes.is_empty()),
        }
    }

    pub fn verify_model(&self, model: BuiltinModel) -> Result<bool, ModelError> {
        let info = model.get_model_info();
        let model_path = self.get_model_path(model);
        let labels_path = self.get_labels_path(model);

        if !model_path.exists() || !labels_path.exists() {
            log::info!("One or both files do not exist");
            return Ok(false);
        }

        let model_ok = self.verify_file(&model_path, info.model_hash.as_deref())?;
        let labels_ok = self.verify_file(&labels_path, None)?;
        log::info!("Verification results: model {}, labels {}", model_ok, labels_ok);

        Ok(model_ok && labels_ok)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        if !is_safe_url(url) {
            return Err(ModelError::UnsafeUrl(url.to_string()));
        }

        log::info!("Downloading {} file from {}", file_type, url);
        let client = reqwest::Client::builder()
            .user_agent(concat!("occipital/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let response = client.get(url).send().await?.error_for_status()?;
        log::info!("Download response status: {}", response.status());
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        self.store_verified(&bytes, path, expected_hash, file_type)
    }

    /// Checks downloaded bytes against `expected_hash`, writes them to `path`
    /// and re-reads the written file. Nothing is left at `path` on failure.
    fn store_verified(
        &self,
        bytes: &[u8],
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        let hash = sha256_hex(bytes);
        if let Some(expected) = expected_hash {
            if hash != expected {
                log::error!("{} hash mismatch: expected {}, got {}", file_type, expected, hash);
                if path.exists() {
                    fs::remove_file(path)?;
                }
                return Err(ModelError::HashMismatch {
                    file_type: file_type.to_string(),
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;

        if !self.verify_file(path, Some(&hash))? {
            fs::remove_file(path)?;
            return Err(ModelError::VerificationFailed);
        }

        log::info!("{} file saved to {:?}", file_type, path);
        Ok(())
    }

    pub fn remove_download(&self, model: BuiltinModel) -> Result<(), ModelError> {
        let model_path = self.get_model_path(model);
        let labels_path = self.get_labels_path(model);

        if model_path.exists() {
            fs::remove_file(&model_path)?;
        }
        if labels_path.exists() {
            fs::remove_file(&labels_path)?;
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified.
    /// If the model doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_model_downloaded(&self, model: BuiltinModel) -> Result<(), ModelError> {
        if self.discard_unverified(model)? {
            log::warn!("Model {:?} verification failed, re-downloading...", model);
        }
        if !self.is_model_downloaded(model) {
            log::info!("Model {:?} not found, downloading...", model);
            self.download_model(model).await?;
        }
        Ok(())
    }

    /// Removes downloaded files that fail verification. Returns true if
    /// anything was removed.
    fn discard_unverified(&self, model: BuiltinModel) -> Result<bool, ModelError> {
        if !self.is_model_downloaded(model) || self.verify_model(model)? {
            return Ok(false);
        }
        self.remove_download(model)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_urls() {
        assert!(is_safe_url("https://github.com/onnx/models/raw/main/model.onnx"));
        assert!(is_safe_url("https://raw.githubusercontent.com/pytorch/hub/master/imagenet_classes.txt"));

        assert!(!is_safe_url("http://github.com/onnx/models/raw/main/model.onnx"));
        assert!(!is_safe_url("https://example.com/model.onnx"));
        assert!(!is_safe_url("https://github.com.evil.io/model.onnx"));
        assert!(!is_safe_url("not a url"));
    }

    #[test]
    fn test_model_paths() {
        let manager = ModelManager::new(env::temp_dir().join("occipital-paths-test")).unwrap();
        let model_path = manager.get_model_path(BuiltinModel::SqueezeNet);
        let labels_path = manager.get_labels_path(BuiltinModel::SqueezeNet);

        assert!(model_path.ends_with("squeezenet1.1/model.onnx"));
        assert!(labels_path.ends_with("squeezenet1.1/labels.txt"));
    }

    #[test]
    fn test_verify_model_with_local_files() -> Result<(), ModelError> {
        let manager = ModelManager::new(env::temp_dir().join("occipital-verify-test"))?;
        let model = BuiltinModel::SqueezeNet;
        manager.remove_download(model)?;
        assert!(!manager.is_model_downloaded(model));
        assert!(!manager.verify_model(model)?);

        let model_path = manager.get_model_path(model);
        fs::create_dir_all(model_path.parent().unwrap())?;
        fs::write(&model_path, b"onnx bytes")?;
        fs::write(manager.get_labels_path(model), b"cat\ndog\n")?;
        assert!(manager.is_model_downloaded(model));
        assert!(manager.verify_model(model)?);

        // an empty model file never verifies
        fs::write(&model_path, b"")?;
        assert!(!manager.verify_model(model)?);

        manager.remove_download(model)?;
        assert!(!manager.is_model_downloaded(model));
        Ok(())
    }

    #[test]
    fn test_unsafe_url_is_rejected_before_download() {
        let manager = ModelManager::new(env::temp_dir().join("occipital-unsafe-test")).unwrap();
        let path = manager.models_dir().join("file.bin");
        let result = tokio_test::block_on(manager.download_and_verify_file(
            "http://example.com/file.bin",
            &path,
            None,
            "model",
        ));
        assert!(matches!(result, Err(ModelError::UnsafeUrl(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_default_models_dir() {
        let path = ModelManager::models_dir_from(|name| {
            (name == "OCCIPITAL_CACHE").then(|| "/tmp/occipital-test-cache".to_string())
        });
        assert_eq!(path, PathBuf::from("/tmp/occipital-test-cache/models"));

        let path = ModelManager::models_dir_from(|_| None);
        assert!(path.ends_with("occipital/models"));
    }

    #[test]
    fn test_hash_mismatch_leaves_nothing() {
        let manager = ModelManager::new(env::temp_dir().join("occipital-mismatch-test")).unwrap();
        let path = manager.models_dir().join("model.onnx");
        fs::write(&path, b"stale").unwrap();

        let result = manager.store_verified(b"onnx bytes", &path, Some(&sha256_hex(b"other")), "model");
        match result {
            Err(ModelError::HashMismatch { file_type, expected, actual }) => {
                assert_eq!(file_type, "model");
                assert_eq!(expected, sha256_hex(b"other"));
                assert_eq!(actual, sha256_hex(b"onnx bytes"));
            }
            other => panic!("expected a hash mismatch, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_store_verified_writes_file() -> Result<(), ModelError> {
        let manager = ModelManager::new(env::temp_dir().join("occipital-store-test"))?;
        let path = manager.models_dir().join("nested").join("labels.txt");

        manager.store_verified(b"cat\ndog\n", &path, Some(&sha256_hex(b"cat\ndog\n")), "labels")?;
        assert_eq!(fs::read(&path)?, b"cat\ndog\n");

        manager.store_verified(b"tench\n", &path, None, "labels")?;
        assert_eq!(fs::read(&path)?, b"tench\n");
        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn test_unverified_download_is_discarded() -> Result<(), ModelError> {
        let manager = ModelManager::new(env::temp_dir().join("occipital-discard-test"))?;
        let model = BuiltinModel::SqueezeNet;
        let model_path = manager.get_model_path(model);
        fs::create_dir_all(model_path.parent().unwrap())?;

        // nothing downloaded, nothing to discard
        manager.remove_download(model)?;
        assert!(!manager.discard_unverified(model)?);

        fs::write(&model_path, b"onnx bytes")?;
        fs::write(manager.get_labels_path(model), b"cat\n")?;
        assert!(!manager.discard_unverified(model)?);
        assert!(manager.is_model_downloaded(model));

        // an empty model file fails verification and both files go
        fs::write(&model_path, b"")?;
        assert!(manager.discard_unverified(model)?);
        assert!(!model_path.exists());
        assert!(!manager.get_labels_path(model).exists());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "downloads SqueezeNet from GitHub"]
    async fn test_model_download() -> Result<(), ModelError> {
        let manager = ModelManager::new(env::temp_dir().join("occipital-download-test"))?;
        let model = BuiltinModel::SqueezeNet;
        manager.remove_download(model)?;

        manager.download_model(model).await?;
        assert!(manager.is_model_downloaded(model));
        assert!(manager.verify_model(model)?);
        Ok(())
    }
}
