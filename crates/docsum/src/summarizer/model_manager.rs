//! Model download and cache management using Hugging Face Hub.

use std::path::{Path, PathBuf};

use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use log::{debug, info, warn};
use thiserror::Error;

use crate::config::schema::LlamaConfig;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to prepare model cache: {0}")]
    CacheDirectory(#[from] std::io::Error),

    #[error("Failed to download model from Hugging Face: {0}")]
    HuggingFaceDownload(String),
}

pub struct ModelManager {
    cache_dir: PathBuf,
    model_repo: String,
    model_file: String,
}

impl ModelManager {
    pub fn new(cache_dir: impl AsRef<Path>, model_repo: &str, model_file: &str) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            model_repo: model_repo.to_string(),
            model_file: model_file.to_string(),
        }
    }

    pub fn from_config(config: &LlamaConfig) -> Self {
        Self::new(&config.model_cache_dir, &config.model_repo, &config.model_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.cache_dir.join(&self.model_file)
    }

    pub fn is_model_available(&self) -> bool {
        self.model_path().exists()
    }

    /// Returns the cached model path, downloading the file first if needed.
    pub fn ensure_model(&self) -> Result<PathBuf, ModelError> {
        let model_path = self.model_path();
        if model_path.exists() {
            debug!("Model already cached at: {}", model_path.display());
            return Ok(model_path);
        }

        std::fs::create_dir_all(&self.cache_dir)?;

        info!(
            "Downloading model {} from {}...",
            self.model_file, self.model_repo
        );
        let api = Api::new().map_err(|e| ModelError::HuggingFaceDownload(e.to_string()))?;
        let repo = api.repo(Repo::new(self.model_repo.clone(), RepoType::Model));
        let downloaded = repo
            .get(&self.model_file)
            .map_err(|e| ModelError::HuggingFaceDownload(e.to_string()))?;
        info!("Model downloaded to: {}", downloaded.display());

        #[cfg(unix)]
        {
            if let Err(e) = std::os::unix::fs::symlink(&downloaded, &model_path) {
                warn!("Failed to create symlink, copying instead: {}", e);
                std::fs::copy(&downloaded, &model_path)?;
            }
        }

        #[cfg(not(unix))]
        {
            std::fs::copy(&downloaded, &model_path)?;
        }

        Ok(model_path)
    }
}
