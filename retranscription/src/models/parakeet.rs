// models/parakeet.rs
//
// Parakeet (NVIDIA NeMo, ONNX) model discovery. Each model is a directory
// holding the encoder, decoder, preprocessor and vocabulary.

use super::catalog::{CatalogError, ModelCatalog, ModelInfo, ModelProvider, ModelStatus};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

// Int8 ONNX exports: (file, minimum size in bytes)
const INT8_REQUIRED_FILES: [(&str, u64); 4] = [
    ("encoder-model.int8.onnx", 580_000_000),
    ("decoder_joint-model.int8.onnx", 8_000_000),
    ("nemo128.onnx", 100_000),
    ("vocab.txt", 5_000),
];

// (name, size_mb, description)
const PARAKEET_MODELS: &[(&str, u32, &str)] = &[
    (
        "parakeet-tdt-0.6b-v3-int8",
        670,
        "Real time on M4 Max, latest version with int8 quantization",
    ),
    (
        "parakeet-tdt-0.6b-v2-int8",
        661,
        "Previous version with int8 quantization, good balance of speed and accuracy",
    ),
];

pub struct ParakeetCatalog {
    models_dir: PathBuf,
}

impl ParakeetCatalog {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    async fn model_status(model_path: &Path, size_mb: u32) -> ModelStatus {
        if !fs::try_exists(model_path).await.unwrap_or(false) {
            return ModelStatus::Missing;
        }

        let mut total_size = 0u64;
        let mut all_files_exist = true;
        let mut undersized = None;

        for (file, min_size) in INT8_REQUIRED_FILES {
            match fs::metadata(model_path.join(file)).await {
                Ok(metadata) => {
                    total_size += metadata.len();
                    if metadata.len() < min_size && undersized.is_none() {
                        undersized = Some(file);
                    }
                }
                Err(_) => all_files_exist = false,
            }
        }

        if !all_files_exist {
            return ModelStatus::Missing;
        }

        match undersized {
            None => ModelStatus::Available,
            Some(file) => {
                log::warn!(
                    "Model directory {} appears corrupted ({} is smaller than expected)",
                    model_path.display(),
                    file
                );
                ModelStatus::Corrupted {
                    file_size: total_size,
                    expected_min_size: (size_mb as u64) * 1024 * 1024,
                }
            }
        }
    }
}

#[async_trait]
impl ModelCatalog for ParakeetCatalog {
    fn provider(&self) -> ModelProvider {
        ModelProvider::Parakeet
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, CatalogError> {
        if !fs::try_exists(&self.models_dir).await.unwrap_or(false) {
            return Err(CatalogError::Io {
                path: self.models_dir.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Parakeet models directory does not exist",
                ),
            });
        }

        let mut models = Vec::with_capacity(PARAKEET_MODELS.len());
        for &(name, size_mb, description) in PARAKEET_MODELS {
            let model_path = self.models_dir.join(name);
            let status = Self::model_status(&model_path, size_mb).await;
            models.push(ModelInfo {
                name: name.to_string(),
                path: model_path,
                size_mb,
                status,
                description: description.to_string(),
            });
        }
        Ok(models)
    }
}
