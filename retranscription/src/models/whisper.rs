// models/whisper.rs
//
// Whisper model discovery over a directory of ggerganov/whisper.cpp GGML files.

use super::catalog::{CatalogError, ModelCatalog, ModelInfo, ModelProvider, ModelStatus};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

// (name, filename, size_mb, description)
const WHISPER_MODELS: &[(&str, &str, u32, &str)] = &[
    // Standard f16 models (full precision)
    ("tiny", "ggml-tiny.bin", 39, "Fastest processing, good for real-time use"),
    ("base", "ggml-base.bin", 142, "Good balance of speed and accuracy"),
    ("small", "ggml-small.bin", 466, "Better accuracy, moderate speed"),
    ("medium", "ggml-medium.bin", 1420, "High accuracy for professional use"),
    ("large-v3-turbo", "ggml-large-v3-turbo.bin", 809, "Best accuracy with improved speed"),
    ("large-v3", "ggml-large-v3.bin", 2870, "Best accuracy, latest large model"),
    // Q5_0 quantized models (balanced speed/accuracy)
    ("tiny-q5_0", "ggml-tiny-q5_0.bin", 26, "Quantized tiny model, ~50% faster processing"),
    ("base-q5_0", "ggml-base-q5_0.bin", 85, "Quantized base model, good speed/accuracy balance"),
    ("small-q5_0", "ggml-small-q5_0.bin", 280, "Quantized small model, faster than f16 version"),
    ("medium-q5_0", "ggml-medium-q5_0.bin", 852, "Quantized medium model, professional quality"),
    ("large-v3-turbo-q5_0", "ggml-large-v3-turbo-q5_0.bin", 574, "Quantized large model, best balance"),
    ("large-v3-q5_0", "ggml-large-v3-q5_0.bin", 1050, "Quantized large model, high accuracy"),
];

const GGML_MAGICS: &[&[u8; 4]] = &[b"ggml", b"GGUF", b"ggmf", b"lmgg", b"FUGU", b"fmgg"];

pub struct WhisperCatalog {
    models_dir: PathBuf,
}

impl WhisperCatalog {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    async fn model_status(&self, filename: &str, size_mb: u32) -> ModelStatus {
        let model_path = self.models_dir.join(filename);
        let metadata = match fs::metadata(&model_path).await {
            Ok(metadata) => metadata,
            Err(_) => return ModelStatus::Missing,
        };

        let file_size_bytes = metadata.len();
        let file_size_mb = file_size_bytes / (1024 * 1024);
        // Allow 90% of expected size to tolerate differing builds
        let expected_min_size_mb = (size_mb as f64 * 0.9) as u64;
        let corrupted = ModelStatus::Corrupted {
            file_size: file_size_bytes,
            expected_min_size: expected_min_size_mb * 1024 * 1024,
        };

        if file_size_mb >= expected_min_size_mb && file_size_mb > 1 {
            match validate_model_file(&model_path).await {
                Ok(()) => ModelStatus::Available,
                Err(reason) => {
                    log::warn!(
                        "Model file {} has correct size but appears corrupted: {}",
                        filename,
                        reason
                    );
                    corrupted
                }
            }
        } else if file_size_bytes > 0 {
            log::warn!(
                "Model file {} exists but is corrupted ({} MB, expected ~{} MB)",
                filename,
                file_size_mb,
                size_mb
            );
            corrupted
        } else {
            ModelStatus::Missing
        }
    }
}

#[async_trait]
impl ModelCatalog for WhisperCatalog {
    fn provider(&self) -> ModelProvider {
        ModelProvider::Whisper
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, CatalogError> {
        if !fs::try_exists(&self.models_dir).await.unwrap_or(false) {
            return Err(CatalogError::Io {
                path: self.models_dir.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "models directory does not exist",
                ),
            });
        }

        let mut models = Vec::with_capacity(WHISPER_MODELS.len());
        for &(name, filename, size_mb, description) in WHISPER_MODELS {
            let status = self.model_status(filename, size_mb).await;
            models.push(ModelInfo {
                name: name.to_string(),
                path: self.models_dir.join(filename),
                size_mb,
                status,
                description: description.to_string(),
            });
        }
        Ok(models)
    }
}

async fn validate_model_file(model_path: &Path) -> Result<(), String> {
    let mut file = fs::File::open(model_path)
        .await
        .map_err(|e| format!("Failed to open model file: {}", e))?;

    let mut buffer = [0u8; 4];
    file.read_exact(&mut buffer)
        .await
        .map_err(|e| format!("Failed to read model file header: {}", e))?;

    if GGML_MAGICS.iter().any(|magic| **magic == buffer) {
        Ok(())
    } else {
        Err(format!(
            "missing GGML/GGUF magic number, found {:?}",
            String::from_utf8_lossy(&buffer)
        ))
    }
}
