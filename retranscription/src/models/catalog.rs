// models/catalog.rs
//
// Provider tags, model status and the per-provider catalog trait queried by
// the model picker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Transcription backends that expose a model inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Whisper,
    Parakeet,
}

impl ModelProvider {
    /// Tag sent to the worker in the start command.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Whisper => "whisper",
            Self::Parakeet => "parakeet",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Whisper => "Whisper",
            Self::Parakeet => "Parakeet",
        }
    }

    /// Parakeet only transcribes in its default language.
    pub fn supports_language_selection(&self) -> bool {
        matches!(self, Self::Whisper)
    }

    /// Accepts both the wire tags and the settings tags (`localWhisper`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "whisper" | "localWhisper" => Some(Self::Whisper),
            "parakeet" => Some(Self::Parakeet),
            _ => None,
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelStatus {
    Available,
    Missing,
    Corrupted { file_size: u64, expected_min_size: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub path: PathBuf,
    pub size_mb: u32,
    pub status: ModelStatus,
    pub description: String,
}

impl ModelInfo {
    pub fn is_available(&self) -> bool {
        matches!(self.status, ModelStatus::Available)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to discover models in {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only model inventory of one provider.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    fn provider(&self) -> ModelProvider;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_tags() {
        assert_eq!(ModelProvider::from_tag("localWhisper"), Some(ModelProvider::Whisper));
        assert_eq!(ModelProvider::from_tag("whisper"), Some(ModelProvider::Whisper));
        assert_eq!(ModelProvider::from_tag("parakeet"), Some(ModelProvider::Parakeet));
        assert_eq!(ModelProvider::from_tag("deepgram"), None);
        assert_eq!(ModelProvider::Parakeet.to_string(), "parakeet");
    }

    #[test]
    fn test_language_support() {
        assert!(ModelProvider::Whisper.supports_language_selection());
        assert!(!ModelProvider::Parakeet.supports_language_selection());
    }

    #[test]
    fn test_status_serialization_matches_engine_format() {
        let json = serde_json::to_value(ModelStatus::Corrupted {
            file_size: 10,
            expected_min_size: 100,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "Corrupted": { "file_size": 10, "expected_min_size": 100 } })
        );
        let available: ModelStatus = serde_json::from_str("\"Available\"").unwrap();
        assert_eq!(available, ModelStatus::Available);
    }
}
