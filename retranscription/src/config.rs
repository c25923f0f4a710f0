//! Application configuration constants and the settings file.
//!
//! Centralized definitions for default models and settings.
//! Used by the model picker and the retranscribe CLI.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default Whisper model for transcription when no preference is configured.
pub const DEFAULT_WHISPER_MODEL: &str = "large-v3-turbo";

/// Default Parakeet model for transcription when no preference is configured.
/// This is the quantized version optimized for speed.
pub const DEFAULT_PARAKEET_MODEL: &str = "parakeet-tdt-0.6b-v3-int8";

const APP_DIR_NAME: &str = "uchitil-live";
const SOCKET_FILE_NAME: &str = "transcription-worker.sock";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The globally configured transcription provider and model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptConfig {
    pub provider: String,
    pub model: String,
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            provider: "parakeet".to_string(),
            model: DEFAULT_PARAKEET_MODEL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar_socket: Option<PathBuf>,
}

impl AppConfig {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No settings file at {}, using default configuration",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "📝 Loaded transcript config - provider: {}, model: {}",
            config.transcript.provider, config.transcript.model
        );
        Ok(config)
    }

    /// Default settings file location inside the app data directory.
    pub fn default_path() -> PathBuf {
        app_data_dir().join("settings.json")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(|| app_data_dir().join("models"))
    }

    /// Parakeet models live in their own subdirectory of the models dir.
    pub fn parakeet_models_dir(&self) -> PathBuf {
        self.models_dir().join("parakeet")
    }

    pub fn sidecar_socket(&self) -> PathBuf {
        self.sidecar_socket
            .clone()
            .unwrap_or_else(|| app_data_dir().join(SOCKET_FILE_NAME))
    }
}

fn app_data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join(APP_DIR_NAME),
        None => {
            warn!("No platform data directory, falling back to the working directory");
            PathBuf::from(".").join(APP_DIR_NAME)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.transcript.provider, "parakeet");
        assert_eq!(config.transcript.model, DEFAULT_PARAKEET_MODEL);
    }

    #[test]
    fn test_load_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "transcript": {{ "provider": "localWhisper", "model": "base" }},
                "modelsDir": "/opt/models"
            }}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.transcript.provider, "localWhisper");
        assert_eq!(config.transcript.model, "base");
        assert_eq!(config.transcript.api_key, None);
        assert_eq!(config.models_dir(), PathBuf::from("/opt/models"));
        assert_eq!(
            config.parakeet_models_dir(),
            PathBuf::from("/opt/models/parakeet")
        );
    }

    #[test]
    fn test_invalid_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
