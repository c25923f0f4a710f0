// models/inventory.rs
//
// Merges the per-provider catalogs into the single list shown by the model
// picker. A failing provider contributes nothing; it never blocks the picker.

use super::catalog::{ModelCatalog, ModelInfo, ModelProvider};
use crate::config::{TranscriptConfig, DEFAULT_PARAKEET_MODEL, DEFAULT_WHISPER_MODEL};
use futures_util::future::join_all;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One selectable entry of the model picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub provider: ModelProvider,
    pub name: String,
    pub display_name: String,
    pub size_mb: u32,
}

impl ModelOption {
    pub fn from_info(provider: ModelProvider, info: &ModelInfo) -> Self {
        Self {
            provider,
            name: info.name.clone(),
            display_name: format!("{} ({})", info.name, format_size(info.size_mb)),
            size_mb: info.size_mb,
        }
    }

    /// Picker key, unique across providers (`whisper:base`).
    pub fn key(&self) -> String {
        format!("{}:{}", self.provider.tag(), self.name)
    }
}

pub fn format_size(size_mb: u32) -> String {
    if size_mb >= 1024 {
        format!("{:.1} GB", size_mb as f64 / 1024.0)
    } else {
        format!("{} MB", size_mb)
    }
}

#[derive(Clone, Default)]
pub struct ModelInventory {
    catalogs: Vec<Arc<dyn ModelCatalog>>,
}

impl ModelInventory {
    /// Catalogs are queried concurrently but merged in the order given here.
    pub fn new(catalogs: Vec<Arc<dyn ModelCatalog>>) -> Self {
        Self { catalogs }
    }

    pub async fn fetch_options(&self) -> Vec<ModelOption> {
        let results = join_all(self.catalogs.iter().map(|catalog| async move {
            (catalog.provider(), catalog.list_models().await)
        }))
        .await;

        let mut options = Vec::new();
        for (provider, result) in results {
            match result {
                Ok(models) => {
                    let before = options.len();
                    options.extend(
                        models
                            .iter()
                            .filter(|m| m.is_available())
                            .map(|m| ModelOption::from_info(provider, m)),
                    );
                    info!(
                        "{} available {} model(s)",
                        options.len() - before,
                        provider.display_name()
                    );
                }
                Err(e) => {
                    warn!("Failed to fetch {} models: {}", provider.display_name(), e);
                }
            }
        }
        options
    }
}

/// Pick the globally configured model when it is available, otherwise the
/// first option in fetch order. An empty model name means the provider's
/// default model.
pub fn default_model<'a>(
    options: &'a [ModelOption],
    config: Option<&TranscriptConfig>,
) -> Option<&'a ModelOption> {
    if let Some(config) = config {
        let configured_provider = ModelProvider::from_tag(&config.provider);
        let model = match (config.model.trim(), configured_provider) {
            ("", Some(ModelProvider::Whisper)) => DEFAULT_WHISPER_MODEL,
            ("", Some(ModelProvider::Parakeet)) => DEFAULT_PARAKEET_MODEL,
            (name, _) => name,
        };
        let exact = options
            .iter()
            .find(|o| Some(o.provider) == configured_provider && o.name == model);
        if let Some(found) = exact.or_else(|| options.iter().find(|o| o.name == model)) {
            return Some(found);
        }
    }
    options.first()
}
