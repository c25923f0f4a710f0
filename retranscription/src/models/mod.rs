// models/mod.rs
//
// Model inventory: per-provider catalogs and the merged picker list.

pub mod catalog;
pub mod inventory;
pub mod parakeet;
pub mod whisper;

pub use catalog::{CatalogError, ModelCatalog, ModelInfo, ModelProvider, ModelStatus};
pub use inventory::{default_model, format_size, ModelInventory, ModelOption};
pub use parakeet::ParakeetCatalog;
pub use whisper::WhisperCatalog;

use crate::config::AppConfig;
use std::sync::Arc;

/// Whisper first, then Parakeet: the order the picker lists them in.
pub fn inventory_from_config(config: &AppConfig) -> ModelInventory {
    ModelInventory::new(vec![
        Arc::new(WhisperCatalog::new(config.models_dir())) as Arc<dyn ModelCatalog>,
        Arc::new(ParakeetCatalog::new(config.parakeet_models_dir())),
    ])
}
