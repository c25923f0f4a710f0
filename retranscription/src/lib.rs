pub mod config;
pub mod events;
pub mod ipc;
pub mod models;
pub mod retranscription;

pub use config::{AppConfig, TranscriptConfig};
pub use events::{EventBus, RetranscriptionEvent};
pub use models::{inventory_from_config, ModelInventory, ModelOption};
pub use retranscription::{RetranscriptionCoordinator, RetranscriptionDialog};
