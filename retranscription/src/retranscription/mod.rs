// retranscription/mod.rs
//
// Re-running transcription over a stored recording: worker commands, the
// shared coordinator and the dialog built on top of it.

pub mod commands;
pub mod coordinator;
pub mod dialog;
pub mod languages;

pub use commands::{CommandError, RetranscriptionCommands, StartRetranscriptionRequest};
pub use coordinator::{
    CoordinatorCallbacks, CoordinatorError, RetranscriptionCoordinator, RetranscriptionSnapshot,
    RetranscriptionStatus, StartOptions, WeakCoordinator,
};
pub use dialog::{CloseReason, DialogError, DialogView, RetranscriptionDialog, SelectionView};
pub use languages::{LanguageOption, AUTO_LANGUAGE, LANGUAGES};
