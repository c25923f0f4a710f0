// retranscription/dialog.rs
//
// View-model of the retranscribe dialog: model and language pickers, close
// policy and what to render for each coordinator state. All job state comes
// from the coordinator; the dialog never listens to the bus itself.

use super::coordinator::{
    CoordinatorCallbacks, CoordinatorError, RetranscriptionCoordinator, RetranscriptionStatus,
    StartOptions,
};
use super::languages::{self, LanguageOption, AUTO_LANGUAGE, LANGUAGES};
use crate::config::TranscriptConfig;
use crate::events::RetranscriptionResult;
use crate::models::{default_model, ModelInventory, ModelOption};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

type DialogCompleteCallback = Arc<dyn Fn(&RetranscriptionResult) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Escape,
    OutsideClick,
    CloseButton,
}

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("Retranscribe dialog is not open")]
    NotOpen,
    #[error("Select a model before starting")]
    NoModelSelected,
    #[error("A retranscription is already running")]
    AlreadyProcessing,
    #[error(transparent)]
    Start(#[from] CoordinatorError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionView {
    pub loading_models: bool,
    pub models: Vec<ModelOption>,
    pub selected_model: Option<ModelOption>,
    pub languages: &'static [LanguageOption],
    pub selected_language: String,
    pub language_selectable: bool,
    pub can_start: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogView {
    Closed,
    Selecting(SelectionView),
    Processing {
        stage: String,
        percent: u8,
        message: String,
    },
    Complete {
        segments_count: usize,
        duration_seconds: f64,
        language: Option<String>,
    },
    Failed {
        error: String,
    },
}

struct DialogState {
    open: bool,
    meeting_id: Option<String>,
    folder_path: String,
    loading_models: bool,
    models: Vec<ModelOption>,
    selected_model: Option<String>,
    selected_language: String,
    on_complete: Option<DialogCompleteCallback>,
}

impl Default for DialogState {
    fn default() -> Self {
        Self {
            open: false,
            meeting_id: None,
            folder_path: String::new(),
            loading_models: false,
            models: Vec::new(),
            selected_model: None,
            selected_language: AUTO_LANGUAGE.to_string(),
            on_complete: None,
        }
    }
}

impl DialogState {
    fn selected_option(&self) -> Option<&ModelOption> {
        let key = self.selected_model.as_deref()?;
        self.models.iter().find(|m| m.key() == key)
    }

    fn language_selectable(&self) -> bool {
        self.selected_option()
            .map_or(true, |m| m.provider.supports_language_selection())
    }
}

fn lock(state: &Mutex<DialogState>) -> MutexGuard<'_, DialogState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct RetranscriptionDialog {
    coordinator: RetranscriptionCoordinator,
    inventory: ModelInventory,
    transcript_config: Option<TranscriptConfig>,
    state: Arc<Mutex<DialogState>>,
}

impl RetranscriptionDialog {
    pub fn new(
        coordinator: RetranscriptionCoordinator,
        inventory: ModelInventory,
        transcript_config: Option<TranscriptConfig>,
    ) -> Self {
        let state = Arc::new(Mutex::new(DialogState::default()));

        let completion_state = state.clone();
        let weak_coordinator = coordinator.downgrade();
        coordinator.set_callbacks(
            CoordinatorCallbacks::default()
                .on_complete(move |result| {
                    // Auto-close, then hand the result to whoever opened us
                    let callback = {
                        let mut state = lock(&completion_state);
                        state.open = false;
                        state.on_complete.take()
                    };
                    if let Some(coordinator) = weak_coordinator.upgrade() {
                        coordinator.deactivate();
                    }
                    if let Some(callback) = callback {
                        callback(result);
                    }
                })
                .on_error(|error| warn!("Retranscription dialog showing error: {}", error)),
        );

        Self {
            coordinator,
            inventory,
            transcript_config,
            state,
        }
    }

    /// Open for `meeting_id`, then load the model list and preselect the
    /// configured model.
    pub async fn open<F>(&self, meeting_id: &str, folder_path: &str, on_complete: Option<F>)
    where
        F: Fn(&RetranscriptionResult) + Send + Sync + 'static,
    {
        {
            let mut state = lock(&self.state);
            *state = DialogState {
                open: true,
                meeting_id: Some(meeting_id.to_string()),
                folder_path: folder_path.to_string(),
                loading_models: true,
                on_complete: on_complete.map(|f| Arc::new(f) as DialogCompleteCallback),
                ..DialogState::default()
            };
        }
        self.coordinator.activate(meeting_id);
        info!("Opened retranscribe dialog for {}", meeting_id);

        let models = self.inventory.fetch_options().await;
        let default_key =
            default_model(&models, self.transcript_config.as_ref()).map(|m| m.key());

        let mut state = lock(&self.state);
        if !state.open || state.meeting_id.as_deref() != Some(meeting_id) {
            debug!("Dialog closed or retargeted while models were loading");
            return;
        }
        state.models = models;
        state.loading_models = false;
        state.selected_model = default_key;
        if !state.language_selectable() {
            state.selected_language = AUTO_LANGUAGE.to_string();
        }
    }

    pub fn is_open(&self) -> bool {
        lock(&self.state).open
    }

    pub fn selected_model(&self) -> Option<ModelOption> {
        lock(&self.state).selected_option().cloned()
    }

    pub fn selected_language(&self) -> String {
        lock(&self.state).selected_language.clone()
    }

    /// Returns false for keys not in the model list.
    pub fn select_model(&self, key: &str) -> bool {
        let mut state = lock(&self.state);
        let Some(option) = state.models.iter().find(|m| m.key() == key).cloned() else {
            warn!("Unknown model selection '{}'", key);
            return false;
        };

        state.selected_model = Some(key.to_string());
        if !option.provider.supports_language_selection() {
            state.selected_language = AUTO_LANGUAGE.to_string();
        }
        true
    }

    /// Returns false when the code is unknown or the selected provider has no
    /// language choice.
    pub fn select_language(&self, code: &str) -> bool {
        if !languages::is_supported(code) {
            warn!("Unsupported language '{}'", code);
            return false;
        }
        let mut state = lock(&self.state);
        if !state.language_selectable() {
            return false;
        }
        state.selected_language = code.to_string();
        true
    }

    pub async fn start(&self) -> Result<(), DialogError> {
        let options = {
            let state = lock(&self.state);
            if !state.open {
                return Err(DialogError::NotOpen);
            }
            if self.coordinator.snapshot().is_processing() {
                return Err(DialogError::AlreadyProcessing);
            }
            let model = state
                .selected_option()
                .ok_or(DialogError::NoModelSelected)?;
            let language = if model.provider.supports_language_selection() {
                languages::request_language(&state.selected_language)
            } else {
                None
            };
            StartOptions {
                folder_path: state.folder_path.clone(),
                language,
                model: Some(model.name.clone()),
                provider: Some(model.provider.tag().to_string()),
            }
        };

        self.coordinator.start(options).await?;
        Ok(())
    }

    /// Close, then stop the running job if there was one. The dialog is
    /// already closed while the worker's answer is pending.
    pub async fn cancel(&self) {
        let was_processing = self.coordinator.snapshot().is_processing();
        self.close();
        if was_processing {
            self.coordinator.cancel().await;
        }
    }

    /// Escape, outside clicks and the close button are all refused while a
    /// job is running.
    pub fn request_close(&self, reason: CloseReason) -> bool {
        if self.coordinator.snapshot().is_processing() {
            debug!("Ignoring {:?} while retranscription is running", reason);
            return false;
        }
        self.close();
        true
    }

    /// Leave the error screen and return to model selection.
    pub fn retry(&self) {
        if self.coordinator.snapshot().status == RetranscriptionStatus::Error {
            self.coordinator.reset();
        }
    }

    fn close(&self) {
        {
            let mut state = lock(&self.state);
            state.open = false;
            state.on_complete = None;
        }
        self.coordinator.deactivate();
    }

    pub fn view(&self) -> DialogView {
        let state = lock(&self.state);
        if !state.open {
            return DialogView::Closed;
        }

        let snapshot = self.coordinator.snapshot();
        match snapshot.status {
            RetranscriptionStatus::Idle => {
                let selected_model = state.selected_option().cloned();
                DialogView::Selecting(SelectionView {
                    loading_models: state.loading_models,
                    can_start: selected_model.is_some() && !state.loading_models,
                    models: state.models.clone(),
                    selected_model,
                    languages: LANGUAGES,
                    selected_language: state.selected_language.clone(),
                    language_selectable: state.language_selectable(),
                })
            }
            RetranscriptionStatus::Processing => match snapshot.progress {
                Some(progress) => DialogView::Processing {
                    percent: progress.percent(),
                    stage: progress.stage,
                    message: progress.message,
                },
                None => DialogView::Processing {
                    stage: "starting".to_string(),
                    percent: 0,
                    message: "Starting retranscription...".to_string(),
                },
            },
            RetranscriptionStatus::Complete => match snapshot.result {
                Some(result) => DialogView::Complete {
                    segments_count: result.segments_count,
                    duration_seconds: result.duration_seconds,
                    language: result.language,
                },
                None => DialogView::Complete {
                    segments_count: 0,
                    duration_seconds: 0.0,
                    language: None,
                },
            },
            RetranscriptionStatus::Error => DialogView::Failed {
                error: snapshot
                    .error
                    .unwrap_or_else(|| "Retranscription failed".to_string()),
            },
        }
    }
}
