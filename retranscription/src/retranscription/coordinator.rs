// retranscription/coordinator.rs
//
// The retranscription state machine (idle -> processing -> complete | error)
// shared by every view. It owns the bus subscription for the active meeting,
// issues worker commands and turns worker events into state.

use super::commands::{CommandError, RetranscriptionCommands, StartRetranscriptionRequest};
use crate::events::{
    EventBus, RetranscriptionEvent, RetranscriptionProgress, RetranscriptionResult, Subscription,
};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetranscriptionStatus {
    #[default]
    Idle,
    Processing,
    Complete,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetranscriptionSnapshot {
    pub status: RetranscriptionStatus,
    pub progress: Option<RetranscriptionProgress>,
    pub error: Option<String>,
    pub result: Option<RetranscriptionResult>,
    /// Number of the latest start. Survives resets.
    pub generation: u64,
}

impl RetranscriptionSnapshot {
    fn idle(generation: u64) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn is_processing(&self) -> bool {
        self.status == RetranscriptionStatus::Processing
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartOptions {
    pub folder_path: String,
    pub language: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("No recording selected for retranscription")]
    Inactive,
    #[error(transparent)]
    Command(#[from] CommandError),
}

type CompleteCallback = Arc<dyn Fn(&RetranscriptionResult) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Caller hooks. Replacing them never touches the bus subscription.
#[derive(Clone, Default)]
pub struct CoordinatorCallbacks {
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl CoordinatorCallbacks {
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetranscriptionResult) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

enum Notification {
    Complete(RetranscriptionResult),
    Error(String),
}

struct ActiveJob {
    meeting_id: String,
    _subscription: Subscription,
}

struct CoordinatorInner {
    bus: EventBus,
    worker: Arc<dyn RetranscriptionCommands>,
    state: watch::Sender<RetranscriptionSnapshot>,
    callbacks: RwLock<CoordinatorCallbacks>,
    active: Mutex<Option<ActiveJob>>,
}

impl CoordinatorInner {
    fn handle_event(&self, event: &RetranscriptionEvent) {
        let mut notification = None;

        self.state.send_if_modified(|state| {
            if !state.is_processing() {
                debug!(
                    "Ignoring {} for meeting {}: no retranscription running",
                    event.name(),
                    event.meeting_id()
                );
                return false;
            }
            if let Some(generation) = event.generation() {
                if generation != state.generation {
                    debug!(
                        "Ignoring {} from stale run {} (current {})",
                        event.name(),
                        generation,
                        state.generation
                    );
                    return false;
                }
            }

            match event {
                RetranscriptionEvent::Progress(progress) => {
                    state.progress = Some(progress.clone());
                }
                RetranscriptionEvent::Complete(result) => {
                    info!(
                        "✅ Retranscription complete for {}: {} segments, {:.1}s",
                        result.meeting_id, result.segments_count, result.duration_seconds
                    );
                    state.status = RetranscriptionStatus::Complete;
                    state.progress = None;
                    state.error = None;
                    state.result = Some(result.clone());
                    notification = Some(Notification::Complete(result.clone()));
                }
                RetranscriptionEvent::Error(failure) => {
                    error!(
                        "Retranscription failed for {}: {}",
                        failure.meeting_id, failure.error
                    );
                    state.status = RetranscriptionStatus::Error;
                    state.error = Some(failure.error.clone());
                    notification = Some(Notification::Error(failure.error.clone()));
                }
            }
            true
        });

        // Callbacks run after the state update is visible to watchers.
        match notification {
            Some(Notification::Complete(result)) => {
                if let Some(callback) = self.callbacks().on_complete {
                    callback(&result);
                }
            }
            Some(Notification::Error(message)) => self.notify_error(&message),
            None => {}
        }
    }

    fn callbacks(&self) -> CoordinatorCallbacks {
        match self.callbacks.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn notify_error(&self, message: &str) {
        if let Some(callback) = self.callbacks().on_error {
            callback(message);
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cloneable handle; all clones drive the same job.
#[derive(Clone)]
pub struct RetranscriptionCoordinator {
    inner: Arc<CoordinatorInner>,
}

/// Non-owning handle, for callbacks that need to reach back into the
/// coordinator without keeping it alive.
#[derive(Clone)]
pub struct WeakCoordinator(Weak<CoordinatorInner>);

impl WeakCoordinator {
    pub fn upgrade(&self) -> Option<RetranscriptionCoordinator> {
        self.0
            .upgrade()
            .map(|inner| RetranscriptionCoordinator { inner })
    }
}

impl RetranscriptionCoordinator {
    pub fn new(bus: EventBus, worker: Arc<dyn RetranscriptionCommands>) -> Self {
        let (state, _) = watch::channel(RetranscriptionSnapshot::default());
        Self {
            inner: Arc::new(CoordinatorInner {
                bus,
                worker,
                state,
                callbacks: RwLock::new(CoordinatorCallbacks::default()),
                active: Mutex::new(None),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakCoordinator {
        WeakCoordinator(Arc::downgrade(&self.inner))
    }

    pub fn set_callbacks(&self, callbacks: CoordinatorCallbacks) {
        match self.inner.callbacks.write() {
            Ok(mut guard) => *guard = callbacks,
            Err(poisoned) => *poisoned.into_inner() = callbacks,
        }
    }

    /// Listen for events of `meeting_id`. Switching to another meeting drops
    /// the previous subscription and starts from a clean idle state.
    pub fn activate(&self, meeting_id: &str) {
        let mut active = self.inner.active();
        if matches!(active.as_ref(), Some(job) if job.meeting_id == meeting_id) {
            return;
        }

        if let Some(previous) = active.take() {
            info!(
                "Switching retranscription listener from {} to {}",
                previous.meeting_id, meeting_id
            );
        }

        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.bus.subscribe(meeting_id, move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(event);
            }
        });
        *active = Some(ActiveJob {
            meeting_id: meeting_id.to_string(),
            _subscription: subscription,
        });
        drop(active);

        self.reset();
    }

    pub fn deactivate(&self) {
        if let Some(job) = self.inner.active().take() {
            debug!("Stopped listening for retranscription of {}", job.meeting_id);
        }
    }

    pub fn meeting_id(&self) -> Option<String> {
        self.inner.active().as_ref().map(|job| job.meeting_id.clone())
    }

    pub fn snapshot(&self) -> RetranscriptionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<RetranscriptionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Clear error and progress, enter `Processing` and ask the worker to
    /// start. Returns once the worker acknowledged, not when the job is done.
    pub async fn start(&self, options: StartOptions) -> Result<(), CoordinatorError> {
        let meeting_id = self.meeting_id().ok_or(CoordinatorError::Inactive)?;

        let mut generation = 0;
        self.inner.state.send_modify(|state| {
            generation = state.generation + 1;
            *state = RetranscriptionSnapshot {
                status: RetranscriptionStatus::Processing,
                ..RetranscriptionSnapshot::idle(generation)
            };
        });

        info!(
            "Starting retranscription of {} (run {}, model: {:?}, provider: {:?}, language: {:?})",
            meeting_id, generation, options.model, options.provider, options.language
        );

        let request = StartRetranscriptionRequest {
            meeting_id: meeting_id.clone(),
            meeting_folder_path: options.folder_path,
            language: options.language,
            model: options.model,
            provider: options.provider,
            generation: Some(generation),
        };

        match self.inner.worker.start_retranscription(request).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Failed to start retranscription of {}: {}", meeting_id, e);
                let message = e.to_string();
                let applied = self.inner.state.send_if_modified(|state| {
                    if state.generation != generation || !state.is_processing() {
                        return false;
                    }
                    state.status = RetranscriptionStatus::Error;
                    state.error = Some(message.clone());
                    true
                });
                if applied {
                    self.inner.notify_error(&message);
                }
                Err(e.into())
            }
        }
    }

    /// Return to idle right away, then ask the worker to stop. Events that
    /// arrive afterwards for the cancelled run are ignored.
    pub async fn cancel(&self) {
        self.inner
            .state
            .send_modify(|state| *state = RetranscriptionSnapshot::idle(state.generation));

        match self.inner.worker.cancel_retranscription().await {
            Ok(()) => info!("Retranscription cancelled"),
            Err(e) => warn!("Failed to cancel retranscription: {}", e),
        }
    }

    /// Back to idle without contacting the worker.
    pub fn reset(&self) {
        self.inner
            .state
            .send_modify(|state| *state = RetranscriptionSnapshot::idle(state.generation));
    }
}
