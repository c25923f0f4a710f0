// ipc/client.rs
//
// Command client for a transcription worker reached over a byte stream.
// Requests are acknowledged in the order they were sent; everything else the
// worker writes is an event and goes straight onto the bus.

use super::{read_message, write_message, IpcError, WorkerMessage, WorkerRequest};
use crate::events::EventBus;
use crate::retranscription::commands::{
    CommandError, RetranscriptionCommands, StartRetranscriptionRequest,
};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type AckSender = oneshot::Sender<Result<(), CommandError>>;

#[derive(Default)]
struct PendingAcks {
    closed: bool,
    queue: VecDeque<AckSender>,
}

fn lock(pending: &Mutex<PendingAcks>) -> MutexGuard<'_, PendingAcks> {
    pending
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fail every waiting request and refuse new ones.
fn close_pending(pending: &Mutex<PendingAcks>, reason: &str) {
    let waiting = {
        let mut pending = lock(pending);
        pending.closed = true;
        std::mem::take(&mut pending.queue)
    };
    if !waiting.is_empty() {
        warn!("Failing {} pending worker request(s): {}", waiting.len(), reason);
    }
    for sender in waiting {
        let _ = sender.send(Err(CommandError::Unavailable(reason.to_string())));
    }
}

pub struct SidecarClient {
    writer: tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    pending: Arc<Mutex<PendingAcks>>,
    shutdown: CancellationToken,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl SidecarClient {
    /// Take over `stream` and start the reader task. Must be called inside a
    /// tokio runtime.
    pub fn new<S>(stream: S, bus: EventBus) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let pending = Arc::new(Mutex::new(PendingAcks::default()));
        let shutdown = CancellationToken::new();

        let reader_task = tokio::spawn(read_loop(
            BufReader::new(read_half),
            bus,
            pending.clone(),
            shutdown.clone(),
        ));

        Self {
            writer: tokio::sync::Mutex::new(Box::new(write_half)),
            pending,
            shutdown,
            reader_task: Mutex::new(Some(reader_task)),
        }
    }

    #[cfg(unix)]
    pub async fn connect_unix(
        path: impl AsRef<std::path::Path>,
        bus: EventBus,
    ) -> Result<Self, IpcError> {
        let path = path.as_ref();
        let stream = tokio::net::UnixStream::connect(path).await?;
        info!("Connected to transcription worker at {}", path.display());
        Ok(Self::new(stream, bus))
    }

    pub fn is_connected(&self) -> bool {
        !lock(&self.pending).closed
    }

    /// Stop the reader task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self
            .reader_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Worker reader task ended abnormally: {}", e);
            }
        }
    }

    async fn send(&self, request: WorkerRequest) -> Result<(), CommandError> {
        let (tx, rx) = oneshot::channel();
        {
            // Queue and write under the writer lock so acks stay in send order
            let mut writer = self.writer.lock().await;
            {
                let mut pending = lock(&self.pending);
                if pending.closed {
                    return Err(CommandError::Unavailable(
                        "worker connection is closed".to_string(),
                    ));
                }
                pending.queue.push_back(tx);
            }

            if let Err(e) = write_message(&mut *writer, &request).await {
                error!("Failed to send request to transcription worker: {}", e);
                close_pending(&self.pending, "write to worker failed");
                return Err(CommandError::Transport(e.to_string()));
            }
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(CommandError::Unavailable(
                "worker connection dropped".to_string(),
            )),
        }
    }
}

impl Drop for SidecarClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl RetranscriptionCommands for SidecarClient {
    async fn start_retranscription(
        &self,
        request: StartRetranscriptionRequest,
    ) -> Result<(), CommandError> {
        self.send(WorkerRequest::StartRetranscription(request)).await
    }

    async fn cancel_retranscription(&self) -> Result<(), CommandError> {
        self.send(WorkerRequest::CancelRetranscription).await
    }
}

async fn read_loop<R>(
    mut reader: R,
    bus: EventBus,
    pending: Arc<Mutex<PendingAcks>>,
    shutdown: CancellationToken,
) where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let reason = loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break "client shut down",
            message = read_message::<_, WorkerMessage>(&mut reader) => message,
        };

        match message {
            Ok(Some(WorkerMessage::Ack)) => resolve(&pending, Ok(())),
            Ok(Some(WorkerMessage::Rejected { message })) => {
                resolve(&pending, Err(CommandError::Rejected(message)))
            }
            Ok(Some(WorkerMessage::Event { event, payload })) => {
                if let Ok(delivered) = bus.publish_named(&event, payload) {
                    debug!("{} delivered to {} listener(s)", event, delivered);
                }
            }
            Ok(None) => {
                info!("Transcription worker closed the connection");
                break "worker closed the connection";
            }
            Err(IpcError::Json(e)) => {
                warn!("Skipping malformed worker message: {}", e);
            }
            Err(e) => {
                error!("Lost connection to transcription worker: {}", e);
                break "worker connection failed";
            }
        }
    };

    close_pending(&pending, reason);
}

fn resolve(pending: &Mutex<PendingAcks>, result: Result<(), CommandError>) {
    match lock(pending).queue.pop_front() {
        Some(sender) => {
            let _ = sender.send(result);
        }
        None => warn!("Worker acknowledged a request that was never sent"),
    }
}
