// End-to-end flows: dialog -> coordinator -> worker connection -> bus.

use std::sync::Arc;

use async_trait::async_trait;
use retranscription::config::AppConfig;
use retranscription::events::{EventBus, RetranscriptionEvent, RetranscriptionResult};
use retranscription::ipc::SidecarClient;
use retranscription::models::{
    inventory_from_config, CatalogError, ModelCatalog, ModelInfo, ModelInventory, ModelProvider,
    ModelStatus,
};
use retranscription::retranscription::{
    CommandError, DialogError, DialogView, RetranscriptionCommands, RetranscriptionCoordinator,
    RetranscriptionDialog, RetranscriptionStatus, StartRetranscriptionRequest,
};
use serde_json::{json, Value};
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Notify};

struct InstalledWhisper;

#[async_trait]
impl ModelCatalog for InstalledWhisper {
    fn provider(&self) -> ModelProvider {
        ModelProvider::Whisper
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, CatalogError> {
        Ok(vec![ModelInfo {
            name: "base".to_string(),
            path: "ggml-base.bin".into(),
            size_mb: 500,
            status: ModelStatus::Available,
            description: String::new(),
        }])
    }
}

fn whisper_inventory() -> ModelInventory {
    ModelInventory::new(vec![Arc::new(InstalledWhisper) as Arc<dyn ModelCatalog>])
}

fn worker_line(value: Value) -> String {
    format!("{}\n", value)
}

#[tokio::test]
async fn completed_run_closes_dialog_and_reports_result() {
    let bus = EventBus::new();
    let (_progress_sub, mut seen) = bus.subscribe_channel("m1");
    let (client_io, worker_io) = duplex(64 * 1024);
    let client = Arc::new(SidecarClient::new(client_io, bus.clone()));

    let worker = tokio::spawn(async move {
        let (read_half, mut write_half) = tokio::io::split(worker_io);
        let mut lines = BufReader::new(read_half).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let request: Value = serde_json::from_str(&line).unwrap();
        let generation = request["generation"].clone();

        let replies = [
            json!({"type": "ack"}),
            json!({
                "type": "event",
                "event": "retranscription-progress",
                "payload": {
                    "meeting_id": "m1",
                    "stage": "transcribing",
                    "progress_percentage": 40,
                    "message": "Transcribing audio",
                    "generation": generation
                }
            }),
            json!({
                "type": "event",
                "event": "retranscription-complete",
                "payload": {
                    "meeting_id": "m1",
                    "segments_count": 12,
                    "duration_seconds": 93.5,
                    "language": "en",
                    "generation": generation
                }
            }),
        ];
        for reply in replies {
            write_half
                .write_all(worker_line(reply).as_bytes())
                .await
                .unwrap();
        }
        // Keep the connection open until the client hangs up
        let _ = lines.next_line().await;
        request
    });

    let coordinator = RetranscriptionCoordinator::new(bus.clone(), client.clone());
    let dialog = RetranscriptionDialog::new(coordinator.clone(), whisper_inventory(), None);

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    dialog
        .open(
            "m1",
            "/recordings/m1",
            Some(move |result: &RetranscriptionResult| {
                let _ = done_tx.send(result.clone());
            }),
        )
        .await;
    dialog.start().await.unwrap();

    let result = done_rx.recv().await.unwrap();
    assert_eq!(result.segments_count, 12);
    assert_eq!(result.language.as_deref(), Some("en"));

    match seen.recv().await {
        Some(RetranscriptionEvent::Progress(progress)) => assert_eq!(progress.percent(), 40),
        other => panic!("expected progress first, got {:?}", other),
    }

    assert!(!dialog.is_open());
    assert_eq!(dialog.view(), DialogView::Closed);
    assert_eq!(coordinator.snapshot().status, RetranscriptionStatus::Complete);
    assert_eq!(coordinator.meeting_id(), None);

    client.shutdown().await;
    drop(client);
    drop(coordinator);
    drop(dialog);
    let request = worker.await.unwrap();
    assert_eq!(request["type"], "start_retranscription");
    assert_eq!(request["meetingId"], "m1");
    assert_eq!(request["meetingFolderPath"], "/recordings/m1");
    assert_eq!(request["model"], "base");
    assert_eq!(request["provider"], "whisper");
    assert_eq!(request["language"], Value::Null);
}

/// Acknowledges starts right away but holds every cancel until released.
#[derive(Default)]
struct SlowCancelWorker {
    release: Notify,
}

#[async_trait]
impl RetranscriptionCommands for SlowCancelWorker {
    async fn start_retranscription(
        &self,
        _request: StartRetranscriptionRequest,
    ) -> Result<(), CommandError> {
        Ok(())
    }

    async fn cancel_retranscription(&self) -> Result<(), CommandError> {
        self.release.notified().await;
        Err(CommandError::Rejected("nothing to cancel".to_string()))
    }
}

#[tokio::test]
async fn cancel_resets_before_worker_answers() {
    let bus = EventBus::new();
    let worker = Arc::new(SlowCancelWorker::default());
    let coordinator = RetranscriptionCoordinator::new(bus.clone(), worker.clone());
    coordinator.activate("m1");
    coordinator
        .start(retranscription::retranscription::StartOptions {
            folder_path: "/recordings/m1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let generation = coordinator.snapshot().generation;

    let cancelling = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.cancel().await })
    };
    tokio::task::yield_now().await;
    assert_eq!(coordinator.snapshot().status, RetranscriptionStatus::Idle);

    // Late event of the cancelled run
    bus.publish_named(
        "retranscription-progress",
        json!({
            "meeting_id": "m1",
            "stage": "transcribing",
            "progress_percentage": 80,
            "message": "still going",
            "generation": generation
        }),
    )
    .unwrap();
    assert_eq!(coordinator.snapshot().status, RetranscriptionStatus::Idle);
    assert!(coordinator.snapshot().progress.is_none());

    // A failed cancel leaves the idle state alone
    worker.release.notify_one();
    cancelling.await.unwrap();
    assert_eq!(coordinator.snapshot().status, RetranscriptionStatus::Idle);
}

#[tokio::test]
async fn no_installed_models_leaves_picker_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        models_dir: Some(dir.path().join("missing")),
        ..AppConfig::default()
    };

    let worker = Arc::new(SlowCancelWorker::default());
    let coordinator = RetranscriptionCoordinator::new(EventBus::new(), worker);
    let dialog = RetranscriptionDialog::new(
        coordinator,
        inventory_from_config(&config),
        Some(config.transcript.clone()),
    );
    dialog
        .open("m1", "/recordings/m1", None::<fn(&RetranscriptionResult)>)
        .await;

    match dialog.view() {
        DialogView::Selecting(view) => {
            assert!(!view.loading_models);
            assert!(view.models.is_empty());
            assert!(!view.can_start);
        }
        other => panic!("unexpected view {:?}", other),
    }
    assert!(matches!(
        dialog.start().await,
        Err(DialogError::NoModelSelected)
    ));
}
