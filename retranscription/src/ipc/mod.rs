// ipc/mod.rs
//
// Wire protocol with the transcription worker: one JSON object per line.

pub mod client;

pub use client::SidecarClient;

use crate::retranscription::commands::StartRetranscriptionRequest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

// ============================================================================
// Protocol Messages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerRequest {
    StartRetranscription(StartRetranscriptionRequest),
    CancelRetranscription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Ack,
    Rejected { message: String },
    Event { event: String, payload: Value },
}

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error on worker connection: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid worker message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `message` followed by a newline and flush.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = serde_json::to_string(message)?;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Next message from `reader`, skipping blank lines. `None` on EOF.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, IpcError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut buffer = String::new();
    loop {
        buffer.clear();
        if reader.read_line(&mut buffer).await? == 0 {
            return Ok(None);
        }
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        return Ok(Some(serde_json::from_str(line)?));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    #[test]
    fn test_request_wire_format() {
        let start = WorkerRequest::StartRetranscription(StartRetranscriptionRequest {
            meeting_id: "m1".to_string(),
            meeting_folder_path: "/recordings/m1".to_string(),
            language: Some("en".to_string()),
            model: Some("base".to_string()),
            provider: Some("whisper".to_string()),
            generation: None,
        });
        assert_eq!(
            serde_json::to_value(&start).unwrap(),
            json!({
                "type": "start_retranscription",
                "meetingId": "m1",
                "meetingFolderPath": "/recordings/m1",
                "language": "en",
                "model": "base",
                "provider": "whisper"
            })
        );
        assert_eq!(
            serde_json::to_value(&WorkerRequest::CancelRetranscription).unwrap(),
            json!({"type": "cancel_retranscription"})
        );
    }

    #[test]
    fn test_worker_messages_decode() {
        let rejected: WorkerMessage =
            serde_json::from_str(r#"{"type":"rejected","message":"busy"}"#).unwrap();
        assert_eq!(
            rejected,
            WorkerMessage::Rejected {
                message: "busy".to_string()
            }
        );

        let event: WorkerMessage = serde_json::from_str(
            r#"{"type":"event","event":"retranscription-error","payload":{"meeting_id":"m1","error":"boom"}}"#,
        )
        .unwrap();
        match event {
            WorkerMessage::Event { event, payload } => {
                assert_eq!(event, "retranscription-error");
                assert_eq!(payload["error"], "boom");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_message_skips_blank_lines_until_eof() {
        let input: &[u8] = b"\n  \n{\"type\":\"ack\"}\n";
        let mut reader = BufReader::new(input);

        let first: Option<WorkerMessage> = read_message(&mut reader).await.unwrap();
        assert_eq!(first, Some(WorkerMessage::Ack));
        let eof: Option<WorkerMessage> = read_message(&mut reader).await.unwrap();
        assert_eq!(eof, None);
    }

    #[tokio::test]
    async fn test_write_message_is_newline_terminated() {
        let mut out = Vec::new();
        write_message(&mut out, &WorkerMessage::Ack).await.unwrap();
        assert_eq!(out, b"{\"type\":\"ack\"}\n");
    }
}
