// retranscription/commands.rs
//
// Commands issued to the transcription worker. Both are request/acknowledgment
// only; job results arrive later as events.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRetranscriptionRequest {
    pub meeting_id: String,
    pub meeting_folder_path: String,
    pub language: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    /// Echoed back on every event of this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Transcription worker unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Rejected(String),
    #[error("Worker transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait RetranscriptionCommands: Send + Sync {
    async fn start_retranscription(
        &self,
        request: StartRetranscriptionRequest,
    ) -> Result<(), CommandError>;

    async fn cancel_retranscription(&self) -> Result<(), CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_wire_format() {
        let request = StartRetranscriptionRequest {
            meeting_id: "m1".to_string(),
            meeting_folder_path: "/recordings/m1".to_string(),
            language: None,
            model: Some("base".to_string()),
            provider: Some("whisper".to_string()),
            generation: Some(1),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "meetingId": "m1",
                "meetingFolderPath": "/recordings/m1",
                "language": null,
                "model": "base",
                "provider": "whisper",
                "generation": 1
            })
        );
    }

    #[test]
    fn test_rejection_message_is_verbatim() {
        let err = CommandError::Rejected("Retranscription already in progress".to_string());
        assert_eq!(err.to_string(), "Retranscription already in progress");
    }
}
