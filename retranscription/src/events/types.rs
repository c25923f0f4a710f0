// events/types.rs
//
// Payloads and names of the three retranscription events published by the
// transcription worker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const PROGRESS_EVENT: &str = "retranscription-progress";
pub const COMPLETE_EVENT: &str = "retranscription-complete";
pub const ERROR_EVENT: &str = "retranscription-error";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Unknown retranscription event '{0}'")]
    UnknownEvent(String),
    #[error("Malformed '{event}' payload: {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Progress update for a running retranscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetranscriptionProgress {
    pub meeting_id: String,
    pub stage: String,
    pub progress_percentage: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

impl RetranscriptionProgress {
    /// Percentage clamped to 0..=100 for display.
    pub fn percent(&self) -> u8 {
        self.progress_percentage.min(100) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetranscriptionResult {
    pub meeting_id: String,
    pub segments_count: usize,
    pub duration_seconds: f64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetranscriptionFailure {
    pub meeting_id: String,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetranscriptionEvent {
    Progress(RetranscriptionProgress),
    Complete(RetranscriptionResult),
    Error(RetranscriptionFailure),
}

impl RetranscriptionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progress(_) => PROGRESS_EVENT,
            Self::Complete(_) => COMPLETE_EVENT,
            Self::Error(_) => ERROR_EVENT,
        }
    }

    pub fn meeting_id(&self) -> &str {
        match self {
            Self::Progress(p) => &p.meeting_id,
            Self::Complete(r) => &r.meeting_id,
            Self::Error(e) => &e.meeting_id,
        }
    }

    /// Start generation the worker echoed back, if it did.
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Progress(p) => p.generation,
            Self::Complete(r) => r.generation,
            Self::Error(e) => e.generation,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }

    /// Decode an event received under its transport name.
    pub fn from_named(name: &str, payload: Value) -> Result<Self, EventError> {
        let malformed = |source| EventError::MalformedPayload {
            event: name.to_string(),
            source,
        };

        match name {
            PROGRESS_EVENT => serde_json::from_value(payload)
                .map(Self::Progress)
                .map_err(malformed),
            COMPLETE_EVENT => serde_json::from_value(payload)
                .map(Self::Complete)
                .map_err(malformed),
            ERROR_EVENT => serde_json::from_value(payload)
                .map(Self::Error)
                .map_err(malformed),
            other => Err(EventError::UnknownEvent(other.to_string())),
        }
    }

    /// Encode into `(name, payload)` for a transport.
    pub fn to_payload(&self) -> Result<(&'static str, Value), serde_json::Error> {
        let payload = match self {
            Self::Progress(p) => serde_json::to_value(p)?,
            Self::Complete(r) => serde_json::to_value(r)?,
            Self::Error(e) => serde_json::to_value(e)?,
        };
        Ok((self.name(), payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_progress_without_generation() {
        let event = RetranscriptionEvent::from_named(
            PROGRESS_EVENT,
            json!({
                "meeting_id": "m1",
                "stage": "transcribing",
                "progress_percentage": 40,
                "message": "Transcribing segment 4 of 10"
            }),
        )
        .unwrap();

        assert_eq!(event.meeting_id(), "m1");
        assert_eq!(event.generation(), None);
        assert!(!event.is_terminal());
        match event {
            RetranscriptionEvent::Progress(p) => assert_eq!(p.percent(), 40),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_complete_with_null_language() {
        let event = RetranscriptionEvent::from_named(
            COMPLETE_EVENT,
            json!({
                "meeting_id": "m1",
                "segments_count": 12,
                "duration_seconds": 93.5,
                "language": null,
                "generation": 3
            }),
        )
        .unwrap();

        assert!(event.is_terminal());
        assert_eq!(event.generation(), Some(3));
        match event {
            RetranscriptionEvent::Complete(r) => {
                assert_eq!(r.segments_count, 12);
                assert_eq!(r.language, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_name() {
        let err = RetranscriptionEvent::from_named("transcript-update", json!({})).unwrap_err();
        assert!(matches!(err, EventError::UnknownEvent(name) if name == "transcript-update"));
    }

    #[test]
    fn test_malformed_payload() {
        let err = RetranscriptionEvent::from_named(ERROR_EVENT, json!({ "meeting_id": "m1" }))
            .unwrap_err();
        assert!(matches!(err, EventError::MalformedPayload { .. }));
    }

    #[test]
    fn test_percent_is_clamped() {
        let progress = RetranscriptionProgress {
            meeting_id: "m1".to_string(),
            stage: "saving".to_string(),
            progress_percentage: 140,
            message: String::new(),
            generation: None,
        };
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_to_payload_uses_event_name() {
        let event = RetranscriptionEvent::Error(RetranscriptionFailure {
            meeting_id: "m2".to_string(),
            error: "No audio file found".to_string(),
            generation: None,
        });
        let (name, payload) = event.to_payload().unwrap();
        assert_eq!(name, ERROR_EVENT);
        assert_eq!(payload["error"], "No audio file found");
        assert!(payload.get("generation").is_none());
    }
}
