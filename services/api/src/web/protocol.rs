//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for live study-set generation.

use serde::{Deserialize, Serialize};
use study_set_core::domain::{QuestionRecord, StudySet};
use study_set_core::prompt::GenerationRequest;
use study_set_core::session::PreviewSnapshot;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Starts a generation. Only one generation runs per connection at a time.
    Generate { request: GenerationRequest },

    /// Stops the running generation. Nothing is saved.
    Cancel,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Everything recognised so far, in stream order.
    Preview {
        questions: Vec<QuestionRecord>,
        metadata_known: bool,
    },

    /// The generation finalized and was stored.
    Saved { study_set: StudySet },

    /// Reports an error to the client.
    Error { message: String },
}

impl From<&PreviewSnapshot> for ServerMessage {
    fn from(snapshot: &PreviewSnapshot) -> Self {
        ServerMessage::Preview {
            questions: snapshot.questions.clone(),
            metadata_known: snapshot.metadata_known,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use study_set_core::domain::StudySetKind;
    use study_set_core::prompt::GenerationSource;

    #[test]
    fn generate_message_carries_a_nested_request() {
        let raw = json!({
            "type": "generate",
            "request": {
                "type": "quiz",
                "source": "topic",
                "subject": "Biology",
                "topic": "Cells",
                "grade_level": "9",
                "quantity": 10
            }
        });
        let ClientMessage::Generate { request } = serde_json::from_value(raw).unwrap() else {
            panic!("expected a generate message");
        };
        assert_eq!(request.kind, StudySetKind::Quiz);
        assert_eq!(request.quantity, 10);
        assert!(matches!(request.source, GenerationSource::Topic { ref topic, .. } if topic == "Cells"));
    }

    #[test]
    fn cancel_and_unknown_messages() {
        let cancel: ClientMessage = serde_json::from_str(r#"{"type":"cancel"}"#).unwrap();
        assert!(matches!(cancel, ClientMessage::Cancel));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"pause"}"#).is_err());
    }

    #[test]
    fn preview_serialises_with_its_tag() {
        let snapshot = PreviewSnapshot {
            questions: vec![QuestionRecord::flashcard("Q", "A")],
            metadata_known: false,
        };
        let value = serde_json::to_value(ServerMessage::from(&snapshot)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "preview",
                "questions": [{"question": "Q", "answer": "A"}],
                "metadata_known": false
            })
        );

        let value = serde_json::to_value(ServerMessage::Error { message: "boom".into() }).unwrap();
        assert_eq!(value, json!({"type": "error", "message": "boom"}));
    }
}
