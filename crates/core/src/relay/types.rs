use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message a live session sends for the document it joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    NoteUpdate { content: serde_json::Value },
    CursorMove { position: serde_json::Value },
}

/// Message fanned out to the other sessions on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayEvent {
    #[serde(rename_all = "camelCase")]
    NoteUpdated {
        account_id: String,
        content: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    CursorMoved {
        account_id: String,
        position: serde_json::Value,
    },
}

impl RelayEvent {
    pub fn from_client(account_id: &str, event: ClientEvent) -> Self {
        match event {
            ClientEvent::NoteUpdate { content } => RelayEvent::NoteUpdated {
                account_id: account_id.to_string(),
                content,
            },
            ClientEvent::CursorMove { position } => RelayEvent::CursorMoved {
                account_id: account_id.to_string(),
                position,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelayEnvelope {
    pub document_id: String,
    /// Sending session; it does not receive its own events back.
    pub session_id: Uuid,
    pub event: RelayEvent,
}
