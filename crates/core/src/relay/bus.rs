use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use super::types::{RelayEnvelope, RelayEvent};

/// In-process fan-out of live document events backed by `tokio::broadcast`.
/// Single-node, nothing is persisted.
#[derive(Debug, Clone)]
pub struct RelayBus {
    sender: Arc<broadcast::Sender<RelayEnvelope>>,
}

impl RelayBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish to every session joined to the envelope's document. Returns the
    /// number of receivers, zero when nobody is listening.
    pub fn publish(&self, envelope: RelayEnvelope) -> usize {
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Join `session_id` to `document_id`.
    pub fn subscribe(&self, document_id: &str, session_id: Uuid) -> RelaySubscription {
        RelaySubscription {
            document_id: document_id.to_string(),
            session_id,
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of joined sessions across all documents.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RelayBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

pub struct RelaySubscription {
    document_id: String,
    session_id: Uuid,
    receiver: broadcast::Receiver<RelayEnvelope>,
}

impl RelaySubscription {
    /// Next event from another session on the same document. `None` once the
    /// bus is gone.
    pub async fn next(&mut self) -> Option<RelayEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => {
                    if envelope.document_id == self.document_id
                        && envelope.session_id != self.session_id
                    {
                        return Some(envelope.event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(document_id = %self.document_id, skipped, "live session lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn update(document_id: &str, session_id: Uuid, content: &str) -> RelayEnvelope {
        RelayEnvelope {
            document_id: document_id.to_string(),
            session_id,
            event: RelayEvent::NoteUpdated {
                account_id: "u1".to_string(),
                content: json!(content),
            },
        }
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = RelayBus::new(16);
        let mut sub = bus.subscribe("d1", Uuid::new_v4());

        bus.publish(update("d1", Uuid::new_v4(), "hello"));

        let event = sub.next().await.unwrap();
        assert!(matches!(event, RelayEvent::NoteUpdated { content, .. } if content == json!("hello")));
    }

    #[tokio::test]
    async fn skips_own_session_and_other_documents() {
        let bus = RelayBus::new(16);
        let me = Uuid::new_v4();
        let mut sub = bus.subscribe("d1", me);
        let mut other = bus.subscribe("d1", Uuid::new_v4());

        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(update("d1", me, "mine"));
        bus.publish(update("d2", Uuid::new_v4(), "elsewhere"));
        bus.publish(update("d1", Uuid::new_v4(), "theirs"));

        let event = sub.next().await.unwrap();
        assert!(matches!(event, RelayEvent::NoteUpdated { content, .. } if content == json!("theirs")));

        let event = other.next().await.unwrap();
        assert!(matches!(event, RelayEvent::NoteUpdated { content, .. } if content == json!("mine")));
    }

    #[test]
    fn publish_without_listeners_is_not_an_error() {
        let bus = RelayBus::default();
        assert_eq!(bus.publish(update("d1", Uuid::new_v4(), "x")), 0);
    }
}
