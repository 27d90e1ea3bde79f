use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use notehub_core::permission::AccessLevel;
use notehub_core::relay::{ClientEvent, RelayEnvelope, RelayEvent};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Join the caller's session to a document's live channel. Requires read
/// access; edits are only relayed for writers.
pub async fn join(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let note = state.hub().documents.authorize(&id, &user.account_id).await?;
    let level = note.level;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, id, user.account_id, level)))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    document_id: String,
    account_id: String,
    level: AccessLevel,
) {
    let session_id = Uuid::new_v4();
    let relay = state.relay().clone();
    let mut subscription = relay.subscribe(&document_id, session_id);
    let (mut sender, mut receiver) = socket.split();
    tracing::info!(%document_id, %account_id, %session_id, "live session joined");

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else { break };
                let Ok(json) = serde_json::to_string(&event) else { continue };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let event = match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::debug!(%session_id, error = %err, "ignoring malformed live message");
                        continue;
                    }
                };
                if matches!(event, ClientEvent::NoteUpdate { .. }) && !level.can_write() {
                    tracing::debug!(%session_id, %account_id, "dropping edit from read-only session");
                    continue;
                }
                relay.publish(RelayEnvelope {
                    document_id: document_id.clone(),
                    session_id,
                    event: RelayEvent::from_client(&account_id, event),
                });
            }
        }
    }

    tracing::info!(%document_id, %account_id, %session_id, "live session left");
}
