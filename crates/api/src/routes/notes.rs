use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use notehub_core::account::Account;
use notehub_core::document::{
    Document, DocumentListing, DocumentPatch, EffectiveDocument, NewDocument,
};
use notehub_core::sharing::{Collaborator, CollaboratorListing};
use notehub_core::version::{Version, VersionEntry};
use serde::{Deserialize, Serialize};

use super::live;
use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notes", get(list_notes).post(create_note))
        .route(
            "/api/notes/{id}",
            get(get_note).put(update_note).delete(archive_note),
        )
        .route("/api/notes/{id}/permanent", delete(delete_note))
        .route("/api/notes/{id}/share", post(share_note))
        .route("/api/notes/{id}/share/{account_id}", delete(revoke_share))
        .route("/api/notes/{id}/collaborators", get(list_collaborators))
        .route("/api/notes/{id}/versions", get(list_versions))
        .route("/api/notes/{id}/versions/{number}", get(get_version))
        .route("/api/notes/{id}/live", get(live::join))
}

async fn list_notes(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<DocumentListing>> {
    let listing = state.hub().documents.list_for_account(&user.account_id).await?;
    Ok(Json(listing))
}

async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    Json(data): Json<NewDocument>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let doc = state.hub().documents.create(&user.account_id, data).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

#[derive(Debug, Serialize)]
struct NoteDetail {
    #[serde(flatten)]
    note: EffectiveDocument,
    owner: Collaborator,
    collaborators: Vec<Collaborator>,
}

/// The document, the caller's level and everyone with access.
async fn get_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<NoteDetail>> {
    let hub = state.hub();
    let note = hub.documents.authorize(&id, &user.account_id).await?;
    let CollaboratorListing {
        owner,
        collaborators,
    } = hub.sharing.list_collaborators(&id, &user.account_id).await?;

    Ok(Json(NoteDetail {
        note,
        owner,
        collaborators,
    }))
}

async fn update_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<DocumentPatch>,
) -> ApiResult<Json<Document>> {
    let doc = state
        .hub()
        .documents
        .update(&id, &user.account_id, patch)
        .await?;
    Ok(Json(doc))
}

async fn archive_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.hub().documents.archive(&id, &user.account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.hub().documents.hard_delete(&id, &user.account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ShareBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    level: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareResult {
    recipient: Account,
    /// The recipient still has to register before the share takes effect.
    pending: bool,
}

async fn share_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<ShareBody>,
) -> ApiResult<Json<ShareResult>> {
    let recipient = state
        .hub()
        .sharing
        .share(&id, &user.account_id, &body.email, &body.level)
        .await?;
    Ok(Json(ShareResult {
        pending: recipient.is_pending,
        recipient,
    }))
}

async fn revoke_share(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, account_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .hub()
        .sharing
        .revoke(&id, &user.account_id, &account_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_collaborators(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<CollaboratorListing>> {
    let listing = state
        .hub()
        .sharing
        .list_collaborators(&id, &user.account_id)
        .await?;
    Ok(Json(listing))
}

async fn list_versions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<VersionEntry>>> {
    let versions = state.hub().versions.list(&id, &user.account_id).await?;
    Ok(Json(versions))
}

async fn get_version(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, number)): Path<(String, i64)>,
) -> ApiResult<Json<Version>> {
    let version = state
        .hub()
        .versions
        .get_by_number(&id, &user.account_id, number)
        .await?;
    Ok(Json(version))
}
