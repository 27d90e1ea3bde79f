use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use notehub_core::account::{Account, PublicProfile};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(search))
        .route("/api/users/{id}", get(public_profile))
        .route("/api/users/{id}/shared-notes-count", get(shared_notes_count))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
    limit: Option<usize>,
}

/// Prefix search over names and emails, excluding the caller.
async fn search(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Account>>> {
    let accounts = state
        .hub()
        .accounts
        .search(&params.query, &user.account_id, params.limit)
        .await?;
    Ok(Json(accounts))
}

async fn public_profile(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicProfile>> {
    let account = state
        .hub()
        .accounts
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))?;
    Ok(Json(account.into()))
}

/// Number of documents shared with the caller. Only available for oneself.
async fn shared_notes_count(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if id != user.account_id {
        return Err(ApiError::Forbidden(
            "shared note counts are only visible to their owner".to_string(),
        ));
    }
    let listing = state.hub().documents.list_for_account(&id).await?;
    Ok(Json(json!({ "count": listing.shared.len() })))
}
