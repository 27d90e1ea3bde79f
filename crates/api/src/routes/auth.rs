use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use notehub_core::account::{Account, ProfilePatch};
use notehub_core::validate::ValidationError;
use notehub_core::CoreError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::{AuthUser, BearerIdentity, MaybeToken};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/profile", get(get_profile).put(update_profile))
        .route("/api/auth/verify-token", get(verify_token))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    display_name: Option<String>,
    avatar_ref: Option<String>,
}

/// Create the caller's account, or refresh its profile fields when it exists.
async fn register(
    State(state): State<AppState>,
    BearerIdentity(identity): BearerIdentity,
    Json(body): Json<RegisterBody>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let mut data = identity.to_new_account();
    if body.display_name.is_some() {
        data.display_name = body.display_name;
    }
    if body.avatar_ref.is_some() {
        data.avatar_ref = body.avatar_ref;
    }

    let registration = state.hub().register(data).await?;
    let status = if registration.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(registration.account)))
}

async fn get_profile(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Account>> {
    let account = state
        .hub()
        .accounts
        .get_by_id(&user.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))?;
    Ok(Json(account))
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(patch): Json<ProfilePatch>,
) -> ApiResult<Json<Account>> {
    if patch.is_empty() {
        return Err(CoreError::from(ValidationError::EmptyPatch).into());
    }
    let account = state
        .hub()
        .accounts
        .update_profile(&user.account_id, patch)
        .await?;
    Ok(Json(account))
}

/// Always 200; reports whether the presented token verifies.
async fn verify_token(State(state): State<AppState>, MaybeToken(token): MaybeToken) -> Json<Value> {
    let valid = match token {
        Some(token) => state.verifier().verify(&token).await.is_ok(),
        None => false,
    };
    Json(json!({ "valid": valid }))
}
