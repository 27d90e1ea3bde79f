use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use notehub_core::auth::VerifiedIdentity;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Raw bearer token from `Authorization`, or from `?token=` for WebSocket
/// upgrades where browsers cannot set headers.
#[derive(Debug, Clone)]
pub struct MaybeToken(pub Option<String>);

impl FromRequestParts<AppState> for MaybeToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Ok(TypedHeader(Authorization(bearer))) =
            parts.extract::<TypedHeader<Authorization<Bearer>>>().await
        {
            return Ok(Self(Some(bearer.token().to_string())));
        }
        let token = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
            .filter(|token| !token.is_empty());
        Ok(Self(token))
    }
}

/// Verified credential, without touching the account store.
#[derive(Debug, Clone)]
pub struct BearerIdentity(pub VerifiedIdentity);

impl FromRequestParts<AppState> for BearerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeToken(token) = MaybeToken::from_request_parts(parts, state)
            .await
            .unwrap_or(MaybeToken(None));
        let token = token.ok_or(ApiError::Unauthorized)?;

        let identity = state.verifier().verify(&token).await.map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            ApiError::Unauthorized
        })?;
        Ok(Self(identity))
    }
}

/// Authenticated caller. The first request of a new subject provisions its
/// account; provisioning failures are logged and the request goes on.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerIdentity(identity) = BearerIdentity::from_request_parts(parts, state).await?;
        let hub = state.hub();

        match hub.accounts.get_by_id(&identity.subject_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(err) = hub.register(identity.to_new_account()).await {
                    tracing::warn!(
                        account_id = %identity.subject_id,
                        error = %err,
                        "auto-provisioning failed"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(
                    account_id = %identity.subject_id,
                    error = %err,
                    "account lookup during authentication failed"
                );
            }
        }

        Ok(Self {
            account_id: identity.subject_id,
        })
    }
}
