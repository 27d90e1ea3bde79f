pub mod auth;
pub mod health;
pub mod live;
pub mod notes;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(notes::routes())
        .merge(users::routes())
        .with_state(state)
}
