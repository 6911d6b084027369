use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

use super::handlers::redirect_url;

pub fn create_redirect_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{code}", get(redirect_url))
        .with_state(state)
}
