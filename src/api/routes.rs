use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::session::{session_middleware, SessionKeys};
use crate::state::AppState;

use super::handlers::{create_url, delete_url, get_url_info, home, list_urls};

/// Session-bound routes: the root page and the link management API
pub fn create_api_router(state: Arc<AppState>, session_keys: Arc<SessionKeys>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/urls", post(create_url).get(list_urls))
        .route("/api/urls/{code}", get(get_url_info).delete(delete_url))
        .layer(middleware::from_fn_with_state(session_keys, session_middleware))
        .with_state(state)
}
