use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::session::SessionKeys;
use crate::state::AppState;
use crate::{api, redirect};

/// The complete HTTP surface: management API, service root and redirects
pub fn build_router(state: Arc<AppState>, session_keys: Arc<SessionKeys>) -> Router {
    api::create_api_router(Arc::clone(&state), session_keys)
        .merge(redirect::create_redirect_router(state))
        .layer(TraceLayer::new_for_http())
}
