use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, header::HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::analytics::ip_extractor::{anonymize_ip, extract_client_ip};
use crate::service::{RedirectOutcome, VisitContext};
use crate::state::AppState;

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Redirect a visitor to the original URL, or to the root once the link has expired
pub async fn redirect_url(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let mut client_ip = extract_client_ip(&headers, addr.ip(), &state.analytics);
    if state.analytics.ip_anonymization {
        client_ip = anonymize_ip(client_ip);
    }

    let visit = VisitContext {
        client_ip,
        referer: header_string(&headers, header::REFERER),
        user_agent: header_string(&headers, header::USER_AGENT),
    };

    match state.service.redirect(&code, visit).await {
        Ok(RedirectOutcome::Temporary(location)) => Redirect::temporary(&location).into_response(),
        Ok(RedirectOutcome::ExpiredToRoot) => Redirect::permanent("/").into_response(),
        Ok(RedirectOutcome::NotFound) => (StatusCode::NOT_FOUND, "URL not found").into_response(),
        Err(e) => {
            tracing::error!(short_code = %code, error = %e, "Failed to resolve short code");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
