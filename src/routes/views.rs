//! Read-only pages: the sign-in error explanation and the session inspector.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::pages::auth_error::{self, AuthErrorQuery};
use crate::pages::debug::DebugReport;
use crate::routes::callback::no_cache_headers;
use crate::services::session_client::ClientOptions;
use crate::state::AppState;

/// `GET /auth/auth-code-error?error=..&message=..`
pub async fn auth_code_error(Query(query): Query<AuthErrorQuery>) -> Response {
    auth_error::render(&query).into_response()
}

/// `GET /auth/debug`
pub async fn debug(State(state): State<AppState>, jar: CookieJar) -> Response {
    let report = match state.request_client(ClientOptions::browser(), jar) {
        Some(rc) => DebugReport::collect(&rc.client),
        None => DebugReport::unconfigured(),
    };
    tracing::debug!(exists = report.exists, keys = report.storage.len(), "session debug viewed");
    (no_cache_headers(), report.render()).into_response()
}
