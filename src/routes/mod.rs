//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Pages (login, dashboard, error, debug) and the form/callback endpoints
//! that drive them share one Axum router. Handlers build a request-scoped
//! session client from `AppState` and translate its results into HTML,
//! redirects or an event stream.

pub mod callback;
pub mod dashboard;
pub mod login;
pub mod views;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::pages::dashboard::EVENTS_PATH;
use crate::pages::login::{DASHBOARD_PATH, DEBUG_PATH};
use crate::state::{AppState, CALLBACK_PATH};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(login::login_page))
        .route("/auth/sign-up", post(login::sign_up))
        .route("/auth/sign-in", post(login::sign_in))
        .route("/auth/oauth/{provider}", post(login::oauth_sign_in))
        .route("/auth/sign-out", post(login::sign_out))
        .route(CALLBACK_PATH, get(callback::auth_callback))
        .route(callback::AUTH_ERROR_PATH, get(views::auth_code_error))
        .route(DEBUG_PATH, get(views::debug))
        .route(DASHBOARD_PATH, get(dashboard::dashboard))
        .route(EVENTS_PATH, get(dashboard::dashboard_events))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
