//! Login form endpoints and sign-out.
//!
//! The form posts here; each handler fills a [`LoginForm`] from the request,
//! runs the matching action against a cookie-backed session client and maps
//! the outcome to a page or a redirect.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::pages::dashboard::{DashboardView, LOGIN_PATH};
use crate::pages::login::{FormError, FormOutcome, LoginForm};
use crate::services::session_client::ClientOptions;
use crate::state::AppState;

const NOT_CONFIGURED: &str = "Authentication provider is not configured";

#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub message: Option<String>,
}

fn respond(jar: CookieJar, form: &LoginForm, outcome: Result<FormOutcome, FormError>) -> Response {
    match outcome {
        Ok(FormOutcome::Render) => (jar, form.render()).into_response(),
        Ok(FormOutcome::NavigateAfter { to, delay }) => (jar, form.render_then_navigate(to, delay)).into_response(),
        Ok(FormOutcome::Redirect(to)) => (jar, Redirect::to(&to)).into_response(),
        Err(e @ FormError::Busy) => (StatusCode::CONFLICT, e.to_string()).into_response(),
        Err(e) => {
            let mut form = form.clone();
            form.fail(e.to_string());
            (jar, form.render()).into_response()
        }
    }
}

fn unconfigured(jar: CookieJar, mut form: LoginForm) -> Response {
    tracing::error!("login attempted with auth provider unconfigured");
    form.fail(NOT_CONFIGURED);
    (jar, form.render()).into_response()
}

/// `GET /` with optional `error` / `message` notices.
pub async fn login_page(Query(query): Query<LoginQuery>) -> Response {
    LoginForm::with_notices(query.error, query.message).render().into_response()
}

/// `POST /auth/sign-up`
pub async fn sign_up(State(state): State<AppState>, jar: CookieJar, Form(creds): Form<Credentials>) -> Response {
    let mut form = LoginForm::new(creds.email, creds.password);
    // The confirmation link opens in a fresh context, so only the code
    // verifier is kept; no session is persisted here.
    let Some(rc) = state.request_client(ClientOptions::server(), jar.clone()) else {
        return unconfigured(jar, form);
    };
    let outcome = form.sign_up(&rc.client, &state.callback_url()).await;
    respond(rc.jar(), &form, outcome)
}

/// `POST /auth/sign-in`
pub async fn sign_in(State(state): State<AppState>, jar: CookieJar, Form(creds): Form<Credentials>) -> Response {
    let mut form = LoginForm::new(creds.email, creds.password);
    let Some(rc) = state.request_client(ClientOptions::browser(), jar.clone()) else {
        return unconfigured(jar, form);
    };
    let outcome = form.sign_in(&rc.client).await;
    respond(rc.jar(), &form, outcome)
}

/// `POST /auth/oauth/{provider}`
pub async fn oauth_sign_in(State(state): State<AppState>, jar: CookieJar, Path(provider): Path<String>) -> Response {
    let mut form = LoginForm::default();
    let Some(rc) = state.request_client(ClientOptions::browser(), jar.clone()) else {
        return unconfigured(jar, form);
    };
    let outcome = form.sign_in_with_oauth(&rc.client, &provider, &state.callback_url());
    respond(rc.jar(), &form, outcome)
}

/// `POST /auth/sign-out`
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(rc) = state.request_client(ClientOptions::browser(), jar.clone()) else {
        return (jar, Redirect::to(LOGIN_PATH)).into_response();
    };
    let mut view = DashboardView::new();
    view.on_sign_out(rc.client.sign_out().await);
    (rc.jar(), Redirect::to(&view.redirect_location())).into_response()
}

#[cfg(test)]
#[path = "login_test.rs"]
mod tests;
