//! `GET /auth/callback`: finish the authorization-code flow.
//!
//! Every outcome is a redirect: onward to the requested page with caching
//! disabled, or to the error page with a tag or message. Nothing here is
//! surfaced to the browser as a raw failure.

use std::any::Any;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::pages::login::DASHBOARD_PATH;
use crate::services::session_client::ClientOptions;
use crate::state::{AppState, RequestClient};

pub const AUTH_ERROR_PATH: &str = "/auth/auth-code-error";
pub const NO_CODE_TAG: &str = "no_code";
const NO_CODE_MESSAGE: &str =
    "The identity provider returned no authorization code; check the callback URL configuration";

/// Headers that keep the browser from replaying a pre-auth page from cache.
#[must_use]
pub fn no_cache_headers() -> [(header::HeaderName, &'static str); 3] {
    [
        (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        (header::PRAGMA, "no-cache"),
        (header::EXPIRES, "0"),
    ]
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub next: Option<String>,
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    /// The identity provider reported a failure (`error` query parameter).
    #[error("{0}")]
    Provider(String),
    #[error("no authorization code")]
    MissingCode,
    #[error("auth provider not configured")]
    Config,
    #[error("{0}")]
    Exchange(String),
    #[error("no session returned from code exchange")]
    MissingSession,
    #[error("{0}")]
    Unexpected(String),
}

impl CallbackError {
    /// Error-page URL for this failure.
    #[must_use]
    pub fn location(&self) -> String {
        match self {
            Self::Provider(message) | Self::Exchange(message) | Self::Unexpected(message) => {
                format!("{AUTH_ERROR_PATH}?error={}", urlencoding::encode(message))
            }
            Self::MissingCode => format!(
                "{AUTH_ERROR_PATH}?error={NO_CODE_TAG}&message={}",
                urlencoding::encode(NO_CODE_MESSAGE)
            ),
            Self::Config => format!("{AUTH_ERROR_PATH}?error=config"),
            Self::MissingSession => format!("{AUTH_ERROR_PATH}?error=no_session"),
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).map(str::trim).filter(|v| !v.is_empty())
}

/// Onward target: `next`, then `redirect_to`, then the dashboard. Only local
/// paths are honoured. Browsers strip tabs and newlines while parsing a
/// `Location`, so any control character disqualifies the target.
#[must_use]
pub fn redirect_target(query: &CallbackQuery) -> String {
    non_empty(query.next.as_ref())
        .or_else(|| non_empty(query.redirect_to.as_ref()))
        .filter(|path| is_local_path(path))
        .unwrap_or(DASHBOARD_PATH)
        .to_string()
}

fn is_local_path(path: &str) -> bool {
    !path.chars().any(char::is_control)
        && path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unknown error".into())
}

/// Reject provider errors and missing codes before any client is built.
fn authorization_code(query: &CallbackQuery) -> Result<String, CallbackError> {
    if let Some(error) = non_empty(query.error.as_ref()) {
        let description = non_empty(query.error_description.as_ref()).unwrap_or(error);
        tracing::warn!(error, description, "oauth error from provider");
        return Err(CallbackError::Provider(description.to_string()));
    }
    non_empty(query.code.as_ref()).map(str::to_string).ok_or_else(|| {
        tracing::warn!("callback without authorization code");
        CallbackError::MissingCode
    })
}

/// Exchange `code` and pick the onward target. Session cookies land in
/// `rc`'s jar.
async fn exchange(rc: Arc<RequestClient>, code: String, query: &CallbackQuery) -> Result<String, CallbackError> {
    // The exchange runs in its own task so a panic inside the provider client
    // still ends in a redirect.
    let task = tokio::spawn(async move { rc.client.exchange_code_for_session(&code).await });
    let outcome = task.await.map_err(|join_err| {
        let message = if join_err.is_panic() {
            panic_message(&*join_err.into_panic())
        } else {
            join_err.to_string()
        };
        tracing::error!(error = %message, "code exchange task failed");
        CallbackError::Unexpected(message)
    })?;

    match outcome {
        Ok(Some(session)) => {
            tracing::info!(user_id = %session.user.id, email = ?session.user.email, "oauth callback authenticated");
            Ok(redirect_target(query))
        }
        Ok(None) => {
            tracing::error!("code exchange returned no session");
            Err(CallbackError::MissingSession)
        }
        Err(e) => {
            tracing::error!(error = %e, "code exchange failed");
            Err(CallbackError::Exchange(e.to_string()))
        }
    }
}

fn finish(jar: CookieJar, result: Result<String, CallbackError>) -> Response {
    match result {
        Ok(target) => (jar, no_cache_headers(), Redirect::temporary(&target)).into_response(),
        Err(err) => (jar, Redirect::temporary(&err.location())).into_response(),
    }
}

/// `GET /auth/callback?code=..|error=..&error_description=..&next=..`
pub async fn auth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "malformed callback query");
            return finish(jar, Err(CallbackError::Unexpected(rejection.body_text())));
        }
    };

    let code = match authorization_code(&query) {
        Ok(code) => code,
        Err(err) => return finish(jar, Err(err)),
    };
    let Some(rc) = state.request_client(ClientOptions::browser(), jar.clone()) else {
        tracing::error!("callback hit with auth provider unconfigured");
        return finish(jar, Err(CallbackError::Config));
    };

    let rc = Arc::new(rc);
    let result = exchange(Arc::clone(&rc), code, &query).await;
    finish(rc.jar(), result)
}

#[cfg(test)]
#[path = "callback_test.rs"]
mod tests;
