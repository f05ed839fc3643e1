//! Dashboard page and its live auth-change stream.
//!
//! The page is rendered from a session check plus a profile fetch. The open
//! page then listens on `/dashboard/events`: changes for the displayed user
//! arrive as `auth` events and anything that signs the user out ends the
//! stream with a `redirect` event.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use futures::{Stream, StreamExt, future, stream};
use serde::Serialize;
use uuid::Uuid;

use crate::pages::dashboard::{DashboardView, LOGIN_PATH};
use crate::routes::callback::no_cache_headers;
use crate::services::events::Subscription;
use crate::services::session_client::ClientOptions;
use crate::services::types::AuthEvent;
use crate::state::AppState;

/// One message for an open dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    Auth(AuthUpdate),
    Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUpdate {
    pub event: AuthEvent,
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl ViewUpdate {
    fn into_event(self) -> Event {
        match self {
            Self::Auth(update) => {
                let data = serde_json::to_string(&update).unwrap_or_default();
                Event::default().event("auth").data(data)
            }
            Self::Redirect => Event::default().event("redirect").data(LOGIN_PATH),
        }
    }
}

/// Drive `view` from `subscription`. Only changes for the displayed user are
/// applied; the stream unsubscribes and ends right after the first
/// `Redirect`.
pub fn view_updates(view: DashboardView, subscription: Subscription) -> impl Stream<Item = ViewUpdate> + Send + 'static {
    let Some(user_id) = view.user().map(|u| u.id) else {
        subscription.unsubscribe();
        return stream::once(future::ready(ViewUpdate::Redirect)).left_stream();
    };

    stream::unfold(Some((view, subscription)), move |state| async move {
        let (mut view, mut subscription) = state?;
        let change = loop {
            let change = subscription.recv().await?;
            if change.user_id == user_id {
                break change;
            }
        };
        view.on_auth_change(&change);
        if view.is_redirecting() {
            subscription.unsubscribe();
            return Some((ViewUpdate::Redirect, None));
        }
        let update = AuthUpdate {
            event: change.event,
            user_id,
            email: view.user().and_then(|u| u.email.clone()),
        };
        Some((ViewUpdate::Auth(update), Some((view, subscription))))
    })
    .right_stream()
}

/// `GET /dashboard`
pub async fn dashboard(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(rc) = state.request_client(ClientOptions::browser(), jar.clone()) else {
        return (jar, Redirect::to(LOGIN_PATH)).into_response();
    };

    let mut view = DashboardView::new();
    view.on_session_check(rc.client.get_session().await);
    if !view.is_redirecting() {
        view.on_user_loaded(rc.client.get_user().await);
    }
    if view.is_redirecting() {
        return (rc.jar(), Redirect::to(&view.redirect_location())).into_response();
    }

    if let Some(user) = view.user() {
        tracing::debug!(user_id = %user.id, "dashboard rendered");
    }
    (rc.jar(), no_cache_headers(), view.render()).into_response()
}

/// `GET /dashboard/events` (server-sent events)
pub async fn dashboard_events(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(rc) = state.request_client(ClientOptions::browser(), jar.clone()) else {
        let updates = view_updates(DashboardView::new(), state.events.subscribe());
        return (jar, sse(updates)).into_response();
    };

    // Subscribe before the check so a change racing it is not lost.
    let subscription = rc.client.on_auth_state_change();
    let mut view = DashboardView::new();
    view.on_session_check(rc.client.get_session().await);
    tracing::debug!(
        authenticated = view.user().is_some(),
        listeners = state.events.subscriber_count(),
        "dashboard event stream opened"
    );
    (rc.jar(), sse(view_updates(view, subscription))).into_response()
}

fn sse(
    updates: impl Stream<Item = ViewUpdate> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    Sse::new(updates.map(|update| Ok(update.into_event()))).keep_alive(KeepAlive::default())
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
