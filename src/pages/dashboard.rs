//! Dashboard view state: `Loading -> {Authenticated, Redirecting}`.
//!
//! The initial session check and auth-change notifications both write the
//! displayed state; whichever arrives last wins. `SIGNED_OUT` always ends in
//! `Redirecting`.

use axum::response::Html;

use super::{attr, layout, notice, text};
use crate::services::types::{AuthChange, AuthError, AuthEvent, Session, User};

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/";
pub const EVENTS_PATH: &str = "/dashboard/events";

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardState {
    Loading,
    Authenticated(User),
    Redirecting,
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    state: DashboardState,
    error: Option<String>,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardView {
    #[must_use]
    pub fn new() -> Self {
        Self { state: DashboardState::Loading, error: None }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match &self.state {
            DashboardState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_redirecting(&self) -> bool {
        self.state == DashboardState::Redirecting
    }

    /// Apply the mount-time session query.
    pub fn on_session_check(&mut self, result: Result<Option<Session>, AuthError>) -> &DashboardState {
        self.state = match result {
            Ok(Some(session)) => DashboardState::Authenticated(session.user),
            Ok(None) => DashboardState::Redirecting,
            Err(e) => {
                tracing::warn!(error = %e, "dashboard session check failed");
                self.error = Some("Unable to retrieve session".into());
                DashboardState::Redirecting
            }
        };
        &self.state
    }

    /// Apply a fresh profile fetch. A failed fetch keeps the user from the
    /// stored session.
    pub fn on_user_loaded(&mut self, result: Result<Option<User>, AuthError>) -> &DashboardState {
        match result {
            Ok(Some(user)) => self.state = DashboardState::Authenticated(user),
            Ok(None) => self.state = DashboardState::Redirecting,
            Err(e) => tracing::warn!(error = %e, "profile refresh failed"),
        }
        &self.state
    }

    /// Where a redirecting view sends the browser, carrying any error.
    #[must_use]
    pub fn redirect_location(&self) -> String {
        match &self.error {
            Some(error) => format!("{LOGIN_PATH}?error={}", urlencoding::encode(error)),
            None => LOGIN_PATH.to_string(),
        }
    }

    /// Apply one auth change.
    pub fn on_auth_change(&mut self, change: &AuthChange) -> &DashboardState {
        self.state = match (change.event, &change.session) {
            (AuthEvent::SignedOut, _) | (_, None) => DashboardState::Redirecting,
            (_, Some(session)) => DashboardState::Authenticated(session.user.clone()),
        };
        &self.state
    }

    /// Result of the sign-out action. Navigation happens either way; a
    /// failure is kept for display on the next page.
    pub fn on_sign_out(&mut self, result: Result<(), AuthError>) -> &DashboardState {
        if let Err(e) = result {
            tracing::warn!(error = %e, "sign-out failed");
            self.error = Some(format!("Failed to sign out: {e}"));
        }
        self.state = DashboardState::Redirecting;
        &self.state
    }

    #[must_use]
    pub fn render(&self) -> Html<String> {
        let body = match &self.state {
            DashboardState::Loading => "<p>Loading...</p>".to_string(),
            DashboardState::Redirecting => {
                format!(r#"<p>Not signed in.</p><p><a href="{LOGIN_PATH}">Redirecting to sign in...</a></p>"#)
            }
            DashboardState::Authenticated(user) => format!(
                r#"<h1>Dashboard</h1>
{error}<section>
{avatar}<p>Signed in as</p>
<p id="user-email">{email}</p>
<p>User ID: {id}</p>
</section>
<p>You are signed in.</p>
<form method="post" action="/auth/sign-out"><button type="submit">Sign out</button></form>
<script>
const events = new EventSource("{EVENTS_PATH}");
events.addEventListener("auth", (e) => {{
  const change = JSON.parse(e.data);
  if (change.email) document.getElementById("user-email").textContent = change.email;
}});
events.addEventListener("redirect", (e) => {{ events.close(); window.location.assign(e.data); }});
</script>"#,
                error = notice("error", self.error.as_deref()),
                avatar = user
                    .avatar_url()
                    .map(|url| format!(r#"<img src="{}" alt="" width="48" height="48">"#, attr(url)))
                    .unwrap_or_default(),
                email = text(user.email.as_deref().unwrap_or("(no email)")),
                id = user.id,
            ),
        };
        layout("Dashboard", &body)
    }
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
