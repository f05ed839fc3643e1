//! Login form: email/password sign-in and sign-up plus OAuth initiation.
//!
//! One `loading` flag guards every submit action. A submission that starts
//! while another is in flight is refused with [`FormError::Busy`], and the
//! rendered buttons are disabled for as long as the flag is set. In the
//! browser the same guard is [`SUBMIT_GUARD_SCRIPT`]: the first submit of any
//! form on the page disables every submit button until the next page loads.

use std::time::Duration;

use axum::response::Html;

use super::{attr, layout, notice};
use crate::services::session_client::SessionClient;
use crate::services::types::OAuthProvider;

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const DEBUG_PATH: &str = "/auth/debug";

/// Pause between the success message and navigation, so it gets seen.
pub const SIGN_IN_REDIRECT_DELAY: Duration = Duration::from_secs(1);

/// Disables all submit buttons once any form on the page submits. The
/// disabling waits a tick so the clicked button still submits its
/// `formaction`.
pub const SUBMIT_GUARD_SCRIPT: &str = r#"<script data-submit-guard>
document.addEventListener("submit", (e) => {
  if (document.body.dataset.loading) { e.preventDefault(); return; }
  document.body.dataset.loading = "true";
  setTimeout(() => document.querySelectorAll('button[type="submit"]').forEach((b) => { b.disabled = true; }), 0);
});
</script>"#;

pub const CHECK_EMAIL_MESSAGE: &str = "Check your email to confirm your account.";
pub const SIGNED_IN_MESSAGE: &str = "Signed in! Redirecting to your dashboard...";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("another request is already in progress")]
    Busy,
    #[error("Email and password are required")]
    MissingCredentials,
}

/// What the page should do after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    /// Show the form again with its message or error.
    Render,
    /// Show the form, then move to `to` once `delay` has passed.
    NavigateAfter { to: &'static str, delay: Duration },
    /// Leave for `to` immediately.
    Redirect(String),
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    loading: bool,
    error: Option<String>,
    message: Option<String>,
}

impl LoginForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into(), ..Self::default() }
    }

    /// Empty form showing notices carried over from another page.
    #[must_use]
    pub fn with_notices(error: Option<String>, message: Option<String>) -> Self {
        let keep = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        Self { error: keep(error), message: keep(message), ..Self::default() }
    }

    pub(crate) fn begin(&mut self) -> Result<(), FormError> {
        if self.loading {
            return Err(FormError::Busy);
        }
        self.loading = true;
        self.error = None;
        self.message = None;
        Ok(())
    }

    /// Record a failure and re-enable the form.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.loading = false;
    }

    fn require_credentials(&mut self) -> bool {
        self.email = self.email.trim().to_string();
        if self.email.is_empty() || self.password.is_empty() {
            self.fail(FormError::MissingCredentials.to_string());
            return false;
        }
        true
    }

    /// Create an account; the confirmation email links back to `redirect_to`.
    ///
    /// # Errors
    ///
    /// [`FormError::Busy`] if a submission is already running.
    pub async fn sign_up(&mut self, client: &SessionClient, redirect_to: &str) -> Result<FormOutcome, FormError> {
        self.begin()?;
        if !self.require_credentials() {
            return Ok(FormOutcome::Render);
        }
        match client.sign_up(&self.email, &self.password, redirect_to).await {
            Ok(_) => {
                self.message = Some(CHECK_EMAIL_MESSAGE.into());
                self.email.clear();
                self.password.clear();
                self.loading = false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-up rejected");
                self.fail(e.to_string());
            }
        }
        Ok(FormOutcome::Render)
    }

    /// # Errors
    ///
    /// [`FormError::Busy`] if a submission is already running.
    pub async fn sign_in(&mut self, client: &SessionClient) -> Result<FormOutcome, FormError> {
        self.begin()?;
        if !self.require_credentials() {
            return Ok(FormOutcome::Render);
        }
        let result = client.sign_in_with_password(&self.email, &self.password).await;
        self.password.clear();
        match result {
            Ok(_) => {
                self.message = Some(SIGNED_IN_MESSAGE.into());
                self.loading = false;
                Ok(FormOutcome::NavigateAfter { to: DASHBOARD_PATH, delay: SIGN_IN_REDIRECT_DELAY })
            }
            Err(e) => {
                tracing::warn!(error = %e, "password sign-in rejected");
                self.fail(e.to_string());
                Ok(FormOutcome::Render)
            }
        }
    }

    /// Start a provider redirect. On success the form stays in its loading
    /// state; the browser is leaving.
    ///
    /// # Errors
    ///
    /// [`FormError::Busy`] if a submission is already running.
    pub fn sign_in_with_oauth(
        &mut self,
        client: &SessionClient,
        provider: &str,
        redirect_to: &str,
    ) -> Result<FormOutcome, FormError> {
        self.begin()?;
        match provider.parse::<OAuthProvider>() {
            Ok(provider) => {
                let url = client.sign_in_with_oauth(provider, redirect_to);
                self.message = Some(format!("Redirecting to {} sign-in...", provider.as_str().to_uppercase()));
                tracing::info!(provider = provider.as_str(), "oauth flow initiated");
                Ok(FormOutcome::Redirect(url))
            }
            Err(e) => {
                tracing::warn!(error = %e, "oauth initiation failed");
                self.fail(e.to_string());
                Ok(FormOutcome::Render)
            }
        }
    }

    #[must_use]
    pub fn render(&self) -> Html<String> {
        self.render_inner(None)
    }

    /// Render, then have the browser follow `to` after `delay`.
    #[must_use]
    pub fn render_then_navigate(&self, to: &str, delay: Duration) -> Html<String> {
        self.render_inner(Some((to, delay)))
    }

    fn render_inner(&self, navigate: Option<(&str, Duration)>) -> Html<String> {
        let disabled = if self.loading { " disabled" } else { "" };
        let refresh = navigate
            .map(|(to, delay)| {
                format!(r#"<meta http-equiv="refresh" content="{};url={}">"#, delay.as_secs(), attr(to))
            })
            .unwrap_or_default();

        let body = format!(
            r#"{refresh}<h1>Sign in</h1>
{error}{message}
<form method="post" action="/auth/oauth/github">
<button type="submit"{disabled}>Sign in with GitHub</button>
</form>
<p>or use your email</p>
<form method="post" action="/auth/sign-in">
<label for="email">Email</label>
<input id="email" name="email" type="email" value="{email}" required{disabled}>
<label for="password">Password</label>
<input id="password" name="password" type="password" required{disabled}>
<button type="submit"{disabled}>Sign in</button>
<button type="submit" formaction="/auth/sign-up"{disabled}>Sign up</button>
</form>
<p><a href="{DEBUG_PATH}" target="_blank" rel="noopener noreferrer">Debug session</a></p>
{SUBMIT_GUARD_SCRIPT}"#,
            error = notice("error", self.error.as_deref()),
            message = notice("message", self.message.as_deref()),
            email = attr(&self.email),
        );
        layout("Sign in", &body)
    }
}

#[cfg(test)]
#[path = "login_test.rs"]
mod tests;
