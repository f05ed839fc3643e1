//! Read-only page explaining a failed sign-in.

use axum::response::Html;
use serde::Deserialize;

use super::{layout, text};
use crate::routes::callback::NO_CODE_TAG;

#[derive(Debug, Default, Deserialize)]
pub struct AuthErrorQuery {
    pub error: Option<String>,
    pub message: Option<String>,
}

#[must_use]
pub fn render(query: &AuthErrorQuery) -> Html<String> {
    let details = query
        .error
        .as_deref()
        .map(|error| {
            let message = query
                .message
                .as_deref()
                .map(|m| format!("<p><strong>Details:</strong> {}</p>", text(m)))
                .unwrap_or_default();
            format!("<p><strong>Error:</strong> {}</p>{message}", text(error))
        })
        .unwrap_or_default();

    let no_code_help = if query.error.as_deref() == Some(NO_CODE_TAG) {
        r"<section>
<p>The identity provider did not return an authorization code.</p>
<ol>
<li>Check that the callback URL registered with the auth provider ends in <code>/auth/callback</code>.</li>
<li>Check that the GitHub OAuth app's authorization callback URL points at the auth provider.</li>
</ol>
</section>"
    } else {
        ""
    };

    let body = format!(
        r#"<h1>Authentication error</h1>
<p>Something went wrong while signing you in. Please try again.</p>
{details}{no_code_help}
<p>Common causes: the provider is not enabled, the callback URL does not match, the session expired, or cookies are blocked.</p>
<p><a href="/">Back to sign in</a> <a href="/dashboard">Go to dashboard</a></p>"#
    );
    layout("Authentication error", &body)
}
