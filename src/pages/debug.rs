//! Session inspector. Reads the current session and provider storage keys
//! for a human to look at; never writes.

use axum::response::Html;

use super::{layout, text};
use crate::services::session_client::SessionClient;
use crate::services::types::User;

const TOKEN_PREVIEW_CHARS: usize = 20;
const TOKEN_FIELDS: [&str; 2] = ["access_token", "refresh_token"];

#[derive(Debug, Clone, PartialEq)]
pub struct DebugReport {
    pub exists: bool,
    pub error: Option<String>,
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    /// Provider storage keys with JSON-decoded values.
    pub storage: Vec<(String, serde_json::Value)>,
}

pub(crate) fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
    format!("{head}...")
}

/// Parse a stored value as JSON, shortening any token fields it carries.
pub(crate) fn storage_value(raw: &str) -> serde_json::Value {
    let Ok(mut value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return serde_json::Value::String(raw.to_string());
    };
    if let Some(obj) = value.as_object_mut() {
        for field in TOKEN_FIELDS {
            if let Some(serde_json::Value::String(token)) = obj.get_mut(field) {
                *token = token_preview(token);
            }
        }
    }
    value
}

impl DebugReport {
    #[must_use]
    pub fn collect(client: &SessionClient) -> Self {
        let (session, error) = match client.peek_session() {
            Ok(session) => (session, None),
            Err(e) => (None, Some(e.to_string())),
        };
        let storage = client
            .storage_entries()
            .into_iter()
            .map(|(key, raw)| {
                let value = storage_value(&raw);
                (key, value)
            })
            .collect();

        Self {
            exists: session.is_some(),
            error,
            access_token: session.as_ref().map(|s| token_preview(&s.access_token)),
            refresh_token: session.as_ref().map(|s| token_preview(&s.refresh_token)),
            expires_at: session.as_ref().and_then(|s| s.expires_at),
            user: session.map(|s| s.user),
            storage,
        }
    }

    /// Report for a site with no provider configured.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            exists: false,
            error: Some("auth provider is not configured".into()),
            user: None,
            access_token: None,
            refresh_token: None,
            expires_at: None,
            storage: Vec::new(),
        }
    }

    #[must_use]
    pub fn render(&self) -> Html<String> {
        let mut rows = vec![format!(
            "<tr><th>Session exists</th><td>{}</td></tr>",
            if self.exists { "yes" } else { "no" }
        )];
        if let Some(error) = &self.error {
            rows.push(format!("<tr><th>Error</th><td>{}</td></tr>", text(error)));
        }
        if let Some(user) = &self.user {
            let metadata = serde_json::to_string_pretty(&user.user_metadata).unwrap_or_default();
            rows.push(format!("<tr><th>User ID</th><td>{}</td></tr>", user.id));
            rows.push(format!(
                "<tr><th>Email</th><td>{}</td></tr>",
                text(user.email.as_deref().unwrap_or_default())
            ));
            rows.push(format!("<tr><th>Metadata</th><td><pre>{}</pre></td></tr>", text(&metadata)));
        }
        for (label, value) in [("Access token", &self.access_token), ("Refresh token", &self.refresh_token)] {
            if let Some(value) = value {
                rows.push(format!("<tr><th>{label}</th><td><code>{}</code></td></tr>", text(value)));
            }
        }
        if let Some(expires_at) = self.expires_at {
            let when = time::OffsetDateTime::from_unix_timestamp(expires_at)
                .map_or_else(|_| expires_at.to_string(), |t| t.to_string());
            rows.push(format!("<tr><th>Expires at</th><td>{}</td></tr>", text(&when)));
        }

        let storage = if self.storage.is_empty() {
            "<p>No provider keys in storage.</p>".to_string()
        } else {
            self.storage
                .iter()
                .map(|(key, value)| {
                    let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
                    format!("<h3>{}</h3><pre>{}</pre>", text(key), text(&pretty))
                })
                .collect::<String>()
        };

        let status = match (self.exists, &self.error) {
            (true, _) => "<p>User is signed in.</p>",
            (false, None) => "<p>No session found. Sign in first.</p>",
            (false, Some(_)) => "",
        };

        let body = format!(
            r#"<p><a href="/">Back to sign in</a></p>
<h1>Session debug</h1>
<table>{rows}</table>
{status}
<h2>Stored keys</h2>
{storage}"#,
            rows = rows.concat(),
        );
        layout("Session debug", &body)
    }
}

#[cfg(test)]
#[path = "debug_test.rs"]
mod tests;
