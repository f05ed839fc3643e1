//! Provider data model: sessions, users, auth events and the shared error type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// USER / SESSION
// =============================================================================

/// Account record owned by the provider. Read-only on this side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Avatar URL from profile metadata, if the identity provider supplied one.
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.user_metadata.get("avatar_url").and_then(serde_json::Value::as_str)
    }
}

/// Access/refresh token pair plus expiry and owning user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix seconds. Filled from `expires_in` when the provider omits it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".into()
}

impl Session {
    /// True once `now` is within `margin_secs` of expiry. Sessions without a
    /// known expiry never report expired.
    #[must_use]
    pub fn is_expired(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at.is_some_and(|at| at - margin_secs <= now)
    }
}

/// Raw token grant body. Every field is optional so that a successful grant
/// without a session can be told apart from a decode failure.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<User>,
}

impl TokenResponse {
    pub(crate) fn into_session(self, now: i64) -> Option<Session> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let user = self.user?;
        let expires_in = self.expires_in.unwrap_or_default();
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs));
        Some(Session {
            access_token,
            refresh_token: self.refresh_token.unwrap_or_default(),
            token_type: self.token_type.unwrap_or_else(default_token_type),
            expires_in,
            expires_at,
            user,
        })
    }
}

/// Result of an account creation request. When email confirmation is on the
/// provider returns only the user; otherwise a full session.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}

// =============================================================================
// AUTH EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl AuthEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignedIn => "SIGNED_IN",
            Self::SignedOut => "SIGNED_OUT",
            Self::TokenRefreshed => "TOKEN_REFRESHED",
            Self::UserUpdated => "USER_UPDATED",
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One session lifecycle notification. `user_id` names whose session changed;
/// `session` is `None` after sign-out.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub user_id: Uuid,
    pub session: Option<Session>,
}

// =============================================================================
// OAUTH PROVIDERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    GitHub,
}

impl OAuthProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
        }
    }

    /// Extra authorize query parameters. Forces the consent screen so a
    /// signed-out user can pick another account.
    #[must_use]
    pub fn query_params(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::GitHub => &[("access_type", "offline"), ("prompt", "consent")],
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            other => Err(AuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("auth request failed: {0}")]
    Transport(String),
    /// Provider rejected the request. Displays the provider's own message.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("unexpected auth response: {0}")]
    Decode(String),
    #[error("code verifier not found in storage")]
    MissingCodeVerifier,
    #[error("unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// GoTrue error bodies come in two shapes: `{ "msg": .. }` from the REST
/// handlers and `{ "error": .., "error_description": .. }` from the token
/// endpoint.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ApiErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
