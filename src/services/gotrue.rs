//! GoTrue REST transport, the wire side of the session client.
//!
//! DESIGN
//! ======
//! `AuthApi` is the seam between the session client and the hosted provider.
//! `GoTrueApi` speaks the provider's `/auth/v1` endpoints over `reqwest`;
//! tests substitute an in-memory implementation. The transport is stateless:
//! storage, PKCE bookkeeping and event fan-out live in the session client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::types::{ApiErrorBody, AuthError, OAuthProvider, Session, SignUpResponse, TokenResponse, User};
use crate::config::ProviderConfig;

/// Parameters for an OAuth authorize redirect.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest<'a> {
    pub provider: OAuthProvider,
    pub redirect_to: &'a str,
    pub code_challenge: &'a str,
}

/// Provider operations the session client relies on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Namespace for storage keys (`sb-<ref>-auth-token`).
    fn project_ref(&self) -> &str;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<SignUpResponse, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Build the provider authorize URL. Never touches the network.
    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> String;

    /// PKCE code exchange. `Ok(None)` means the provider accepted the grant
    /// but returned no session.
    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<Option<Session>, AuthError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError>;
}

pub(crate) fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct GoTrueApi {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    project_ref: String,
}

impl GoTrueApi {
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/auth/v1", config.url),
            anon_key: config.anon_key.clone(),
            project_ref: config.project_ref(),
        })
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let bearer = bearer.unwrap_or(&self.anon_key);
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, AuthError> {
        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| AuthError::Decode(format!("{e}: {body}")))
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Option<Session>, AuthError> {
        let request = self
            .request(Method::POST, "/token", None)
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let resp: TokenResponse = Self::send(request).await?;
        Ok(resp.into_session(unix_now()))
    }

    async fn required_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, AuthError> {
        self.token_grant(grant_type, body)
            .await?
            .ok_or_else(|| AuthError::Decode(format!("{grant_type} grant returned no session")))
    }
}

fn api_error(status: StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), str::to_string)
        });
    AuthError::Api { status: status.as_u16(), message }
}

pub(crate) fn build_authorize_url(base_url: &str, request: &AuthorizeRequest<'_>) -> String {
    let mut params: Vec<(&str, &str)> = vec![
        ("provider", request.provider.as_str()),
        ("redirect_to", request.redirect_to),
        ("code_challenge", request.code_challenge),
        ("code_challenge_method", "s256"),
    ];
    params.extend_from_slice(request.provider.query_params());

    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base_url}/authorize?{query}")
}

#[async_trait]
impl AuthApi for GoTrueApi {
    fn project_ref(&self) -> &str {
        &self.project_ref
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<SignUpResponse, AuthError> {
        let request = self
            .request(Method::POST, "/signup", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }));
        let body: serde_json::Value = Self::send(request).await?;
        Ok(parse_sign_up(body))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.required_grant("password", serde_json::json!({ "email": email, "password": password }))
            .await
    }

    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> String {
        build_authorize_url(&self.base_url, request)
    }

    async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<Option<Session>, AuthError> {
        self.token_grant("pkce", serde_json::json!({ "auth_code": auth_code, "code_verifier": code_verifier }))
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.required_grant("refresh_token", serde_json::json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let resp = self
            .request(Method::POST, "/logout", Some(access_token))
            .query(&[("scope", "global")])
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
        Self::send(self.request(Method::GET, "/user", Some(access_token))).await
    }
}

/// Sign-up answers with a session when auto-confirm is on, or a bare user
/// when the address still needs confirming.
pub(crate) fn parse_sign_up(body: serde_json::Value) -> SignUpResponse {
    let session = serde_json::from_value::<TokenResponse>(body.clone())
        .ok()
        .and_then(|resp| resp.into_session(unix_now()));
    if let Some(session) = session {
        return SignUpResponse { user: Some(session.user.clone()), session: Some(session) };
    }
    let user = serde_json::from_value::<User>(body.get("user").cloned().unwrap_or(body)).ok();
    SignUpResponse { user, session: None }
}

#[cfg(test)]
#[path = "gotrue_test.rs"]
mod tests;
