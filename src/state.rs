//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the provider transport (absent when unconfigured), the auth-change
//! hub and the site settings needed to build callback URLs and cookies. Each
//! handler builds its own `SessionClient` from these parts for the request
//! at hand.

use std::sync::Arc;

use axum_extra::extract::cookie::CookieJar;

use crate::services::events::AuthEvents;
use crate::services::gotrue::AuthApi;
use crate::services::session_client::{ClientOptions, SessionClient};
use crate::services::storage::{CookieStorage, SessionStorage};

/// Path the provider redirects back to after OAuth or email confirmation.
pub const CALLBACK_PATH: &str = "/auth/callback";

#[derive(Clone)]
pub struct AppState {
    /// `None` if the provider URL or anon key is not configured.
    pub api: Option<Arc<dyn AuthApi>>,
    pub events: AuthEvents,
    pub site_url: String,
    pub cookie_secure: bool,
}

impl AppState {
    #[must_use]
    pub fn new(api: Option<Arc<dyn AuthApi>>, site_url: impl Into<String>, cookie_secure: bool) -> Self {
        Self { api, events: AuthEvents::default(), site_url: site_url.into(), cookie_secure }
    }

    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.site_url)
    }

    /// Session client bound to this request's cookies, or `None` when the
    /// provider is not configured.
    #[must_use]
    pub fn request_client(&self, options: ClientOptions, jar: CookieJar) -> Option<RequestClient> {
        let api = Arc::clone(self.api.as_ref()?);
        let cookies = Arc::new(CookieStorage::new(jar, self.cookie_secure));
        let storage: Arc<dyn SessionStorage> = cookies.clone();
        let client = SessionClient::new(api, options, storage, self.events.clone());
        Some(RequestClient { client, cookies })
    }
}

/// A session client plus the cookie storage it writes into.
pub struct RequestClient {
    pub client: SessionClient,
    cookies: Arc<CookieStorage>,
}

impl RequestClient {
    /// Cookie jar carrying every storage write made so far.
    #[must_use]
    pub fn jar(&self) -> CookieJar {
        self.cookies.jar()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum_extra::extract::cookie::Cookie;
    use uuid::Uuid;

    use super::*;
    use crate::services::gotrue::{AuthorizeRequest, build_authorize_url};
    use crate::services::storage::encode_cookie_value;
    use crate::services::types::{AuthError, Session, SignUpResponse, User};

    pub const TEST_PROJECT_REF: &str = "test";
    pub const SESSION_COOKIE: &str = "sb-test-auth-token";
    pub const VERIFIER_COOKIE: &str = "sb-test-auth-token-code-verifier";

    fn not_configured() -> AuthError {
        AuthError::Api { status: 500, message: "mock response not configured".into() }
    }

    /// In-memory provider with canned responses and a call log.
    #[derive(Default)]
    pub struct MockAuthApi {
        pub sign_up: Mutex<Option<Result<SignUpResponse, AuthError>>>,
        pub password: Mutex<Option<Result<Session, AuthError>>>,
        pub exchange: Mutex<Option<Result<Option<Session>, AuthError>>>,
        pub refresh: Mutex<Option<Result<Session, AuthError>>>,
        pub sign_out: Mutex<Option<Result<(), AuthError>>>,
        pub user: Mutex<Option<Result<User, AuthError>>>,
        /// Panic inside `exchange_code` instead of answering.
        pub panic_on_exchange: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockAuthApi {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        #[must_use]
        pub fn with_exchange(self, result: Result<Option<Session>, AuthError>) -> Self {
            *self.exchange.lock().unwrap() = Some(result);
            self
        }

        #[must_use]
        pub fn with_password(self, result: Result<Session, AuthError>) -> Self {
            *self.password.lock().unwrap() = Some(result);
            self
        }

        #[must_use]
        pub fn with_sign_up(self, result: Result<SignUpResponse, AuthError>) -> Self {
            *self.sign_up.lock().unwrap() = Some(result);
            self
        }

        #[must_use]
        pub fn with_refresh(self, result: Result<Session, AuthError>) -> Self {
            *self.refresh.lock().unwrap() = Some(result);
            self
        }

        #[must_use]
        pub fn with_sign_out(self, result: Result<(), AuthError>) -> Self {
            *self.sign_out.lock().unwrap() = Some(result);
            self
        }

        #[must_use]
        pub fn with_user(self, result: Result<User, AuthError>) -> Self {
            *self.user.lock().unwrap() = Some(result);
            self
        }
    }

    #[async_trait]
    impl AuthApi for MockAuthApi {
        fn project_ref(&self) -> &str {
            TEST_PROJECT_REF
        }

        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
            redirect_to: &str,
            _code_challenge: &str,
        ) -> Result<SignUpResponse, AuthError> {
            self.record(format!("sign_up:{email}:{redirect_to}"));
            self.sign_up.lock().unwrap().clone().unwrap_or_else(|| Err(not_configured()))
        }

        async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, AuthError> {
            self.record(format!("password:{email}"));
            self.password.lock().unwrap().clone().unwrap_or_else(|| Err(not_configured()))
        }

        fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> String {
            build_authorize_url("https://test.supabase.co/auth/v1", request)
        }

        async fn exchange_code(&self, auth_code: &str, code_verifier: &str) -> Result<Option<Session>, AuthError> {
            self.record(format!("exchange:{auth_code}:{code_verifier}"));
            assert!(!self.panic_on_exchange, "provider client blew up");
            self.exchange.lock().unwrap().clone().unwrap_or_else(|| Err(not_configured()))
        }

        async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
            self.record(format!("refresh:{refresh_token}"));
            self.refresh.lock().unwrap().clone().unwrap_or_else(|| Err(not_configured()))
        }

        async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
            self.record(format!("sign_out:{access_token}"));
            self.sign_out.lock().unwrap().clone().unwrap_or(Ok(()))
        }

        async fn get_user(&self, access_token: &str) -> Result<User, AuthError> {
            self.record(format!("get_user:{access_token}"));
            self.user.lock().unwrap().clone().unwrap_or_else(|| Err(not_configured()))
        }
    }

    #[must_use]
    pub fn test_user(email: &str) -> User {
        User { id: Uuid::new_v4(), email: Some(email.to_string()), user_metadata: serde_json::json!({}) }
    }

    /// Session valid for an hour.
    #[must_use]
    pub fn test_session(email: &str) -> Session {
        Session {
            access_token: format!("access-{email}"),
            refresh_token: format!("refresh-{email}"),
            token_type: "bearer".into(),
            expires_in: 3600,
            expires_at: Some(crate::services::gotrue::unix_now() + 3600),
            user: test_user(email),
        }
    }

    #[must_use]
    pub fn expired_session(email: &str) -> Session {
        Session { expires_at: Some(crate::services::gotrue::unix_now() - 60), ..test_session(email) }
    }

    #[must_use]
    pub fn test_app_state(api: Arc<MockAuthApi>) -> AppState {
        AppState::new(Some(api as Arc<dyn AuthApi>), "http://localhost:3000", false)
    }

    #[must_use]
    pub fn unconfigured_app_state() -> AppState {
        AppState::new(None, "http://localhost:3000", false)
    }

    /// Jar holding `session` the way the browser client stores it.
    #[must_use]
    pub fn jar_with_session(session: &Session) -> CookieJar {
        let raw = serde_json::to_string(session).unwrap();
        CookieJar::new().add(Cookie::new(SESSION_COOKIE, encode_cookie_value(&raw)))
    }

    /// `Cookie` request header value carrying `session`.
    #[must_use]
    pub fn session_cookie_header(session: &Session) -> String {
        let raw = serde_json::to_string(session).unwrap();
        format!("{SESSION_COOKIE}={}", encode_cookie_value(&raw))
    }

    #[must_use]
    pub fn verifier_cookie_header(verifier: &str) -> String {
        format!("{VERIFIER_COOKIE}={}", encode_cookie_value(verifier))
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
