//! Session client: the single entry point views use to talk to the provider.
//!
//! ARCHITECTURE
//! ============
//! A `SessionClient` is built per call site from explicit parts: the provider
//! transport, a `ClientOptions`, a storage backend and the shared event hub.
//! There is no global client. Browser-facing handlers pass cookie storage with
//! `ClientOptions::browser()`; server-only work uses `ClientOptions::server()`,
//! which keeps the session in memory and never writes it to storage.
//!
//! PKCE
//! ====
//! Sign-up and OAuth initiation store a random code verifier under
//! `<storage-key>-code-verifier`; the callback exchange reads it back and
//! removes it whatever the outcome.

use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

use super::events::{AuthEvents, Subscription};
use super::gotrue::{AuthApi, AuthorizeRequest, unix_now};
use super::storage::SessionStorage;
use super::types::{AuthChange, AuthError, AuthEvent, OAuthProvider, Session, SignUpResponse, User};

/// Seconds before `expires_at` at which a session counts as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 10;

/// Per-call-site client behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Write sessions to storage. Off for server-side clients.
    pub persist_session: bool,
    /// Refresh an expired session on read instead of reporting none.
    pub auto_refresh_token: bool,
}

impl ClientOptions {
    #[must_use]
    pub const fn server() -> Self {
        Self { persist_session: false, auto_refresh_token: true }
    }

    #[must_use]
    pub const fn browser() -> Self {
        Self { persist_session: true, auto_refresh_token: true }
    }
}

/// PKCE verifier/challenge pair.
#[derive(Debug, Clone)]
pub(crate) struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

pub(crate) fn generate_pkce() -> Pkce {
    let bytes: [u8; 32] = rand::rng().random();
    let verifier = URL_SAFE_NO_PAD.encode(bytes);
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
    Pkce { verifier, challenge }
}

pub struct SessionClient {
    api: Arc<dyn AuthApi>,
    options: ClientOptions,
    storage: Arc<dyn SessionStorage>,
    events: AuthEvents,
    /// Session slot used when `persist_session` is off.
    memory: Mutex<Option<Session>>,
}

impl SessionClient {
    #[must_use]
    pub fn new(
        api: Arc<dyn AuthApi>,
        options: ClientOptions,
        storage: Arc<dyn SessionStorage>,
        events: AuthEvents,
    ) -> Self {
        Self { api, options, storage, events, memory: Mutex::new(None) }
    }

    /// `sb-<project-ref>-auth-token`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("sb-{}-auth-token", self.api.project_ref())
    }

    fn verifier_key(&self) -> String {
        format!("{}-code-verifier", self.storage_key())
    }

    // =========================================================================
    // SESSION SLOT
    // =========================================================================

    fn load_session(&self) -> Result<Option<Session>, AuthError> {
        if !self.options.persist_session {
            return Ok(self.memory.lock().unwrap_or_else(PoisonError::into_inner).clone());
        }
        let Some(raw) = self.storage.get_item(&self.storage_key()) else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| AuthError::Decode(format!("stored session: {e}")))
    }

    fn save_session(&self, session: &Session) {
        if !self.options.persist_session {
            *self.memory.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
            return;
        }
        match serde_json::to_string(session) {
            Ok(raw) => self.storage.set_item(&self.storage_key(), &raw),
            Err(e) => tracing::error!(error = %e, "failed to serialize session"),
        }
    }

    fn clear_session(&self) {
        *self.memory.lock().unwrap_or_else(PoisonError::into_inner) = None;
        if self.options.persist_session {
            self.storage.remove_item(&self.storage_key());
        }
    }

    fn notify(&self, event: AuthEvent, user_id: uuid::Uuid, session: Option<Session>) {
        self.events.emit(AuthChange { event, user_id, session });
    }

    fn establish(&self, session: Session, event: AuthEvent) -> Session {
        self.save_session(&session);
        self.notify(event, session.user.id, Some(session.clone()));
        session
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Create an account. `redirect_to` is where the confirmation email lands.
    ///
    /// # Errors
    ///
    /// Returns the provider's rejection (duplicate account, weak password, ..).
    pub async fn sign_up(&self, email: &str, password: &str, redirect_to: &str) -> Result<SignUpResponse, AuthError> {
        let pkce = generate_pkce();
        self.storage.set_item(&self.verifier_key(), &pkce.verifier);

        let resp = self
            .api
            .sign_up(email, password, redirect_to, &pkce.challenge)
            .await?;
        if let Some(session) = &resp.session {
            self.establish(session.clone(), AuthEvent::SignedIn);
        }
        Ok(resp)
    }

    /// # Errors
    ///
    /// Returns the provider's rejection, typically invalid credentials.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.api.sign_in_with_password(email, password).await?;
        tracing::info!(user_id = %session.user.id, "password sign-in");
        Ok(self.establish(session, AuthEvent::SignedIn))
    }

    /// Prepare an OAuth redirect: stores a fresh code verifier and returns the
    /// provider authorize URL the browser should be sent to.
    #[must_use]
    pub fn sign_in_with_oauth(&self, provider: OAuthProvider, redirect_to: &str) -> String {
        let pkce = generate_pkce();
        self.storage.set_item(&self.verifier_key(), &pkce.verifier);
        self.api.authorize_url(&AuthorizeRequest { provider, redirect_to, code_challenge: &pkce.challenge })
    }

    /// Exchange an authorization code using the stored code verifier.
    /// `Ok(None)` means the provider accepted the code but sent no session.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingCodeVerifier`] if no flow was started from this
    /// browser, otherwise the provider's rejection.
    pub async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Option<Session>, AuthError> {
        let verifier_key = self.verifier_key();
        let verifier = self.storage.get_item(&verifier_key);
        self.storage.remove_item(&verifier_key);
        let verifier = verifier.filter(|v| !v.is_empty()).ok_or(AuthError::MissingCodeVerifier)?;

        let session = self.api.exchange_code(auth_code, &verifier).await?;
        Ok(session.map(|session| self.establish(session, AuthEvent::SignedIn)))
    }

    /// Current session, refreshed first when it has expired and
    /// `auto_refresh_token` is on.
    ///
    /// # Errors
    ///
    /// [`AuthError::Decode`] for an unreadable stored session, or the
    /// provider's refresh rejection (the stale session is removed).
    pub async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.load_session()? else {
            return Ok(None);
        };
        if !session.is_expired(unix_now(), EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }
        if !self.options.auto_refresh_token {
            return Ok(None);
        }

        match self.api.refresh_session(&session.refresh_token).await {
            Ok(refreshed) => Ok(Some(self.establish(refreshed, AuthEvent::TokenRefreshed))),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %session.user.id, "session refresh failed");
                self.clear_session();
                self.notify(AuthEvent::SignedOut, session.user.id, None);
                Err(e)
            }
        }
    }

    /// Stored session as-is: no refresh, no writes.
    ///
    /// # Errors
    ///
    /// [`AuthError::Decode`] for an unreadable stored session.
    pub fn peek_session(&self) -> Result<Option<Session>, AuthError> {
        self.load_session()
    }

    /// Fetch the user from the provider. When the profile changed since the
    /// session was stored, the session is updated and `USER_UPDATED` emitted.
    ///
    /// # Errors
    ///
    /// Same as [`SessionClient::get_session`], plus the provider's rejection
    /// of the access token.
    pub async fn get_user(&self) -> Result<Option<User>, AuthError> {
        let Some(mut session) = self.get_session().await? else {
            return Ok(None);
        };
        let user = self.api.get_user(&session.access_token).await?;
        if user != session.user {
            session.user = user.clone();
            self.establish(session, AuthEvent::UserUpdated);
        }
        Ok(Some(user))
    }

    /// Revoke the session at the provider and drop it locally. The local copy
    /// is removed even when the provider call fails so the browser is never
    /// left half signed in.
    ///
    /// # Errors
    ///
    /// Returns the provider's error after local cleanup.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = match self.load_session() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable session on sign-out");
                None
            }
        };
        let result = match &session {
            Some(session) => self.api.sign_out(&session.access_token).await,
            None => Ok(()),
        };

        self.clear_session();
        self.storage.remove_item(&self.verifier_key());
        if let Some(session) = session {
            tracing::info!(user_id = %session.user.id, "signed out");
            self.notify(AuthEvent::SignedOut, session.user.id, None);
        }
        result
    }

    /// Listen for auth changes until the returned handle is dropped.
    #[must_use]
    pub fn on_auth_state_change(&self) -> Subscription {
        self.events.subscribe()
    }

    /// Provider-owned storage entries (`sb-` keys), for inspection only.
    #[must_use]
    pub fn storage_entries(&self) -> Vec<(String, String)> {
        self.storage
            .entries()
            .into_iter()
            .filter(|(k, _)| k.starts_with(super::storage::STORAGE_KEY_PREFIX))
            .collect()
    }
}

#[cfg(test)]
#[path = "session_client_test.rs"]
mod tests;
