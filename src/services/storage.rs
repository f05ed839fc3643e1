//! Session storage backends.
//!
//! The session client persists the current session and the pending PKCE code
//! verifier under provider-namespaced keys (`sb-<ref>-auth-token`,
//! `sb-<ref>-auth-token-code-verifier`). In the browser those keys live in
//! cookies; a server-side client keeps them in memory for one call site.
//!
//! Cookie values are `base64-` prefixed URL-safe base64 so that JSON survives
//! the cookie value grammar.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Prefix shared by every provider-owned storage key.
pub const STORAGE_KEY_PREFIX: &str = "sb-";
const BASE64_PREFIX: &str = "base64-";

pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
    /// All keys with their decoded values, sorted by key.
    fn entries(&self) -> Vec<(String, String)>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local storage; discarded with the client that owns it.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        lock(&self.items).insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        lock(&self.items).remove(key);
    }

    fn entries(&self) -> Vec<(String, String)> {
        lock(&self.items)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// =============================================================================
// COOKIES
// =============================================================================

/// Storage over the request's cookie jar. Writes accumulate in the jar's
/// delta; the handler returns [`CookieStorage::jar`] with its response.
#[derive(Debug)]
pub struct CookieStorage {
    jar: Mutex<CookieJar>,
    secure: bool,
}

impl CookieStorage {
    #[must_use]
    pub fn new(jar: CookieJar, secure: bool) -> Self {
        Self { jar: Mutex::new(jar), secure }
    }

    /// Snapshot of the jar including every pending `Set-Cookie`.
    #[must_use]
    pub fn jar(&self) -> CookieJar {
        lock(&self.jar).clone()
    }

    fn build(&self, key: &str, value: String) -> Cookie<'static> {
        Cookie::build((key.to_string(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

pub(crate) fn encode_cookie_value(value: &str) -> String {
    format!("{BASE64_PREFIX}{}", URL_SAFE_NO_PAD.encode(value))
}

pub(crate) fn decode_cookie_value(raw: &str) -> Option<String> {
    match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => URL_SAFE_NO_PAD
            .decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok()),
        None => Some(raw.to_string()),
    }
}

impl SessionStorage for CookieStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let jar = lock(&self.jar);
        let raw = jar.get(key).map(Cookie::value)?;
        if raw.is_empty() {
            return None;
        }
        decode_cookie_value(raw)
    }

    fn set_item(&self, key: &str, value: &str) {
        let cookie = self.build(key, encode_cookie_value(value));
        let mut jar = lock(&self.jar);
        *jar = jar.clone().add(cookie);
    }

    fn remove_item(&self, key: &str) {
        let cookie = self.build(key, String::new());
        let mut jar = lock(&self.jar);
        *jar = jar.clone().remove(cookie);
    }

    fn entries(&self) -> Vec<(String, String)> {
        let jar = lock(&self.jar);
        let mut entries: Vec<(String, String)> = jar
            .iter()
            .filter(|c| !c.value().is_empty())
            .filter_map(|c| decode_cookie_value(c.value()).map(|v| (c.name().to_string(), v)))
            .collect();
        entries.sort();
        entries
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
