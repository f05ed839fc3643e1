//! Runtime configuration parsed from environment variables.
//!
//! The auth provider settings are optional at boot: a missing URL or anon key
//! leaves the site up, and every auth entry point reports the gap instead
//! (the OAuth callback redirects with `error=config`).

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_AUTH_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AUTH_CONNECT_TIMEOUT_SECS: u64 = 10;

const URL_VARS: [&str; 2] = ["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"];
const ANON_KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {var}")]
    Missing { var: String },
    #[error("invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|raw| parse_bool(&raw))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_AUTH_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_AUTH_CONNECT_TIMEOUT_SECS }
    }
}

/// Hosted auth provider endpoint and public credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub url: String,
    pub anon_key: String,
    pub timeouts: HttpTimeouts,
}

impl ProviderConfig {
    /// Load from `SUPABASE_URL` / `SUPABASE_ANON_KEY` (or their
    /// `NEXT_PUBLIC_` aliases).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when either value is absent or blank,
    /// and [`ConfigError::Invalid`] when the URL is not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProviderConfig::from_env`] but reading through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ProviderConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = first_present(&lookup, &URL_VARS)
            .ok_or_else(|| ConfigError::Missing { var: URL_VARS[0].into() })?
            .trim_end_matches('/')
            .to_string();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid { var: URL_VARS[0].into(), value: url });
        }
        let anon_key =
            first_present(&lookup, &ANON_KEY_VARS).ok_or_else(|| ConfigError::Missing { var: ANON_KEY_VARS[0].into() })?;

        let timeouts = HttpTimeouts {
            request_secs: parse_u64(&lookup, "AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_AUTH_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_AUTH_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { url, anon_key, timeouts })
    }

    /// Project reference used to namespace storage keys: the first DNS label
    /// of the provider host (`https://abcd.supabase.co` -> `abcd`).
    #[must_use]
    pub fn project_ref(&self) -> String {
        project_ref_from_url(&self.url)
    }
}

pub(crate) fn project_ref_from_url(url: &str) -> String {
    let host = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = host.split(['/', ':']).next().unwrap_or_default();
    host.split('.').next().unwrap_or_default().to_string()
}

fn first_present(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// Process-wide settings assembled once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Public origin of this site, used to build callback URLs.
    pub site_url: String,
    pub cookie_secure: bool,
    /// `Err` keeps the reason around for logging; auth is disabled.
    pub provider: Result<ProviderConfig, ConfigError>,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is set but not a valid port.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT".into(), value: raw })?,
            Err(_) => DEFAULT_PORT,
        };
        let site_url = std::env::var("SITE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{port}"));
        let cookie_secure = env_bool("COOKIE_SECURE").unwrap_or_else(|| site_url.starts_with("https://"));

        Ok(Self { port, site_url, cookie_secure, provider: ProviderConfig::from_env() })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
