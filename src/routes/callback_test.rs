use std::sync::Arc;

use axum::http::StatusCode;

use super::*;
use crate::routes::app;
use crate::routes::test_support::*;
use crate::services::types::AuthError;
use crate::state::test_helpers::*;

// =============================================================================
// redirect_target / CallbackError::location
// =============================================================================

#[test]
fn target_defaults_to_dashboard() {
    assert_eq!(redirect_target(&CallbackQuery::default()), "/dashboard");
}

#[test]
fn target_prefers_next_over_redirect_to() {
    let query = CallbackQuery { next: Some("/settings".into()), redirect_to: Some("/other".into()), ..Default::default() };
    assert_eq!(redirect_target(&query), "/settings");
    let query = CallbackQuery { redirect_to: Some("/other".into()), ..Default::default() };
    assert_eq!(redirect_target(&query), "/other");
}

#[test]
fn target_rejects_off_site_urls() {
    for bad in [
        "https://evil.example",
        "//evil.example",
        "/\\evil.example",
        "dashboard",
        "/\t/evil.example",
        "/a\nb",
        "/\r\n/evil.example",
    ] {
        let query = CallbackQuery { next: Some(bad.into()), ..Default::default() };
        assert_eq!(redirect_target(&query), "/dashboard", "accepted {bad:?}");
    }
}

#[test]
fn error_locations() {
    assert_eq!(CallbackError::Provider("User denied".into()).location(), "/auth/auth-code-error?error=User%20denied");
    assert_eq!(CallbackError::Config.location(), "/auth/auth-code-error?error=config");
    assert_eq!(CallbackError::MissingSession.location(), "/auth/auth-code-error?error=no_session");
    assert!(
        CallbackError::MissingCode
            .location()
            .starts_with("/auth/auth-code-error?error=no_code&message=")
    );
}

#[test]
fn panic_message_reads_str_and_string_payloads() {
    assert_eq!(panic_message(&"boom"), "boom");
    assert_eq!(panic_message(&String::from("bang")), "bang");
    assert_eq!(panic_message(&42_u8), "Unknown error");
}

// =============================================================================
// handler
// =============================================================================

#[tokio::test]
async fn provider_error_redirects_without_exchange() {
    let api = Arc::new(MockAuthApi::default());
    let app = app(test_app_state(Arc::clone(&api)));
    let resp = send(app, get("/auth/callback?error=access_denied&error_description=User+denied", None)).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/auth/auth-code-error?error=User%20denied");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn provider_error_without_description_keeps_code() {
    let api = Arc::new(MockAuthApi::default());
    let resp = send(app(test_app_state(Arc::clone(&api))), get("/auth/callback?error=access_denied&code=abc", None)).await;
    assert_eq!(location(&resp), "/auth/auth-code-error?error=access_denied");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn missing_code_is_tagged() {
    let api = Arc::new(MockAuthApi::default());
    let resp = send(app(test_app_state(Arc::clone(&api))), get("/auth/callback", None)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&resp).starts_with("/auth/auth-code-error?error=no_code"));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn unconfigured_provider_redirects_with_config_tag() {
    let resp = send(app(unconfigured_app_state()), get("/auth/callback?code=abc123", None)).await;
    assert_eq!(location(&resp), "/auth/auth-code-error?error=config");
}

#[tokio::test]
async fn successful_exchange_redirects_to_dashboard_without_cache() {
    let session = test_session("gh@example.com");
    let api = Arc::new(MockAuthApi::default().with_exchange(Ok(Some(session))));
    let resp = send(
        app(test_app_state(Arc::clone(&api))),
        get("/auth/callback?code=abc123", Some(&verifier_cookie_header("verifier-1"))),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/dashboard");
    assert_eq!(
        header_value(&resp, header::CACHE_CONTROL),
        Some("no-cache, no-store, must-revalidate")
    );
    assert_eq!(header_value(&resp, header::PRAGMA), Some("no-cache"));
    assert_eq!(header_value(&resp, header::EXPIRES), Some("0"));
    assert_eq!(api.calls(), vec!["exchange:abc123:verifier-1".to_string()]);

    let cookies = set_cookies(&resp);
    assert!(cookies.iter().any(|c| c.starts_with(&format!("{SESSION_COOKIE}=base64-"))));
}

#[tokio::test]
async fn successful_exchange_honours_next() {
    let api = Arc::new(MockAuthApi::default().with_exchange(Ok(Some(test_session("gh@example.com")))));
    let resp = send(
        app(test_app_state(api)),
        get("/auth/callback?code=abc&next=%2Fprofile", Some(&verifier_cookie_header("v"))),
    )
    .await;
    assert_eq!(location(&resp), "/profile");
}

#[tokio::test]
async fn next_with_control_characters_falls_back_to_dashboard() {
    for next in ["%2F%09%2Fevil.example", "%2Fa%0Ab"] {
        let api = Arc::new(MockAuthApi::default().with_exchange(Ok(Some(test_session("gh@example.com")))));
        let resp = send(
            app(test_app_state(api)),
            get(&format!("/auth/callback?code=abc&next={next}"), Some(&verifier_cookie_header("v"))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT, "next={next}");
        assert_eq!(location(&resp), "/dashboard", "next={next}");
    }
}

#[tokio::test]
async fn rejected_before_exchange_leaves_cookies_alone() {
    let api = Arc::new(MockAuthApi::default());
    let resp = send(
        app(test_app_state(Arc::clone(&api))),
        get("/auth/callback?error=access_denied", Some(&verifier_cookie_header("v"))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(set_cookies(&resp).is_empty());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn failed_exchange_carries_message_and_sets_no_session() {
    let err = AuthError::Api { status: 400, message: "invalid flow state, no valid flow state found".into() };
    let api = Arc::new(MockAuthApi::default().with_exchange(Err(err)));
    let resp = send(
        app(test_app_state(api)),
        get("/auth/callback?code=expired", Some(&verifier_cookie_header("v"))),
    )
    .await;

    assert_eq!(
        location(&resp),
        "/auth/auth-code-error?error=invalid%20flow%20state%2C%20no%20valid%20flow%20state%20found"
    );
    assert!(header_value(&resp, header::CACHE_CONTROL).is_none());
    let cookies = set_cookies(&resp);
    assert!(!cookies.iter().any(|c| c.starts_with(&format!("{SESSION_COOKIE}="))));
}

#[tokio::test]
async fn exchange_without_verifier_fails_cleanly() {
    let api = Arc::new(MockAuthApi::default());
    let resp = send(app(test_app_state(Arc::clone(&api))), get("/auth/callback?code=abc", None)).await;
    assert_eq!(
        location(&resp),
        "/auth/auth-code-error?error=code%20verifier%20not%20found%20in%20storage"
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn exchange_without_session_is_tagged() {
    let api = Arc::new(MockAuthApi::default().with_exchange(Ok(None)));
    let resp = send(app(test_app_state(api)), get("/auth/callback?code=abc", Some(&verifier_cookie_header("v")))).await;
    assert_eq!(location(&resp), "/auth/auth-code-error?error=no_session");
}

#[tokio::test]
async fn panicking_exchange_still_redirects() {
    let api = Arc::new(MockAuthApi { panic_on_exchange: true, ..Default::default() });
    let resp = send(app(test_app_state(api)), get("/auth/callback?code=abc", Some(&verifier_cookie_header("v")))).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/auth/auth-code-error?error=provider%20client%20blew%20up");
}

#[tokio::test]
async fn successful_exchange_notifies_subscribers() {
    let session = test_session("gh@example.com");
    let api = Arc::new(MockAuthApi::default().with_exchange(Ok(Some(session.clone()))));
    let state = test_app_state(api);
    let mut sub = state.events.subscribe();
    send(app(state), get("/auth/callback?code=abc", Some(&verifier_cookie_header("v")))).await;
    let change = sub.recv().await.unwrap();
    assert_eq!(change.user_id, session.user.id);
}
