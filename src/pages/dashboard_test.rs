use super::*;
use crate::state::test_helpers::*;

fn signed_in(email: &str) -> AuthChange {
    let session = test_session(email);
    AuthChange { event: AuthEvent::SignedIn, user_id: session.user.id, session: Some(session) }
}

#[test]
fn starts_loading() {
    let view = DashboardView::new();
    assert_eq!(view.state, DashboardState::Loading);
    assert!(view.render().0.contains("Loading"));
}

#[test]
fn mount_with_session_is_authenticated() {
    let session = test_session("ada@example.com");
    let mut view = DashboardView::new();
    view.on_session_check(Ok(Some(session.clone())));
    assert_eq!(view.user(), Some(&session.user));
    let html = view.render().0;
    assert!(html.contains("ada@example.com"));
    assert!(html.contains(&session.user.id.to_string()));
}

#[test]
fn mount_without_session_redirects_without_user_content() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(None));
    assert!(view.is_redirecting());
    assert!(view.user().is_none());
    assert!(!view.render().0.contains("Sign out"));
}

#[test]
fn mount_with_failed_check_redirects_with_error() {
    let mut view = DashboardView::new();
    view.on_session_check(Err(AuthError::Transport("timeout".into())));
    assert!(view.is_redirecting());
    assert_eq!(view.redirect_location(), "/?error=Unable%20to%20retrieve%20session");
}

#[test]
fn signed_out_event_redirects_regardless_of_user() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(Some(test_session("ada@example.com"))));
    let change = AuthChange { event: AuthEvent::SignedOut, user_id: view.user().unwrap().id, session: None };
    assert_eq!(view.on_auth_change(&change), &DashboardState::Redirecting);
}

#[test]
fn signed_out_event_with_stale_session_still_redirects() {
    let mut view = DashboardView::new();
    let mut change = signed_in("ada@example.com");
    change.event = AuthEvent::SignedOut;
    assert_eq!(view.on_auth_change(&change), &DashboardState::Redirecting);
}

#[test]
fn latest_write_wins() {
    let mut view = DashboardView::new();
    let event = signed_in("event@example.com");
    view.on_auth_change(&event);
    view.on_session_check(Ok(Some(test_session("check@example.com"))));
    assert_eq!(view.user().unwrap().email.as_deref(), Some("check@example.com"));

    let later = signed_in("later@example.com");
    view.on_auth_change(&later);
    assert_eq!(view.user().unwrap().email.as_deref(), Some("later@example.com"));
}

#[test]
fn event_can_authenticate_a_redirecting_view() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(None));
    view.on_auth_change(&signed_in("ada@example.com"));
    assert!(view.user().is_some());
}

#[test]
fn change_without_session_redirects() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(Some(test_session("ada@example.com"))));
    let change = AuthChange { event: AuthEvent::UserUpdated, user_id: view.user().unwrap().id, session: None };
    assert!(view.on_auth_change(&change) == &DashboardState::Redirecting);
}

#[test]
fn sign_out_failure_keeps_error_but_navigates() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(Some(test_session("ada@example.com"))));
    view.on_sign_out(Err(AuthError::Transport("offline".into())));
    assert!(view.is_redirecting());
    assert_eq!(
        view.redirect_location(),
        "/?error=Failed%20to%20sign%20out%3A%20auth%20request%20failed%3A%20offline"
    );
}

#[test]
fn sign_out_success_navigates_without_error() {
    let mut view = DashboardView::new();
    view.on_sign_out(Ok(()));
    assert!(view.is_redirecting());
    assert_eq!(view.redirect_location(), "/");
}

#[test]
fn authenticated_render_subscribes_to_events() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(Some(test_session("ada@example.com"))));
    assert!(view.render().0.contains(EVENTS_PATH));
}

#[test]
fn loaded_profile_replaces_stored_user() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(Some(test_session("old@example.com"))));
    view.on_user_loaded(Ok(Some(test_user("new@example.com"))));
    assert_eq!(view.user().unwrap().email.as_deref(), Some("new@example.com"));
}

#[test]
fn failed_profile_load_keeps_stored_user() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(Some(test_session("ada@example.com"))));
    view.on_user_loaded(Err(AuthError::Transport("timeout".into())));
    assert_eq!(view.user().unwrap().email.as_deref(), Some("ada@example.com"));
    assert_eq!(view.redirect_location(), "/");
}

#[test]
fn redirect_location_carries_error() {
    let mut view = DashboardView::new();
    view.on_session_check(Ok(None));
    assert_eq!(view.redirect_location(), "/");
    view.on_session_check(Err(AuthError::Transport("timeout".into())));
    assert_eq!(view.redirect_location(), "/?error=Unable%20to%20retrieve%20session");
}

#[test]
fn render_shows_avatar_when_present() {
    let mut session = test_session("ada@example.com");
    session.user.user_metadata = serde_json::json!({ "avatar_url": "https://avatars.example/ada.png" });
    let mut view = DashboardView::new();
    view.on_session_check(Ok(Some(session)));
    assert!(view.render().0.contains(r#"<img src="https://avatars.example/ada.png""#));
}
