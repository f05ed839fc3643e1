//! Server-rendered views.
//!
//! Each page module owns the view state for one screen (login form,
//! dashboard, error, debug) and renders it to a bare HTML document. Route
//! handlers drive the state and pick between rendering and redirecting.

pub mod auth_error;
pub mod dashboard;
pub mod debug;
pub mod login;

use axum::response::Html;

/// Escape text for an HTML body.
pub(crate) fn text(raw: &str) -> String {
    html_escape::encode_text(raw).into_owned()
}

/// Escape text for a double-quoted attribute.
pub(crate) fn attr(raw: &str) -> String {
    html_escape::encode_double_quoted_attribute(raw).into_owned()
}

pub(crate) fn notice(class: &str, body: Option<&str>) -> String {
    body.map(|body| format!(r#"<div class="{class}" role="status">{}</div>"#, text(body)))
        .unwrap_or_default()
}

/// Wrap `body` in the shared document shell.
pub(crate) fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<main>
{body}
</main>
</body>
</html>
"#,
        title = text(title),
    ))
}
