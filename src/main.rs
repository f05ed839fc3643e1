mod config;
mod pages;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::gotrue::{AuthApi, GoTrueApi};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    // Missing provider settings leave the pages up with sign-in disabled.
    let api: Option<Arc<dyn AuthApi>> = match &config.provider {
        Ok(provider) => {
            let api = GoTrueApi::new(provider).expect("auth client init failed");
            tracing::info!(project_ref = api.project_ref(), "auth provider configured");
            Some(Arc::new(api) as Arc<dyn AuthApi>)
        }
        Err(e) => {
            tracing::warn!(error = %e, "auth provider not configured; sign-in disabled");
            None
        }
    };
    let state = state::AppState::new(api, config.site_url.clone(), config.cookie_secure);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, site_url = %config.site_url, "gatehouse listening");
    axum::serve(listener, app).await.expect("server failed");
}
