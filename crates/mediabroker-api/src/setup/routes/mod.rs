//! Route configuration and setup.
//!
//! Public routes (download, proxied upload, health) are composed without the
//! auth layer; record creation and upload confirmation require a bearer token.

mod health;

use crate::auth::middleware::{auth_middleware, AuthState};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use mediabroker_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = Arc::new(AuthState::new(&config.jwt_secret));

    let public_routes = public_routes(state.clone());
    let protected_routes = protected_routes(state.clone()).layer(
        axum::middleware::from_fn_with_state(auth_state, auth_middleware),
    );

    let app = public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(config.max_upload_size_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

fn public_routes(state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/media/download", get(crate::handlers::download::download))
        .route(
            "/media/upload-redirect/{media_id}",
            put(crate::handlers::upload_redirect::upload_redirect),
        )
        .route(
            "/health/live",
            get({
                let state = state.clone();
                move || health::liveness_check(state.clone())
            }),
        )
        .route(
            "/health/ready",
            get({
                let state = state.clone();
                move || health::readiness_check(state.clone())
            }),
        )
        .with_state(state)
}

fn protected_routes(state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route(
            "/media/create",
            post(crate::handlers::media_create::create_media),
        )
        .route(
            "/media/{media_id}/loading-end",
            post(crate::handlers::loading_end::loading_end),
        )
        .with_state(state)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|origin| {
                origin
                    .parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers(Any)
    };
    Ok(cors)
}
