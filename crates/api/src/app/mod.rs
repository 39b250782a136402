//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store wiring (in-memory or Postgres)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use releasehub_auth::Hs256JwtValidator;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router from process configuration (used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = services::build_services(&config.store).await?;
    Ok(router_with(services, config.jwt_secret_or_dev_default()))
}

/// Build the router around already-constructed services.
///
/// Stores are injected here once; handlers reach them through the
/// `Arc<AppServices>` extension, never through globals.
pub fn router_with(services: AppServices, jwt_secret: &str) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
