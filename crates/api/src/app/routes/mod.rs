use axum::Router;

pub mod releases;
pub mod system;

/// Router for the resource endpoints. Authentication is optional at this
/// level; individual handlers demand it through their extractors.
pub fn router() -> Router {
    Router::new().nest("/releases", releases::router())
}
