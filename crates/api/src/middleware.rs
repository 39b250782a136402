use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use releasehub_auth::JwtValidator;

use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Resolve the caller from the bearer token, if any.
///
/// Anonymous requests pass through untouched; routes that need a caller
/// reject them with the `CurrentUser` extractor.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let principal = extract_bearer(req.headers()).and_then(|token| {
        match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => Some(PrincipalContext::new(claims.sub)),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid bearer token");
                None
            }
        }
    });

    if let Some(principal) = principal {
        req.extensions_mut().insert(principal);
    }

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }
    Some(token)
}
