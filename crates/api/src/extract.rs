//! Request pipeline steps expressed as extractors.
//!
//! Axum runs extractors in argument order, so a handler that takes
//! `OwnedRelease` gets the full chain:
//!
//! ```text
//! CurrentUser (401) → LoadedRelease (400/404/500) → ownership guard (403)
//! ```
//!
//! Each step yields a small context value instead of mutating shared state.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use releasehub_core::ReleaseId;
use releasehub_infra::{PopulatedRelease, ReleaseStore};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

/// The authenticated caller. Rejects anonymous requests with 401.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub PrincipalContext);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalContext>()
            .copied()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// The release named by the `:release_id` path parameter, owner populated.
#[derive(Debug, Clone)]
pub struct LoadedRelease(pub PopulatedRelease);

#[async_trait]
impl<S> FromRequestParts<S> for LoadedRelease
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(loaded) = parts.extensions.get::<LoadedRelease>() {
            return Ok(loaded.clone());
        }

        let Path(raw_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let id: ReleaseId = raw_id
            .parse()
            .map_err(|_| ApiError::InvalidId(raw_id.clone()))?;

        let services = parts
            .extensions
            .get::<Arc<AppServices>>()
            .cloned()
            .ok_or(ApiError::Internal("application services are not installed"))?;

        let found = services
            .releases
            .find(id)
            .await
            .map_err(ApiError::Lookup)?
            .ok_or(ApiError::ReleaseNotFound(raw_id))?;

        let loaded = LoadedRelease(found);
        parts.extensions.insert(loaded.clone());
        Ok(loaded)
    }
}

/// A loaded release together with a caller who owns it.
#[derive(Debug, Clone)]
pub struct OwnedRelease {
    pub principal: PrincipalContext,
    pub release: PopulatedRelease,
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnedRelease
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(principal) = CurrentUser::from_request_parts(parts, state).await?;
        let LoadedRelease(release) = LoadedRelease::from_request_parts(parts, state).await?;

        authz::authorize_release(&principal, &release.release)?;

        Ok(OwnedRelease { principal, release })
    }
}
