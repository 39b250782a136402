use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, rejection::JsonRejection},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;

use releasehub_infra::ReleaseStore;
use releasehub_releases::Release;

use crate::app::dto::{self, ReleaseResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::extract::{CurrentUser, LoadedRelease, OwnedRelease};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_releases).post(create_release))
        .route(
            "/:release_id",
            get(read_release).put(update_release).delete(delete_release),
        )
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(b)| b)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Like [`json_body`], but an empty body reads as `T::default()`.
fn optional_json_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::BadRequest(format!("Failed to parse the request body as JSON: {e}"))
    })
}

pub async fn create_release(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(principal): CurrentUser,
    body: Result<Json<dto::CreateReleaseRequest>, JsonRejection>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    let body = json_body(body)?;

    let release = Release::create(body.into(), principal.user_id(), Utc::now())?;
    let saved = services.releases.insert(release).await?;

    tracing::info!(
        release_id = %saved.release.id,
        owner = %principal.user_id(),
        "release created"
    );
    Ok(Json(saved.into()))
}

pub async fn read_release(LoadedRelease(release): LoadedRelease) -> Json<ReleaseResponse> {
    Json(release.into())
}

pub async fn update_release(
    Extension(services): Extension<Arc<AppServices>>,
    owned: OwnedRelease,
    body: Bytes,
) -> Result<Json<ReleaseResponse>, ApiError> {
    let body: dto::UpdateReleaseRequest = optional_json_body(&body)?;

    let next = owned.release.release.merged(body.into())?;
    let saved = services.releases.save(next).await?;

    tracing::info!(release_id = %saved.release.id, "release updated");
    Ok(Json(saved.into()))
}

pub async fn delete_release(
    Extension(services): Extension<Arc<AppServices>>,
    owned: OwnedRelease,
) -> Result<Json<ReleaseResponse>, ApiError> {
    services.releases.remove(owned.release.release.id).await?;

    tracing::info!(release_id = %owned.release.release.id, "release deleted");
    Ok(Json(owned.release.into()))
}

pub async fn list_releases(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<ReleaseResponse>>, ApiError> {
    let releases = services.releases.list_newest_first().await?;
    Ok(Json(releases.into_iter().map(ReleaseResponse::from).collect()))
}
