use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use releasehub_api::app::{AppServices, router_with};
use releasehub_auth::JwtClaims;
use releasehub_core::{ReleaseId, UserId};
use releasehub_infra::{
    InMemoryUserDirectory, PopulatedRelease, ReleaseStore, StoreError, UserDirectory, UserSummary,
};
use releasehub_releases::Release;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: AppServices,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory stores, ephemeral port.
        Self::spawn_with(AppServices::in_memory()).await
    }

    async fn spawn_with(services: AppServices) -> Self {
        let app = router_with(services.clone(), JWT_SECRET);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            client: reqwest::Client::new(),
            handle,
        }
    }

    /// Register a user in the directory and return a token for them.
    async fn sign_in(&self, display_name: &str) -> (UserId, String) {
        let id = UserId::new();
        self.services
            .users
            .upsert(UserSummary {
                id,
                display_name: display_name.to_string(),
            })
            .await
            .unwrap();
        (id, mint_jwt(id))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create(&self, token: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/releases"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn list(&self) -> Vec<serde_json::Value> {
        let res = self.client.get(self.url("/releases")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A release store whose backend is always down.
struct OfflineReleaseStore;

fn offline() -> StoreError {
    StoreError::Backend("connection refused".to_string())
}

#[async_trait]
impl ReleaseStore for OfflineReleaseStore {
    async fn insert(&self, _release: Release) -> Result<PopulatedRelease, StoreError> {
        Err(offline())
    }

    async fn find(&self, _id: ReleaseId) -> Result<Option<PopulatedRelease>, StoreError> {
        Err(offline())
    }

    async fn save(&self, _release: Release) -> Result<PopulatedRelease, StoreError> {
        Err(offline())
    }

    async fn remove(&self, _id: ReleaseId) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn list_newest_first(&self) -> Result<Vec<PopulatedRelease>, StoreError> {
        Err(offline())
    }
}

fn mint_jwt(user: UserId) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user,
        issued_at: now - ChronoDuration::seconds(5),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_while_signed_in_sets_caller_as_owner() {
    let srv = TestServer::spawn().await;
    let (user_id, token) = srv.sign_in("Full Name").await;
    let intruder = UserId::new();

    let res = srv
        .create(&token, json!({ "name": "Release Name", "user": intruder.to_string() }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let created: serde_json::Value = res.json().await.unwrap();
    assert!(created["id"].is_string());
    assert!(created["created"].is_string());
    assert_eq!(created["user"]["id"], user_id.to_string());

    let releases = srv.list().await;
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0]["name"], "Release Name");
    assert_eq!(releases[0]["user"]["id"], user_id.to_string());
    assert_eq!(releases[0]["user"]["displayName"], "Full Name");
}

#[tokio::test]
async fn create_without_sign_in_is_unauthorized() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/releases"))
        .json(&json!({ "name": "Release Name" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User is not logged in");

    assert!(srv.list().await.is_empty());
}

#[tokio::test]
async fn create_with_forged_token_is_unauthorized() {
    let srv = TestServer::spawn().await;

    let res = srv.create("not-a-token", json!({ "name": "Release Name" })).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_without_name_is_rejected() {
    let srv = TestServer::spawn().await;
    let (_user_id, token) = srv.sign_in("Full Name").await;

    for body in [json!({ "name": "" }), json!({ "name": "   " }), json!({})] {
        let res = srv.create(&token, body).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: serde_json::Value = res.json().await.unwrap();
        assert_eq!(err["message"], "Please fill Release name");
    }

    assert!(srv.list().await.is_empty());
}

#[tokio::test]
async fn update_as_owner_changes_name_and_keeps_id() {
    let srv = TestServer::spawn().await;
    let (user_id, token) = srv.sign_in("Full Name").await;

    let created: serde_json::Value = srv
        .create(&token, json!({ "name": "Release Name" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let res = srv
        .client
        .put(srv.url(&format!("/releases/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "WHY YOU GOTTA BE SO MEAN?", "user": UserId::new().to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["name"], "WHY YOU GOTTA BE SO MEAN?");
    assert_eq!(updated["created"], created["created"]);
    // Ownership is not mutable through this endpoint.
    assert_eq!(updated["user"]["id"], user_id.to_string());
}

#[tokio::test]
async fn update_with_blank_name_is_rejected_and_record_kept() {
    let srv = TestServer::spawn().await;
    let (_user_id, token) = srv.sign_in("Full Name").await;

    let created: serde_json::Value = srv
        .create(&token, json!({ "name": "Release Name" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/releases/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: serde_json::Value = res.json().await.unwrap();
    assert_eq!(err["message"], "Please fill Release name");

    let current: serde_json::Value = srv
        .client
        .get(srv.url(&format!("/releases/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["name"], "Release Name");
}

#[tokio::test]
async fn update_as_non_owner_is_forbidden() {
    let srv = TestServer::spawn().await;
    let (_owner, owner_token) = srv.sign_in("Owner").await;
    let (_other, other_token) = srv.sign_in("Someone Else").await;

    let created: serde_json::Value = srv
        .create(&owner_token, json!({ "name": "Release Name" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/releases/{id}")))
        .bearer_auth(&other_token)
        .json(&json!({ "name": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.text().await.unwrap(), "User is not authorized");

    let releases = srv.list().await;
    assert_eq!(releases[0]["name"], "Release Name");
}

#[tokio::test]
async fn read_single_release_without_sign_in() {
    let srv = TestServer::spawn().await;
    let (_user_id, token) = srv.sign_in("Full Name").await;

    let created: serde_json::Value = srv
        .create(&token, json!({ "name": "Release Name" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let res = srv
        .client
        .get(srv.url(&format!("/releases/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Release Name");
    assert_eq!(body["user"]["displayName"], "Full Name");
}

#[tokio::test]
async fn read_unknown_or_malformed_id() {
    let srv = TestServer::spawn().await;
    let missing = uuid::Uuid::now_v7();

    let res = srv
        .client
        .get(srv.url(&format!("/releases/{missing}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], format!("Failed to load Release {missing}"));

    let res = srv
        .client
        .get(srv.url("/releases/not-an-id"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_as_owner_removes_release() {
    let srv = TestServer::spawn().await;
    let (_user_id, token) = srv.sign_in("Full Name").await;

    let created: serde_json::Value = srv
        .create(&token, json!({ "name": "Release Name" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let res = srv
        .client
        .delete(srv.url(&format!("/releases/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let deleted: serde_json::Value = res.json().await.unwrap();
    assert_eq!(deleted["id"], id);
    assert_eq!(deleted["name"], "Release Name");

    let res = srv
        .client
        .get(srv.url(&format!("/releases/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(srv.list().await.is_empty());
}

#[tokio::test]
async fn delete_without_sign_in_is_unauthorized_and_release_remains() {
    let srv = TestServer::spawn().await;
    let (_user_id, token) = srv.sign_in("Full Name").await;

    let created: serde_json::Value = srv
        .create(&token, json!({ "name": "Release Name" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let res = srv
        .client
        .delete(srv.url(&format!("/releases/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User is not logged in");

    let res = srv
        .client
        .get(srv.url(&format!("/releases/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn delete_as_non_owner_is_forbidden() {
    let srv = TestServer::spawn().await;
    let (_owner, owner_token) = srv.sign_in("Owner").await;
    let (_other, other_token) = srv.sign_in("Someone Else").await;

    let created: serde_json::Value = srv
        .create(&owner_token, json!({ "name": "Release Name" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let res = srv
        .client
        .delete(srv.url(&format!("/releases/{id}")))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(srv.list().await.len(), 1);
}

#[tokio::test]
async fn list_is_ordered_newest_first() {
    let srv = TestServer::spawn().await;
    let (_user_id, token) = srv.sign_in("Full Name").await;

    let base = Utc::now();
    for (name, offset) in [("first", 0), ("third", 120), ("second", 60)] {
        let created = base + ChronoDuration::seconds(offset);
        let res = srv
            .create(&token, json!({ "name": name, "created": created.to_rfc3339() }))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let names: Vec<String> = srv
        .list()
        .await
        .iter()
        .map(|r| r["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn update_without_body_keeps_release() {
    let srv = TestServer::spawn().await;
    let (_user_id, token) = srv.sign_in("Full Name").await;

    let created: serde_json::Value = srv
        .create(&token, json!({ "name": "Release Name" }))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/releases/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated, created);
}

#[tokio::test]
async fn store_backend_failures() {
    let services = AppServices {
        releases: Arc::new(OfflineReleaseStore),
        users: Arc::new(InMemoryUserDirectory::new()),
    };
    let srv = TestServer::spawn_with(services).await;
    let (_user_id, token) = srv.sign_in("Full Name").await;

    // Handler-level store failures are bad requests with a generic message.
    let res = srv.client.get(srv.url("/releases")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Something went wrong" }));

    let res = srv.create(&token, json!({ "name": "Release Name" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Something went wrong");

    // Failures while resolving the id are server errors.
    let id = uuid::Uuid::now_v7();
    let res = srv
        .client
        .get(srv.url(&format!("/releases/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Something went wrong");

    let res = srv
        .client
        .delete(srv.url(&format!("/releases/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Authentication is still checked before the store is touched.
    let res = srv
        .client
        .put(srv.url(&format!("/releases/{id}")))
        .json(&json!({ "name": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
