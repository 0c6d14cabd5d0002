//! Shared helpers for the API integration tests.
//!
//! Every test app runs on a fresh [`MemoryStore`], so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use easyweb_api::auth::jwt::{generate_access_token, JwtConfig};
use easyweb_api::config::ServerConfig;
use easyweb_api::router::build_app_router;
use easyweb_api::state::AppState;
use easyweb_core::protocol::ServerFrame;
use easyweb_core::roles::Role;
use easyweb_core::types::DbId;
use easyweb_db::models::user::UserSummary;
use easyweb_db::{MemoryStore, Stores};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        ws_heartbeat_secs: 30,
        app_env: "test".to_string(),
        expose_error_detail: true,
        database_url: None,
        db_max_connections: 1,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

/// Full application (same middleware stack as production) on a fresh
/// in-memory store.
pub fn build_test_app() -> TestApp {
    let stores = Stores::memory(Arc::new(MemoryStore::new()));
    let state = AppState::new(stores, test_config());
    let router = build_app_router(state.clone());
    TestApp { state, router }
}

/// A subject with a display record and a signed token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: DbId,
    pub role: Role,
    pub token: String,
}

impl TestApp {
    pub async fn user(&self, name: &str, role: Role) -> TestUser {
        let id = uuid::Uuid::new_v4();
        self.state
            .stores
            .users
            .upsert(&UserSummary {
                id,
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                role: role.as_str().to_string(),
            })
            .await
            .unwrap();
        TestUser {
            id,
            role,
            token: token_for(id, role),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(build_request(method, uri, user, body))
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Create a project as `client` and return its id.
    pub async fn create_project(&self, client: &TestUser, title: &str) -> DbId {
        let (status, json) = self
            .request(Method::POST, "/api/v1/projects", Some(client), Some(project_body(title)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
        json["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Create a project and have `developer` accept it.
    pub async fn accepted_project(&self, client: &TestUser, developer: &TestUser) -> DbId {
        let id = self.create_project(client, "Storefront").await;
        let (status, json) = self
            .request(
                Method::PUT,
                &format!("/api/v1/projects/{id}/accept"),
                Some(developer),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "accept failed: {json}");
        id
    }
}

pub fn token_for(id: DbId, role: Role) -> String {
    let config = JwtConfig {
        secret: TEST_SECRET.to_string(),
        access_token_expiry_mins: 60,
    };
    generate_access_token(id, role.as_str(), &config).unwrap()
}

pub fn build_request(
    method: Method,
    uri: &str,
    user: Option<&TestUser>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", user.token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn project_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "A five page marketing site",
        "budget": 1500.0,
        "deadline": "2030-01-01T00:00:00Z",
        "contactEmail": "owner@example.com"
    })
}

/// Drain every frame currently queued for a connection.
pub fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            frames.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    frames
}

/// Frames with the given event name.
pub fn events<'a>(frames: &'a [ServerFrame], event: &str) -> Vec<&'a ServerFrame> {
    frames.iter().filter(|f| f.event == event).collect()
}
