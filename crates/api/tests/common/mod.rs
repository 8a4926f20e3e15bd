//! Shared fixtures for the api integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tower::ServiceExt;

use shipwatch_api::auth::jwt::{generate_access_token, JwtConfig};
use shipwatch_api::config::{ImportConfig, RealtimeConfig, ServerConfig};
use shipwatch_api::router::build_app_router;
use shipwatch_api::state::AppState;
use shipwatch_core::equipment::{EquipmentLookup, LookupError};
use shipwatch_core::identity::{AuthError, Identity, IdentityVerifier};
use shipwatch_core::types::DbId;
use shipwatch_db::models::alarm_record::AlarmRecord;
use shipwatch_events::Envelope;

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        realtime: RealtimeConfig::default(),
        import: ImportConfig::default(),
    }
}

/// A pool that never connects. Good for requests rejected before any query.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy("postgres://shipwatch@127.0.0.1:1/unused")
        .expect("lazy pool should build")
}

/// Build the full application router over `pool`, mirroring `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_state(pool).0
}

pub fn build_test_app_with_state(pool: PgPool) -> (Router, AppState) {
    let config = test_config();
    let state = AppState::new(pool, config.clone());
    (build_app_router(state.clone(), &config), state)
}

/// Sign an access token with the test secret.
pub fn token_for(user_id: DbId, username: &str, roles: &[&str]) -> String {
    let identity = Identity {
        user_id,
        username: username.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    };
    generate_access_token(&identity, &test_config().jwt).expect("token generation should succeed")
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Realtime fixtures
// ---------------------------------------------------------------------------

/// Verifier over a fixed token table.
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticVerifier {
    pub fn with(mut self, token: &str, identity: Identity) -> Self {
        self.tokens.insert(token.to_string(), identity);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidToken("unknown token".into()))
    }
}

pub fn identity(user_id: DbId, username: &str, roles: &[&str]) -> Identity {
    Identity {
        user_id,
        username: username.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

/// E1 <-> DEV-001 only.
pub struct FakeEquipment;

#[async_trait]
impl EquipmentLookup for FakeEquipment {
    async fn lookup_internal_id(&self, external_code: &str) -> Result<Option<String>, LookupError> {
        Ok((external_code == "DEV-001").then(|| "E1".to_string()))
    }

    async fn lookup_external_code(&self, internal_id: &str) -> Result<Option<String>, LookupError> {
        Ok((internal_id == "E1").then(|| "DEV-001".to_string()))
    }

    async fn existing_ids(&self, internal_ids: &[String]) -> Result<HashSet<String>, LookupError> {
        Ok(internal_ids.iter().filter(|id| *id == "E1").cloned().collect())
    }
}

/// Drain every frame queued for a connection, decoding text frames.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Envelope> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            out.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    out
}

pub fn alarm(id: DbId, severity: &str) -> AlarmRecord {
    let triggered_at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    AlarmRecord {
        id,
        equipment_id: "E1".into(),
        threshold_id: Some(1),
        abnormal_metric_type: "voltage".into(),
        abnormal_value: 705.0,
        threshold_range: "> 700".into(),
        triggered_at,
        severity: severity.into(),
        status: "pending".into(),
        monitoring_point: Some("total".into()),
        fault_name: Some("Overvoltage".into()),
        recommended_action: Some("Check rectifier".into()),
        handler: None,
        handled_at: None,
        handle_note: None,
        created_at: triggered_at,
        updated_at: triggered_at,
    }
}
