//! In-process harness for driving the router in tests.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use amana_db::Database;
use amana_objects::{ObjectStorage, UploadSigner};
use amana_types::api::{InsertProduct, InsertUser};
use amana_types::models::UserRole;

use crate::router;
use crate::state::{AppState, AppStateInner};

pub struct TestApp {
    _dir: TempDir,
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("amana.db")).unwrap();
        let storage = ObjectStorage::new(dir.path().join("objects")).await.unwrap();
        let signer = UploadSigner::new(
            "test-secret",
            "http://localhost:5000",
            Duration::from_secs(900),
        );

        let state: AppState = Arc::new(AppStateInner { db, storage, signer });
        Self {
            _dir: dir,
            router: router(state.clone()),
            state,
        }
    }

    pub async fn send_bytes(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, bytes)
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, bytes) = self.send_bytes(request).await;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send_raw(&self, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Register a seller directly and return its id.
    pub async fn seller(&self, telegram_id: &str) -> i64 {
        self.state
            .db
            .create_user(&InsertUser {
                telegram_id: telegram_id.to_string(),
                username: None,
                full_name: None,
                role: UserRole::Seller,
            })
            .unwrap()
            .id
    }

    /// Insert a pending listing for `seller_id` and return its id.
    pub async fn product(&self, seller_id: i64) -> i64 {
        let input = InsertProduct::from_json(&json!({
            "title": "Woven Basket",
            "description": "Colorful handwoven basket.",
            "price": 800,
            "videoUrl": "https://example.com/basket.mp4",
            "sellerId": seller_id,
        }))
        .unwrap();
        self.state.db.create_product(&input).unwrap().id
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
