use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::info;

use amana_types::api::InsertUser;
use amana_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, db_call};

/// GET /api/users/{telegram_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(telegram_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    db_call(&state, move |db| db.get_user_by_telegram_id(&telegram_id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("User not found"))
}

/// POST /api/users: first-time registration of a Telegram user.
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let input = InsertUser::from_json(&body)?;

    let user = db_call(&state, move |db| db.create_user(&input)).await?;
    info!("Registered user {} ({}) as {}", user.id, user.telegram_id, user.role);

    Ok((StatusCode::CREATED, Json(user)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{TestApp, json_request};

    #[tokio::test]
    async fn test_register_then_fetch() {
        let app = TestApp::new().await;

        let (status, created) = app
            .send(json_request(
                Method::POST,
                "/api/users",
                json!({ "telegramId": "777", "username": "abebe", "fullName": "Abebe Kebede" }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["role"], "buyer");
        assert!(created["id"].is_i64());

        let (status, fetched) = app.get("/api/users/777").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_unknown_user_is_404() {
        let app = TestApp::new().await;
        let (status, body) = app.get("/api/users/404404").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }

    #[tokio::test]
    async fn test_duplicate_telegram_id_fails() {
        let app = TestApp::new().await;
        let body = json!({ "telegramId": "42", "role": "seller" });

        let (status, _) = app.send(json_request(Method::POST, "/api/users", body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, err) = app.send(json_request(Method::POST, "/api/users", body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["field"], "telegramId");
    }

    #[tokio::test]
    async fn test_invalid_role_is_400() {
        let app = TestApp::new().await;
        let (status, err) = app
            .send(json_request(
                Method::POST,
                "/api/users",
                json!({ "telegramId": "42", "role": "moderator" }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "role");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let app = TestApp::new().await;
        let (status, err) = app.send_raw(Method::POST, "/api/users", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "");
    }
}
