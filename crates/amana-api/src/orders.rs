use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::info;

use amana_types::api::InsertOrder;

use crate::error::ApiError;
use crate::state::{AppState, db_call};

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let input = InsertOrder::from_json(&body)?;

    let order = db_call(&state, move |db| db.create_order(&input)).await?;
    info!(
        "Order {} placed by buyer {} for product {}",
        order.id, order.buyer_id, order.product_id
    );

    Ok((StatusCode::CREATED, Json(order)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::test_support::{TestApp, json_request};

    #[tokio::test]
    async fn test_order_starts_pending() {
        let app = TestApp::new().await;
        let seller = app.seller("1").await;
        let product = app.product(seller).await;
        let (_, buyer) = app
            .send(json_request(Method::POST, "/api/users", json!({ "telegramId": "2" })))
            .await;

        let (status, order) = app
            .send(json_request(
                Method::POST,
                "/api/orders",
                json!({ "productId": product, "buyerId": buyer["id"] }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["status"], "pending");
        assert_eq!(order["productId"], product);
        assert!(order["id"].is_i64());
        assert!(order["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_missing_references_are_rejected() {
        let app = TestApp::new().await;
        let seller = app.seller("1").await;
        let product = app.product(seller).await;

        let (status, err) = app
            .send(json_request(
                Method::POST,
                "/api/orders",
                json!({ "productId": 999, "buyerId": seller }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "productId");

        let (status, err) = app
            .send(json_request(
                Method::POST,
                "/api/orders",
                json!({ "productId": product, "buyerId": 999 }),
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "buyerId");
    }

    #[tokio::test]
    async fn test_missing_field_is_named() {
        let app = TestApp::new().await;
        let (status, err) = app
            .send(json_request(Method::POST, "/api/orders", json!({ "productId": 1 })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "buyerId");
        assert_eq!(err["message"], "Required");
    }
}
