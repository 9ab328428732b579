use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use amana_objects::{entity_id_from_object_path, normalize_object_path};
use amana_types::api::{InsertProduct, ProductFilter, UpdateProduct};
use amana_types::models::{Product, ProductStatus};
use amana_types::validate::FieldError;

use crate::error::ApiError;
use crate::state::{AppState, db_call};

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub status: Option<String>,
    #[serde(rename = "sellerId")]
    pub seller_id: Option<String>,
}

impl ProductQuery {
    fn into_filter(self) -> Result<ProductFilter, FieldError> {
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.parse::<ProductStatus>()
                    .map_err(|e| FieldError::new("status", e.to_string()))?,
            ),
            None => None,
        };
        let seller_id = match self.seller_id.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| FieldError::new("sellerId", "Expected integer"))?,
            ),
            None => None,
        };
        Ok(ProductFilter { status, seller_id })
    }
}

/// GET /api/products?status=&sellerId=
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let filter = query.into_filter()?;
    let products = db_call(&state, move |db| db.list_products(&filter)).await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_id(&id)?;
    db_call(&state, move |db| db.get_product(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Product not found"))
}

/// POST /api/products: seller submission; the listing starts out pending.
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let mut input = InsertProduct::from_json(&body)?;
    input.video_url = normalize_object_path(&input.video_url);
    input.thumbnail_url = input.thumbnail_url.map(|url| normalize_object_path(&url));
    require_uploaded(&state, &input.object_links()).await?;

    let product = db_call(&state, move |db| db.create_product(&input)).await?;
    info!(
        "Product {} '{}' submitted by seller {}",
        product.id, product.title, product.seller_id
    );

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}: partial update, including moderation status.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Product>, ApiError> {
    let Json(body) = body?;
    let mut input = UpdateProduct::from_json(&body)?;
    input.video_url = input.video_url.map(|url| normalize_object_path(&url));
    input.thumbnail_url = input
        .thumbnail_url
        .map(|url| url.map(|url| normalize_object_path(&url)));
    let id = parse_id(&id)?;
    require_uploaded(&state, &input.object_links()).await?;

    let status = input.status;
    let product = db_call(&state, move |db| db.update_product(id, &input))
        .await?
        .ok_or(ApiError::NotFound("Product not found"))?;

    if let Some(status) = status {
        info!("Product {} moderated to {}", product.id, status);
    }
    Ok(Json(product))
}

/// Non-numeric ids can never match a row.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound("Product not found"))
}

/// Media links under `/objects/` must name an object that finished uploading.
async fn require_uploaded(state: &AppState, links: &[(&'static str, &str)]) -> Result<(), ApiError> {
    for (field, url) in links {
        let Some(entity_id) = entity_id_from_object_path(url) else {
            continue;
        };
        let entity_id = entity_id.to_string();
        let stored = db_call(state, move |db| db.get_object(&entity_id)).await?;
        if stored.is_none() {
            return Err(FieldError::new(*field, "Uploaded file not found").into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::test_support::{TestApp, json_request};

    fn listing(seller_id: i64) -> Value {
        json!({
            "title": "Traditional Coffee Set",
            "description": "Handmade ceramic coffee set with 6 cups.",
            "price": 1500,
            "videoUrl": "https://example.com/video.mp4",
            "sellerId": seller_id,
        })
    }

    #[tokio::test]
    async fn test_created_product_round_trips() {
        let app = TestApp::new().await;
        let seller = app.seller("100").await;

        let (status, created) = app
            .send(json_request(Method::POST, "/api/products", listing(seller)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "pending");
        assert_eq!(created["price"], 1500);

        let id = created["id"].as_i64().unwrap();
        let (status, fetched) = app.get(&format!("/api/products/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
        assert_eq!(fetched["title"], "Traditional Coffee Set");
        assert_eq!(fetched["description"], "Handmade ceramic coffee set with 6 cups.");
        assert_eq!(fetched["videoUrl"], "https://example.com/video.mp4");
        assert_eq!(fetched["sellerId"], seller);
    }

    #[tokio::test]
    async fn test_text_fields_are_stored_as_sent() {
        let app = TestApp::new().await;
        let seller = app.seller("100").await;
        let mut body = listing(seller);
        body["title"] = json!("  Woven Basket  ");
        body["description"] = json!("Line one\n");

        let (status, created) = app.send(json_request(Method::POST, "/api/products", body)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, fetched) = app.get(&format!("/api/products/{}", created["id"])).await;
        assert_eq!(fetched["title"], "  Woven Basket  ");
        assert_eq!(fetched["description"], "Line one\n");
    }

    #[tokio::test]
    async fn test_upload_url_is_stored_as_object_path() {
        let app = TestApp::new().await;
        let seller = app.seller("100").await;
        let (_, issued) = app
            .send(json_request(
                Method::POST,
                "/api/uploads/request-url",
                json!({ "name": "clip.mp4", "size": 4 }),
            ))
            .await;
        let upload_url = issued["uploadURL"].as_str().unwrap();
        let target = upload_url.strip_prefix("http://localhost:5000").unwrap();
        let (status, _) = app.send_raw(Method::PUT, target, "clip").await;
        assert_eq!(status, StatusCode::OK);

        let mut body = listing(seller);
        body["videoUrl"] = json!(upload_url);
        let (status, created) = app.send(json_request(Method::POST, "/api/products", body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["videoUrl"], issued["objectPath"]);
    }

    #[tokio::test]
    async fn test_price_below_one_is_rejected() {
        let app = TestApp::new().await;
        let seller = app.seller("100").await;
        let mut body = listing(seller);
        body["price"] = json!(0);

        let (status, err) = app.send(json_request(Method::POST, "/api/products", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "price");
        assert!(err["message"].is_string());
    }

    #[tokio::test]
    async fn test_empty_title_is_first_error() {
        let app = TestApp::new().await;
        let mut body = listing(1);
        body["title"] = json!("");
        body["price"] = json!(-3);

        let (status, err) = app.send(json_request(Method::POST, "/api/products", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "title");
    }

    #[tokio::test]
    async fn test_unknown_seller_is_rejected() {
        let app = TestApp::new().await;
        let (status, err) = app
            .send(json_request(Method::POST, "/api/products", listing(9999)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "sellerId");
    }

    #[tokio::test]
    async fn test_missing_product_is_404() {
        let app = TestApp::new().await;

        let (status, err) = app.get("/api/products/12345").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["message"], "Product not found");

        let (status, _) = app.get("/api/products/not-a-number").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_filter() {
        let app = TestApp::new().await;
        let seller = app.seller("100").await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            let (_, created) = app
                .send(json_request(Method::POST, "/api/products", listing(seller)))
                .await;
            ids.push(created["id"].as_i64().unwrap());
        }

        let (status, _) = app
            .send(json_request(
                Method::PUT,
                &format!("/api/products/{}", ids[1]),
                json!({ "status": "approved" }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, approved) = app.get("/api/products?status=approved").await;
        assert_eq!(status, StatusCode::OK);
        let approved = approved.as_array().unwrap();
        assert_eq!(approved.len(), 1);
        assert!(approved.iter().all(|p| p["status"] == "approved"));
        assert_eq!(approved[0]["id"], ids[1]);

        let (_, pending) = app.get("/api/products?status=pending").await;
        assert_eq!(pending.as_array().unwrap().len(), 2);

        let (_, all) = app.get("/api/products").await;
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_status_filter_is_400() {
        let app = TestApp::new().await;
        let (status, err) = app.get("/api/products?status=sold").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "status");
    }

    #[tokio::test]
    async fn test_seller_filter() {
        let app = TestApp::new().await;
        let a = app.seller("1").await;
        let b = app.seller("2").await;
        app.send(json_request(Method::POST, "/api/products", listing(a))).await;
        app.send(json_request(Method::POST, "/api/products", listing(b))).await;

        let (_, mine) = app.get(&format!("/api/products?sellerId={}", b)).await;
        let mine = mine.as_array().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["sellerId"], b);
    }

    #[tokio::test]
    async fn test_update_product() {
        let app = TestApp::new().await;
        let seller = app.seller("100").await;
        let (_, created) = app
            .send(json_request(Method::POST, "/api/products", listing(seller)))
            .await;
        let uri = format!("/api/products/{}", created["id"]);

        let (status, updated) = app
            .send(json_request(Method::PUT, &uri, json!({ "price": 1200, "title": "Coffee Set" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["price"], 1200);
        assert_eq!(updated["title"], "Coffee Set");
        assert_eq!(updated["description"], created["description"]);

        let (status, err) = app
            .send(json_request(Method::PUT, &uri, json!({ "price": 0 })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "price");

        let (status, _) = app
            .send(json_request(Method::PUT, "/api/products/999", json!({ "price": 5 })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_object_video_must_be_uploaded() {
        let app = TestApp::new().await;
        let seller = app.seller("100").await;
        let mut body = listing(seller);
        body["videoUrl"] = json!("/objects/uploads/0f8fad5b-d9cb-469f-a165-70867728950e");

        let (status, err) = app.send(json_request(Method::POST, "/api/products", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["field"], "videoUrl");
    }
}
