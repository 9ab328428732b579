pub mod error;
pub mod objects;
pub mod orders;
pub mod products;
pub mod state;
pub mod uploads;
pub mod users;

#[cfg(test)]
mod test_support;

use axum::{
    Router,
    routing::{get, post, put},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All marketplace routes. JSON endpoints live under `/api`; the signed upload
/// target and object downloads sit at the root where the issued URLs point.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/{telegram_id}", get(users::get_user))
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/{id}",
            get(products::get_product).put(products::update_product),
        )
        .route("/orders", post(orders::create_order))
        .route("/uploads/request-url", post(uploads::request_upload_url));

    Router::new()
        .nest("/api", api)
        .route("/uploads/{id}", put(uploads::upload_object))
        .route("/objects/{*object_path}", get(objects::serve_object))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}
