use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use amana_db::DbError;
use amana_objects::ObjectError;
use amana_types::api::ErrorBody;
use amana_types::validate::FieldError;

/// Every handler failure maps onto one of these; the response body is always
/// `{ message }` or `{ message, field }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(FieldError),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(FieldError),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("database error: {0}")]
    Database(DbError),

    #[error("object store error: {0}")]
    Objects(ObjectError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FieldError> for ApiError {
    fn from(err: FieldError) -> Self {
        Self::Validation(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(FieldError::new("", rejection.body_text()))
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict { entity, field } => Self::Conflict(FieldError::new(
                field,
                format!("{} already exists", capitalize(entity)),
            )),
            DbError::MissingReference { entity, field } => Self::Validation(FieldError::new(
                field,
                format!("Referenced {} does not exist", entity),
            )),
            other => Self::Database(other),
        }
    }
}

impl From<ObjectError> for ApiError {
    fn from(err: ObjectError) -> Self {
        match err {
            ObjectError::Expired | ObjectError::BadSignature => Self::Forbidden(err.to_string()),
            ObjectError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            ObjectError::AlreadyExists => {
                Self::Conflict(FieldError::new("objectPath", "Object has already been uploaded"))
            }
            ObjectError::NotFound | ObjectError::InvalidEntityId(_) => {
                Self::NotFound("Object not found")
            }
            ObjectError::Io(_) => Self::Objects(err),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Database(_) | Self::Objects(_) | Self::Internal(_)) {
            error!(error = %self, "Request failed");
        }

        let (status, body) = match self {
            Self::Validation(err) => (StatusCode::BAD_REQUEST, ErrorBody::from(err)),
            Self::Conflict(err) => (StatusCode::CONFLICT, ErrorBody::from(err)),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message_only(message)),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message_only(message)),
            Self::PayloadTooLarge(message) => {
                (StatusCode::PAYLOAD_TOO_LARGE, message_only(message))
            }
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Objects(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                message_only("Internal server error"),
            ),
        };

        (status, Json(body)).into_response()
    }
}

fn message_only(message: impl Into<String>) -> ErrorBody {
    ErrorBody {
        message: message.into(),
        field: None,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
