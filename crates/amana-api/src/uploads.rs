use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, header},
};
use chrono::Utc;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use amana_objects::{ObjectWriter, new_entity_id, object_path};
use amana_types::api::{MAX_UPLOAD_SIZE, UploadResponse, UploadUrlRequest, UploadUrlResponse};

use crate::error::ApiError;
use crate::state::{AppState, db_call};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

fn now_unix() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// POST /api/uploads/request-url
///
/// Hands out a signed, time-limited URL the client PUTs the file to. The
/// returned `objectPath` is what the client later submits as a media link.
pub async fn request_upload_url(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let Json(body) = body?;
    let request = UploadUrlRequest::from_json(&body)?;

    let entity_id = new_entity_id();
    let presigned = state.signer.presign(&entity_id, now_unix())?;
    info!(
        "Issued upload URL for '{}' ({} bytes) as {}, expires at {}",
        request.name, request.size, presigned.entity_id, presigned.expires_at
    );

    Ok(Json(UploadUrlResponse {
        upload_url: presigned.upload_url,
        object_path: presigned.object_path,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SignedQuery {
    pub expires: Option<u64>,
    pub signature: Option<String>,
}

/// PUT /uploads/{id}?expires=&signature=: receive the raw file bytes.
pub async fn upload_object(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SignedQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<UploadResponse>, ApiError> {
    let entity_id = format!("uploads/{}", id);
    let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) else {
        return Err(ApiError::Forbidden("Upload URL is not signed".into()));
    };
    state.signer.verify(&entity_id, expires, signature, now_unix())?;

    if let Some(declared) = content_length(&headers) {
        if declared > MAX_UPLOAD_SIZE {
            return Err(ApiError::PayloadTooLarge(format!(
                "object exceeds the {} byte limit",
                MAX_UPLOAD_SIZE
            )));
        }
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let writer = state.storage.begin_write(&entity_id, MAX_UPLOAD_SIZE).await?;
    let size = receive_body(writer, body).await?;

    let stored = {
        let entity_id = entity_id.clone();
        db_call(&state, move |db| db.insert_object(&entity_id, &content_type, size)).await
    };
    match stored {
        Ok(_) => {}
        // A recorded object is owned by its row; leave the file for it.
        Err(e @ ApiError::Conflict(_)) => return Err(e),
        Err(e) => {
            // This writer published the file but could not record it.
            if let Err(cleanup) = state.storage.delete(&entity_id).await {
                warn!("Failed to remove unrecorded object {}: {}", entity_id, cleanup);
            }
            return Err(e);
        }
    }

    info!("Stored object {} ({} bytes)", entity_id, size);
    Ok(Json(UploadResponse {
        object_path: object_path(&entity_id),
        size,
    }))
}

/// Stream the request body into the writer, discarding the partial file on
/// any failure.
async fn receive_body(mut writer: ObjectWriter, body: Body) -> Result<u64, ApiError> {
    let mut stream = http_body_util::BodyStream::new(body);

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                writer.abort().await;
                return Err(ApiError::Internal(format!("upload stream error: {}", e)));
            }
        };
        let Ok(data) = frame.into_data() else {
            continue;
        };
        if let Err(e) = writer.write(&data).await {
            warn!("Discarding upload after {} bytes: {}", writer.written(), e);
            writer.abort().await;
            return Err(e.into());
        }
    }

    Ok(writer.finish().await?)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
