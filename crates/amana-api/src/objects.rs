use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::ApiError;
use crate::state::{AppState, db_call};

/// GET /objects/{*object_path}: serve a stored upload, honoring `Range`.
pub async fn serve_object(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let object = {
        let entity_id = entity_id.clone();
        db_call(&state, move |db| db.get_object(&entity_id)).await?
    }
    .ok_or(ApiError::NotFound("Object not found"))?;

    let size = object.size;
    let range = match parse_range(&headers, size) {
        Ok(range) => range,
        Err(()) => {
            let mut response = StatusCode::RANGE_NOT_SATISFIABLE.into_response();
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            return Ok(response);
        }
    };
    let (start, end) = range.unwrap_or((0, size.saturating_sub(1)));
    let content_length = if size == 0 { 0 } else { end - start + 1 };

    let mut file = state.storage.open(&entity_id).await?;
    if start > 0 {
        file.seek(std::io::SeekFrom::Start(start))
            .await
            .map_err(amana_objects::ObjectError::from)?;
    }

    let stream = async_stream::stream! {
        let mut remaining = content_length;
        let mut buf = vec![0u8; 64 * 1024];
        while remaining > 0 {
            let to_read = (remaining as usize).min(buf.len());
            match file.read(&mut buf[..to_read]).await {
                Ok(0) => break,
                Ok(n) => {
                    remaining -= n as u64;
                    yield Ok::<_, std::io::Error>(Bytes::copy_from_slice(&buf[..n]));
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    };

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response_headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=3600"),
    );

    let status = if range.is_some() {
        if let Ok(value) = HeaderValue::from_str(&format!("bytes {}-{}/{}", start, end, size)) {
            response_headers.insert(header::CONTENT_RANGE, value);
        }
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    Ok((status, response_headers, Body::from_stream(stream)).into_response())
}

/// Parse a single `bytes=start-end` range against an object of `size` bytes.
///
/// `Ok(None)` means serve the whole object; malformed headers are ignored.
/// `Err(())` means the range lies outside the object.
fn parse_range(headers: &HeaderMap, size: u64) -> Result<Option<(u64, u64)>, ()> {
    let Some(raw) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) else {
        return Ok(None);
    };
    let Some(ranges) = raw.trim().strip_prefix("bytes=") else {
        return Ok(None);
    };
    let Some((start, end)) = ranges.split_once('-') else {
        return Ok(None);
    };

    let (start, end) = match (start.trim(), end.trim()) {
        // Suffix range: the last N bytes.
        ("", suffix) => {
            let Ok(n) = suffix.parse::<u64>() else {
                return Ok(None);
            };
            if n == 0 || size == 0 {
                return Err(());
            }
            (size.saturating_sub(n), size - 1)
        }
        (start, "") => {
            let Ok(start) = start.parse::<u64>() else {
                return Ok(None);
            };
            (start, size.saturating_sub(1))
        }
        (start, end) => {
            let (Ok(start), Ok(end)) = (start.parse::<u64>(), end.parse::<u64>()) else {
                return Ok(None);
            };
            if end < start {
                return Ok(None);
            }
            (start, end.min(size.saturating_sub(1)))
        }
    };

    if start >= size {
        return Err(());
    }
    Ok(Some((start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request};

    use crate::test_support::TestApp;

    fn range(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range(&HeaderMap::new(), 100), Ok(None));
        assert_eq!(parse_range(&range("bytes=0-9"), 100), Ok(Some((0, 9))));
        assert_eq!(parse_range(&range("bytes=90-"), 100), Ok(Some((90, 99))));
        assert_eq!(parse_range(&range("bytes=-10"), 100), Ok(Some((90, 99))));
        assert_eq!(parse_range(&range("bytes=50-500"), 100), Ok(Some((50, 99))));
        assert_eq!(parse_range(&range("bytes=100-"), 100), Err(()));
        assert_eq!(parse_range(&range("items=0-1"), 100), Ok(None));
        assert_eq!(parse_range(&range("bytes=9-3"), 100), Ok(None));
    }

    async fn stored(app: &TestApp, data: &'static [u8]) -> String {
        let entity_id = amana_objects::new_entity_id();
        let mut writer = app.state.storage.begin_write(&entity_id, 1024).await.unwrap();
        writer.write(data).await.unwrap();
        let size = writer.finish().await.unwrap();
        app.state
            .db
            .insert_object(&entity_id, "video/mp4", size)
            .unwrap();
        amana_objects::object_path(&entity_id)
    }

    #[tokio::test]
    async fn test_serves_whole_object() {
        let app = TestApp::new().await;
        let path = stored(&app, b"hello video").await;

        let (status, headers, body) = app
            .send_bytes(Request::get(&path).body(Body::empty()).unwrap())
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(headers[header::CONTENT_LENGTH], "11");
        assert_eq!(&body[..], b"hello video");
    }

    #[tokio::test]
    async fn test_serves_partial_content() {
        let app = TestApp::new().await;
        let path = stored(&app, b"hello video").await;

        let request = Request::builder()
            .method(Method::GET)
            .uri(&path)
            .header(header::RANGE, "bytes=6-")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = app.send_bytes(request).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 6-10/11");
        assert_eq!(&body[..], b"video");

        let request = Request::builder()
            .uri(&path)
            .header(header::RANGE, "bytes=20-")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = app.send_bytes(request).await;
        assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[tokio::test]
    async fn test_unknown_object_is_404() {
        let app = TestApp::new().await;
        let (status, body) = app
            .get("/objects/uploads/0f8fad5b-d9cb-469f-a165-70867728950e")
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Object not found");

        let (status, _) = app.get("/objects/../amana.db").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
