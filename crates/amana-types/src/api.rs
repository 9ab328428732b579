use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{OrderStatus, ProductStatus, UserRole};
use crate::validate::{FieldError, Fields, check_media_url};

/// 50 MB cap on a single uploaded file.
pub const MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

const MAX_TELEGRAM_ID_LEN: usize = 64;
const MAX_NAME_LEN: usize = 128;
const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 5000;
const MAX_URL_LEN: usize = 2048;

// -- Error bodies --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<FieldError> for ErrorBody {
    fn from(err: FieldError) -> Self {
        Self {
            message: err.message,
            field: Some(err.field),
        }
    }
}

// -- Users --

#[derive(Debug, Clone, PartialEq)]
pub struct InsertUser {
    pub telegram_id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: UserRole,
}

impl InsertUser {
    pub fn from_json(body: &Value) -> Result<Self, FieldError> {
        let fields = Fields::from_body(body)?;
        Ok(Self {
            telegram_id: fields.required_string("telegramId", MAX_TELEGRAM_ID_LEN)?,
            username: fields.nullable_string("username", MAX_NAME_LEN)?,
            full_name: fields.nullable_string("fullName", MAX_NAME_LEN)?,
            role: fields.optional_enum("role")?.unwrap_or_default(),
        })
    }
}

// -- Products --

#[derive(Debug, Clone, PartialEq)]
pub struct InsertProduct {
    pub title: String,
    pub description: String,
    pub price: i64,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub seller_id: i64,
}

impl InsertProduct {
    pub fn from_json(body: &Value) -> Result<Self, FieldError> {
        let fields = Fields::from_body(body)?;

        let title = fields.required_string("title", MAX_TITLE_LEN)?;
        let description = fields.required_string("description", MAX_DESCRIPTION_LEN)?;
        let price = fields.required_int("price", 1)?;
        let video_url = fields.required_string("videoUrl", MAX_URL_LEN)?;
        check_media_url("videoUrl", &video_url)?;
        let thumbnail_url = fields.nullable_string("thumbnailUrl", MAX_URL_LEN)?;
        if let Some(url) = &thumbnail_url {
            check_media_url("thumbnailUrl", url)?;
        }
        let seller_id = fields.required_int("sellerId", 1)?;

        Ok(Self {
            title,
            description,
            price,
            video_url,
            thumbnail_url,
            seller_id,
        })
    }

    /// Media links that point into the object store, paired with their field.
    pub fn object_links(&self) -> Vec<(&'static str, &str)> {
        let mut links = vec![("videoUrl", self.video_url.as_str())];
        if let Some(thumb) = &self.thumbnail_url {
            links.push(("thumbnailUrl", thumb.as_str()));
        }
        links.retain(|(_, url)| url.starts_with("/objects/"));
        links
    }
}

/// Partial product update. Also carries the moderation `status`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub video_url: Option<String>,
    /// `Some(None)` clears the thumbnail.
    pub thumbnail_url: Option<Option<String>>,
    pub seller_id: Option<i64>,
    pub status: Option<ProductStatus>,
}

impl UpdateProduct {
    pub fn from_json(body: &Value) -> Result<Self, FieldError> {
        let fields = Fields::from_body(body)?;

        let title = fields.optional_string("title", MAX_TITLE_LEN)?;
        let description = fields.optional_string("description", MAX_DESCRIPTION_LEN)?;
        let price = fields.optional_int("price", 1)?;
        let video_url = fields.optional_string("videoUrl", MAX_URL_LEN)?;
        if let Some(url) = &video_url {
            check_media_url("videoUrl", url)?;
        }
        let thumbnail_url = fields.patch_nullable_string("thumbnailUrl", MAX_URL_LEN)?;
        if let Some(Some(url)) = &thumbnail_url {
            check_media_url("thumbnailUrl", url)?;
        }
        let seller_id = fields.optional_int("sellerId", 1)?;
        let status = fields.optional_enum("status")?;

        Ok(Self {
            title,
            description,
            price,
            video_url,
            thumbnail_url,
            seller_id,
            status,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn object_links(&self) -> Vec<(&'static str, &str)> {
        let mut links = Vec::new();
        if let Some(video) = &self.video_url {
            links.push(("videoUrl", video.as_str()));
        }
        if let Some(Some(thumb)) = &self.thumbnail_url {
            links.push(("thumbnailUrl", thumb.as_str()));
        }
        links.retain(|(_, url)| url.starts_with("/objects/"));
        links
    }
}

/// Listing filter taken from the query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub seller_id: Option<i64>,
}

// -- Orders --

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOrder {
    pub product_id: i64,
    pub buyer_id: i64,
    pub status: OrderStatus,
}

impl InsertOrder {
    pub fn from_json(body: &Value) -> Result<Self, FieldError> {
        let fields = Fields::from_body(body)?;
        Ok(Self {
            product_id: fields.required_int("productId", 1)?,
            buyer_id: fields.required_int("buyerId", 1)?,
            status: fields.optional_enum("status")?.unwrap_or_default(),
        })
    }
}

// -- Uploads --

#[derive(Debug, Clone, PartialEq)]
pub struct UploadUrlRequest {
    pub name: String,
    pub size: u64,
    pub content_type: Option<String>,
}

impl UploadUrlRequest {
    pub fn from_json(body: &Value) -> Result<Self, FieldError> {
        let fields = Fields::from_body(body)?;

        let name = fields.required_string("name", 255)?;
        let size = fields.required_int("size", 1)? as u64;
        if size > MAX_UPLOAD_SIZE {
            return Err(FieldError::new(
                "size",
                format!("File exceeds the {} MB upload limit", MAX_UPLOAD_SIZE / (1024 * 1024)),
            ));
        }
        let content_type = fields.nullable_string("contentType", 255)?;

        Ok(Self {
            name,
            size,
            content_type,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    #[serde(rename = "objectPath")]
    pub object_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub object_path: String,
    pub size: u64,
}
