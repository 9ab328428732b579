//! Database row types. These map directly to SQLite rows and are converted
//! into the `amana-types` models at the crate boundary.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;

use amana_types::models::{
    Order, OrderStatus, Product, ProductStatus, StoredObject, User, UserRole,
};

use crate::{DbError, Result};

pub(crate) const USER_COLUMNS: &str = "id, telegram_id, username, full_name, role, created_at";
pub(crate) const PRODUCT_COLUMNS: &str =
    "id, title, description, price, video_url, thumbnail_url, status, seller_id, created_at";
pub(crate) const ORDER_COLUMNS: &str = "id, product_id, buyer_id, status, created_at";
pub(crate) const OBJECT_COLUMNS: &str = "entity_id, content_type, size, created_at";

pub struct UserRow {
    pub id: i64,
    pub telegram_id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: String,
    pub created_at: String,
}

pub struct ProductRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub status: String,
    pub seller_id: i64,
    pub created_at: String,
}

pub struct OrderRow {
    pub id: i64,
    pub product_id: i64,
    pub buyer_id: i64,
    pub status: String,
    pub created_at: String,
}

pub struct ObjectRow {
    pub entity_id: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: String,
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            telegram_id: row.get(1)?,
            username: row.get(2)?,
            full_name: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn into_model(self) -> Result<User> {
        Ok(User {
            id: self.id,
            role: self
                .role
                .parse::<UserRole>()
                .map_err(|e| corrupt("user", self.id, e))?,
            created_at: parse_timestamp(&self.created_at)
                .map_err(|e| corrupt("user", self.id, e))?,
            telegram_id: self.telegram_id,
            username: self.username,
            full_name: self.full_name,
        })
    }
}

impl ProductRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            video_url: row.get(4)?,
            thumbnail_url: row.get(5)?,
            status: row.get(6)?,
            seller_id: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    pub fn into_model(self) -> Result<Product> {
        Ok(Product {
            id: self.id,
            status: self
                .status
                .parse::<ProductStatus>()
                .map_err(|e| corrupt("product", self.id, e))?,
            created_at: parse_timestamp(&self.created_at)
                .map_err(|e| corrupt("product", self.id, e))?,
            title: self.title,
            description: self.description,
            price: self.price,
            video_url: self.video_url,
            thumbnail_url: self.thumbnail_url,
            seller_id: self.seller_id,
        })
    }
}

impl OrderRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            product_id: row.get(1)?,
            buyer_id: row.get(2)?,
            status: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn into_model(self) -> Result<Order> {
        Ok(Order {
            id: self.id,
            product_id: self.product_id,
            buyer_id: self.buyer_id,
            status: self
                .status
                .parse::<OrderStatus>()
                .map_err(|e| corrupt("order", self.id, e))?,
            created_at: parse_timestamp(&self.created_at)
                .map_err(|e| corrupt("order", self.id, e))?,
        })
    }
}

impl ObjectRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entity_id: row.get(0)?,
            content_type: row.get(1)?,
            size: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn into_model(self) -> Result<StoredObject> {
        let created_at = parse_timestamp(&self.created_at).map_err(|e| {
            DbError::DataCorruption(format!("object '{}': {}", self.entity_id, e))
        })?;
        Ok(StoredObject {
            entity_id: self.entity_id,
            content_type: self.content_type,
            size: self.size.max(0) as u64,
            created_at,
        })
    }
}

/// SQLite's `datetime('now')` yields "YYYY-MM-DD HH:MM:SS" without a zone;
/// treat it as UTC. RFC 3339 values are accepted too.
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}

fn corrupt(entity: &str, id: i64, err: impl std::fmt::Display) -> DbError {
    DbError::DataCorruption(format!("{} {}: {}", entity, id, err))
}
