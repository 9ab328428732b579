use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Seller,
    #[default]
    Buyer,
    Admin,
}

/// Moderation state of a listing. New listings start out `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

/// Returned when a string is not one of an enum's wire values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub expected: &'static [&'static str],
    pub got: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = self
            .expected
            .iter()
            .map(|v| format!("'{}'", v))
            .collect::<Vec<_>>()
            .join(" | ");
        write!(f, "Invalid enum value. Expected {}, received '{}'", expected, self.got)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! impl_wire_enum {
    ($ty:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        expected: &[$($wire),+],
                        got: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_wire_enum!(UserRole { Seller => "seller", Buyer => "buyer", Admin => "admin" });
impl_wire_enum!(ProductStatus { Pending => "pending", Approved => "approved", Rejected => "rejected" });
impl_wire_enum!(OrderStatus { Pending => "pending", Completed => "completed", Cancelled => "cancelled" });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub telegram_id: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub status: ProductStatus,
    pub seller_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub product_id: i64,
    pub buyer_id: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Metadata for a file that finished uploading to the object store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub entity_id: String,
    pub content_type: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}
