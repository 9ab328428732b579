use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params, params_from_iter};

use amana_types::api::{InsertOrder, InsertProduct, InsertUser, ProductFilter, UpdateProduct};
use amana_types::models::{Order, Product, StoredObject, User};

use crate::models::{
    OBJECT_COLUMNS, ORDER_COLUMNS, ObjectRow, OrderRow, PRODUCT_COLUMNS, ProductRow,
    USER_COLUMNS, UserRow,
};
use crate::{Database, DbError, Result};

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &InsertUser) -> Result<User> {
        self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO users (telegram_id, username, full_name, role)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING {USER_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![
                    &user.telegram_id,
                    &user.username,
                    &user.full_name,
                    user.role.as_str()
                ],
                UserRow::from_row,
            )
            .map_err(|e| unique_violation(e, "user", "telegramId"))?
            .into_model()
        })
    }

    pub fn get_user_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?1");
            conn.query_row(&sql, [telegram_id], UserRow::from_row)
                .optional()?
                .map(UserRow::into_model)
                .transpose()
        })
    }

    // -- Products --

    /// Newest first. `None` fields in the filter match everything.
    pub fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        self.with_conn(|conn| {
            let mut clauses = Vec::new();
            let mut values: Vec<SqlValue> = Vec::new();
            if let Some(status) = filter.status {
                values.push(SqlValue::Text(status.as_str().to_string()));
                clauses.push(format!("status = ?{}", values.len()));
            }
            if let Some(seller_id) = filter.seller_id {
                values.push(SqlValue::Integer(seller_id));
                clauses.push(format!("seller_id = ?{}", values.len()));
            }

            let where_clause = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };
            let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products {where_clause} ORDER BY id DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), ProductRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(ProductRow::into_model).collect()
        })
    }

    pub fn get_product(&self, id: i64) -> Result<Option<Product>> {
        self.with_conn(|conn| query_product(conn, id))
    }

    pub fn create_product(&self, product: &InsertProduct) -> Result<Product> {
        self.with_conn_mut(|conn| {
            require_row(conn, "users", product.seller_id, "seller", "sellerId")?;

            let sql = format!(
                "INSERT INTO products (title, description, price, video_url, thumbnail_url, seller_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING {PRODUCT_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![
                    &product.title,
                    &product.description,
                    product.price,
                    &product.video_url,
                    &product.thumbnail_url,
                    product.seller_id
                ],
                ProductRow::from_row,
            )?
            .into_model()
        })
    }

    /// Applies the present fields of `update`. Returns `None` when no product
    /// has the given id.
    pub fn update_product(&self, id: i64, update: &UpdateProduct) -> Result<Option<Product>> {
        self.with_conn_mut(|conn| {
            if update.is_empty() {
                return query_product(conn, id);
            }
            if let Some(seller_id) = update.seller_id {
                require_row(conn, "users", seller_id, "seller", "sellerId")?;
            }

            let mut sets = Vec::new();
            let mut values: Vec<SqlValue> = Vec::new();
            let mut set = |column: &str, value: SqlValue| {
                values.push(value);
                sets.push(format!("{} = ?{}", column, values.len()));
            };

            if let Some(title) = &update.title {
                set("title", SqlValue::Text(title.clone()));
            }
            if let Some(description) = &update.description {
                set("description", SqlValue::Text(description.clone()));
            }
            if let Some(price) = update.price {
                set("price", SqlValue::Integer(price));
            }
            if let Some(video_url) = &update.video_url {
                set("video_url", SqlValue::Text(video_url.clone()));
            }
            if let Some(thumbnail_url) = &update.thumbnail_url {
                set(
                    "thumbnail_url",
                    thumbnail_url.clone().map_or(SqlValue::Null, SqlValue::Text),
                );
            }
            if let Some(seller_id) = update.seller_id {
                set("seller_id", SqlValue::Integer(seller_id));
            }
            if let Some(status) = update.status {
                set("status", SqlValue::Text(status.as_str().to_string()));
            }

            values.push(SqlValue::Integer(id));
            let sql = format!(
                "UPDATE products SET {} WHERE id = ?{} RETURNING {PRODUCT_COLUMNS}",
                sets.join(", "),
                values.len()
            );
            conn.query_row(&sql, params_from_iter(values), ProductRow::from_row)
                .optional()?
                .map(ProductRow::into_model)
                .transpose()
        })
    }

    pub fn count_products(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))?)
        })
    }

    // -- Orders --

    pub fn create_order(&self, order: &InsertOrder) -> Result<Order> {
        self.with_conn_mut(|conn| {
            require_row(conn, "products", order.product_id, "product", "productId")?;
            require_row(conn, "users", order.buyer_id, "buyer", "buyerId")?;

            let sql = format!(
                "INSERT INTO orders (product_id, buyer_id, status)
                 VALUES (?1, ?2, ?3)
                 RETURNING {ORDER_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![order.product_id, order.buyer_id, order.status.as_str()],
                OrderRow::from_row,
            )?
            .into_model()
        })
    }

    // -- Objects --

    pub fn insert_object(&self, entity_id: &str, content_type: &str, size: u64) -> Result<StoredObject> {
        self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO objects (entity_id, content_type, size)
                 VALUES (?1, ?2, ?3)
                 RETURNING {OBJECT_COLUMNS}"
            );
            conn.query_row(
                &sql,
                params![entity_id, content_type, size as i64],
                ObjectRow::from_row,
            )
            .map_err(|e| unique_violation(e, "object", "entityId"))?
            .into_model()
        })
    }

    pub fn get_object(&self, entity_id: &str) -> Result<Option<StoredObject>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {OBJECT_COLUMNS} FROM objects WHERE entity_id = ?1");
            conn.query_row(&sql, [entity_id], ObjectRow::from_row)
                .optional()?
                .map(ObjectRow::into_model)
                .transpose()
        })
    }
}

fn query_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    conn.query_row(&sql, [id], ProductRow::from_row)
        .optional()?
        .map(ProductRow::into_model)
        .transpose()
}

/// Fails with `MissingReference` unless `table` has a row with this id.
fn require_row(
    conn: &Connection,
    table: &str,
    id: i64,
    entity: &'static str,
    field: &'static str,
) -> Result<()> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    let exists: bool = conn.query_row(&sql, [id], |r| r.get(0))?;
    if exists {
        Ok(())
    } else {
        Err(DbError::MissingReference { entity, field })
    }
}

fn unique_violation(err: rusqlite::Error, entity: &'static str, field: &'static str) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
        {
            DbError::Conflict { entity, field }
        }
        _ => DbError::Sqlite(err),
    }
}
