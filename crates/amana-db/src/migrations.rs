use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, products, orders)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_id TEXT NOT NULL UNIQUE,
                username    TEXT,
                full_name   TEXT,
                role        TEXT NOT NULL DEFAULT 'buyer'
                            CHECK (role IN ('seller', 'buyer', 'admin')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE products (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                title         TEXT NOT NULL,
                description   TEXT NOT NULL,
                price         INTEGER NOT NULL CHECK (price >= 1),
                video_url     TEXT NOT NULL,
                thumbnail_url TEXT,
                status        TEXT NOT NULL DEFAULT 'pending'
                              CHECK (status IN ('pending', 'approved', 'rejected')),
                seller_id     INTEGER NOT NULL REFERENCES users(id),
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_products_status ON products(status);
            CREATE INDEX idx_products_seller ON products(seller_id);

            CREATE TABLE orders (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id  INTEGER NOT NULL REFERENCES products(id),
                buyer_id    INTEGER NOT NULL REFERENCES users(id),
                status      TEXT NOT NULL DEFAULT 'pending'
                            CHECK (status IN ('pending', 'completed', 'cancelled')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (object metadata)");
        conn.execute_batch(
            "
            CREATE TABLE objects (
                entity_id    TEXT PRIMARY KEY,
                content_type TEXT NOT NULL,
                size         INTEGER NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
