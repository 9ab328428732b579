use rusqlite::OptionalExtension;
use tracing::{info, warn};

use amana_types::models::UserRole;

use crate::{Database, Result};

const DEMO_SELLER_TELEGRAM_ID: &str = "12345";

impl Database {
    /// Inserts a demo seller with two listings when the catalogue is empty.
    /// Returns whether anything was written.
    ///
    /// Nothing is seeded if the demo Telegram id already belongs to a user
    /// who is not a seller.
    pub fn seed_demo_data(&self) -> Result<bool> {
        if self.count_products()? > 0 {
            return Ok(false);
        }

        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT role FROM users WHERE telegram_id = ?1",
                    [DEMO_SELLER_TELEGRAM_ID],
                    |r| r.get(0),
                )
                .optional()?;
            if existing.as_deref().is_some_and(|role| role != UserRole::Seller.as_str()) {
                warn!(
                    "Demo telegram id {} is registered as a non-seller; skipping seed",
                    DEMO_SELLER_TELEGRAM_ID
                );
                return Ok(false);
            }

            info!("Seeding database with demo listings");
            let tx = conn.unchecked_transaction()?;

            tx.execute(
                "INSERT OR IGNORE INTO users (telegram_id, username, full_name, role)
                 VALUES (?1, 'demo_seller', 'Demo Seller', 'seller')",
                [DEMO_SELLER_TELEGRAM_ID],
            )?;
            let seller_id: i64 = tx.query_row(
                "SELECT id FROM users WHERE telegram_id = ?1",
                [DEMO_SELLER_TELEGRAM_ID],
                |r| r.get(0),
            )?;

            let listings = [
                (
                    "Traditional Coffee Set",
                    "Handmade ceramic coffee set with 6 cups.",
                    1500_i64,
                    "https://example.com/video.mp4",
                ),
                (
                    "Woven Basket",
                    "Colorful woven basket from Harar.",
                    800,
                    "https://example.com/video2.mp4",
                ),
            ];
            for (title, description, price, video_url) in listings {
                tx.execute(
                    "INSERT INTO products (title, description, price, video_url, thumbnail_url, seller_id)
                     VALUES (?1, ?2, ?3, ?4, 'https://placehold.co/600x400', ?5)",
                    rusqlite::params![title, description, price, video_url, seller_id],
                )?;
            }

            tx.commit()?;
            Ok(true)
        })
    }
}
