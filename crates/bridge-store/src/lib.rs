//! SQLite persistence layer for the Signal bridge.
//!
//! This crate provides async database operations for Signal link connections,
//! the message audit log and conflict banners, using SQLx with SQLite, plus
//! the phone-number crypto (encryption at rest, one-way lookup hash).
//!
//! # Example
//!
//! ```no_run
//! use bridge_store::{connection, Database, PhoneCipher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:bridge.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let cipher = PhoneCipher::from_env("PHONE_CIPHER_KEY")?;
//!     connection::create_pending_link(db.pool(), "user-1").await?;
//!     connection::complete_link(db.pool(), &cipher, "user-1", "+15550001234").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod banner;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod models;

pub use crypto::{lookup_hash, mask_number, normalize_number, CryptoError, PhoneCipher};
pub use error::{Result, StoreError};
pub use models::{
    AuditDirection, ConflictBanner, Connection, ConnectionStatus, DeliveryStatus, MessageAudit,
    NotificationMode,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up
    /// to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
