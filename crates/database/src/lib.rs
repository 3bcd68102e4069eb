//! SQLite persistence layer for the agency operations platform.
//!
//! This crate provides async database operations for staff, leads, clients,
//! brand-head assignments and the content workflow using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, models::NewStaff, staff, StaffRole};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:agency.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Register a brand head for the SPARK tier
//!     let head = staff::create_staff(
//!         db.pool(),
//!         &NewStaff::new("Asha", "asha@agency.test", StaffRole::BrandHead),
//!     )
//!     .await?;
//!     database::assignment::add_package(db.pool(), head.id, "SPARK").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod assignment;
pub mod broadcast_log;
pub mod client;
pub mod content;
pub mod error;
pub mod lead;
pub mod models;
pub mod staff;

pub use error::{DatabaseError, Result};
pub use models::{
    BdLead, BrandHeadLoad, BroadcastLogEntry, Client, ClientAssignment, ContentBatch,
    DesignerSubmission, HelpTicket, MarketingPost, Staff, StaffRole, TelecallerLead,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
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
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/agency.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect_with_pool_size("sqlite::memory:", 1).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    ///
    /// In-memory databases are private to a connection, so they must use a
    /// pool size of 1.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Connect to a fresh, migrated in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::connect_with_pool_size("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
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

/// Start a transaction that takes SQLite's write lock up front.
///
/// Concurrent callers queue on the lock (up to the busy timeout) instead of
/// reading state another writer is about to change. Dropping the transaction
/// without committing rolls it back, so a cancelled caller never hands a
/// locked connection back to the pool.
pub async fn begin_immediate(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Current UTC time in the fixed-width format stored in every timestamp column.
///
/// Fixed width keeps string order equal to time order, which the assignment
/// recency query relies on.
pub fn timestamp_now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::NewStaff;

    pub async fn test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    pub async fn add_staff(db: &Database, name: &str, role: StaffRole) -> Staff {
        let email = format!("{}@agency.test", name.to_lowercase());
        staff::create_staff(db.pool(), &NewStaff::new(name, &email, role))
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_fixed_width() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), "2024-06-01T09:00:00.000000Z".len());
        assert!(ts.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_migrations_create_schema() {
        let db = test_support::test_db().await;
        let tables = sqlx::query_scalar::<_, String>(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            ORDER BY name
            "#,
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        for table in [
            "bd_leads",
            "bd_tele_assignments",
            "brand_head_packages",
            "broadcast_log",
            "client_assignments",
            "clients",
            "content_batches",
            "designer_submissions",
            "help_tickets",
            "marketing_posts",
            "staff",
            "telecaller_leads",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
    }
}
