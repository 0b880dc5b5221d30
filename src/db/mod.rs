//! Database layer
//!
//! SQLite storage for the `local` store backend: user accounts, sessions and
//! chat messages. The hosted backend never touches this module.
//!
//! # Usage
//!
//! ```ignore
//! use ayunetra::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DbPool, SqliteDatabase};
