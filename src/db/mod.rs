//! Database layer
//!
//! Supports two backends:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration. Repositories talk
//! to the `DatabasePool` trait and match on [`Backend`] for dialect-specific SQL.
//!
//! # Usage
//!
//! ```ignore
//! use foodgram::config::DatabaseConfig;
//! use foodgram::db::{create_pool, migrations};
//!
//! let config = DatabaseConfig::default();
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
