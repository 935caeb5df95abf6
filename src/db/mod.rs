//! Database layer
//!
//! Persistence for the skill card and booking domain. Two backends are
//! supported:
//! - SQLite (default, single-file deployment)
//! - MySQL
//!
//! The driver is selected from `DatabaseConfig`. Repositories hold a
//! `DynDatabasePool` and branch on [`DatabasePool::backend`].
//!
//! # Usage
//!
//! ```ignore
//! use skillbook::config::DatabaseConfig;
//! use skillbook::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
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
