//! Database layer
//!
//! Trait-based abstraction over SQLite (default, tests and small installs)
//! and MySQL/MariaDB (the usual office deployment). The driver is selected
//! from configuration; repositories dispatch on it per operation.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
