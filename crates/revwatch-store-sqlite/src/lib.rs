//! SQLite backend for revwatch.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Multi-statement writes run inside a
//! [`rusqlite::Transaction`], which rolls back when dropped uncommitted.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
