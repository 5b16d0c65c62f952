//! Core types and trait definitions for revwatch.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend, the crawler and the messaging client are all traits here;
//! concrete implementations live in `revwatch-store-sqlite` and
//! `revwatch-http`.

pub mod crawl;
pub mod error;
pub mod freshness;
pub mod messaging;
pub mod profile;
pub mod review;
pub mod store;
pub mod subscription;

pub use error::{Error, Result};
