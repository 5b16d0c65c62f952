//! HTTP implementations of the pipeline's collaborators.
//!
//! - [`HttpCrawler`] asks a scraper service for profile and review data.
//! - [`DiscordMessenger`] resolves destinations and posts embeds through the
//!   Discord REST API with a bot token.
//!
//! Both wrap a [`reqwest::Client`] and map transport and status errors onto
//! the core failure types.

mod crawler;
mod discord;
mod endpoint;

pub mod error;

pub use crawler::{HttpCrawler, ScraperConfig};
pub use discord::{DiscordConfig, DiscordMessenger};
pub use error::{Error, Result};
