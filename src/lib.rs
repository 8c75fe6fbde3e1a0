//! feedreader - personal RSS/Atom feed aggregator
//!
//! Subscribes to feeds, stores their entries deduplicated by link, refreshes
//! them periodically and serves everything through a JSON API.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod rss;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{ReaderError, Result};
