//! Caching layer for market and macro data.

pub mod sqlite;

pub use sqlite::{CacheStats, SqliteCache};
