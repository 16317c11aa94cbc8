//! Cached payloads with a time-to-live, kept apart from the catalog

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Cache key for the popular-books listing
pub const POPULAR_BOOKS_KEY: &str = "popular_books";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh(&self, ttl_secs: i64, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < Duration::seconds(ttl_secs)
    }
}
