//! Cache entries repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::CacheRepository;
use crate::{error::AppResult, models::cache::CacheEntry};

#[derive(Clone)]
pub struct PgCacheRepository {
    pool: Pool<Postgres>,
}

impl PgCacheRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheRepository for PgCacheRepository {
    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        let entry = sqlx::query_as::<_, CacheEntry>(
            "SELECT key, payload, fetched_at FROM cache_entries WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn put(&self, key: &str, payload: &serde_json::Value) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, payload, fetched_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE SET payload = EXCLUDED.payload, fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(key)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
