use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Key-Value Cache
    // ========================================================================

    /// Store a value. `deadline` is unix seconds; 0 keeps it forever.
    pub async fn put_cache(&self, key: &str, value: &str, deadline: i64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO caches (key, value, deadline) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(deadline)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Read a value unless it expired before `now`.
    pub async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT value FROM caches WHERE key = ? AND (deadline = 0 OR deadline > ?)",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(value,)| value))
    }

    /// Delete entries whose deadline has passed. Returns the number removed.
    pub async fn delete_expired_caches(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM caches WHERE deadline > 0 AND deadline <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_cache_respects_deadline() {
        let db = test_db().await;
        db.put_cache("fresh", "a", 2_000).await.unwrap();
        db.put_cache("stale", "b", 500).await.unwrap();
        db.put_cache("forever", "c", 0).await.unwrap();

        assert_eq!(db.get_cache("fresh", 1_000).await.unwrap().as_deref(), Some("a"));
        assert_eq!(db.get_cache("stale", 1_000).await.unwrap(), None);
        assert_eq!(db.get_cache("forever", i64::MAX).await.unwrap().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_permanent() {
        let db = test_db().await;
        db.put_cache("stale", "b", 500).await.unwrap();
        db.put_cache("edge", "x", 1_000).await.unwrap();
        db.put_cache("forever", "c", 0).await.unwrap();

        assert_eq!(db.delete_expired_caches(1_000).await.unwrap(), 2);
        assert_eq!(db.delete_expired_caches(1_000).await.unwrap(), 0);
        assert!(db.get_cache("forever", 1_000).await.unwrap().is_some());
    }
}
