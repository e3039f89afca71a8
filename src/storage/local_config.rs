use anyhow::Result;
use std::path::Path;

use super::schema::Database;
use super::types::LocalConfig;

const VERSION_CODE: &str = "version_code";
const FIRST_OPEN: &str = "first_open";
const LAST_BACKUP: &str = "last_backup";

impl Database {
    // ========================================================================
    // Installation State
    // ========================================================================

    pub async fn get_local(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM local_config WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn set_local(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO local_config (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Numeric local value, `0` when absent or unparsable.
    pub async fn get_local_i64(&self, key: &str) -> Result<i64> {
        Ok(self
            .get_local(key)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    /// Load installation state. A fresh database reports a first open.
    pub async fn load_local_config(&self) -> Result<LocalConfig> {
        let version_code = u32::try_from(self.get_local_i64(VERSION_CODE).await?).unwrap_or(0);
        let first_open = self
            .get_local(FIRST_OPEN)
            .await?
            .map(|v| v != "false")
            .unwrap_or(true);
        let last_backup = self.get_local_i64(LAST_BACKUP).await?;
        Ok(LocalConfig::new(version_code, first_open, last_backup))
    }

    pub async fn save_local_config(&self, local: &LocalConfig) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            (VERSION_CODE, local.version_code.to_string()),
            (FIRST_OPEN, local.is_first_open().to_string()),
            (LAST_BACKUP, local.last_backup.to_string()),
        ] {
            sqlx::query(
                "INSERT INTO local_config (key, value) VALUES (?, ?) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn record_backup(&self, at: i64) -> Result<()> {
        self.set_local(LAST_BACKUP, &at.to_string()).await
    }

    /// Write a consistent snapshot of the database to `dest`.
    pub async fn backup_to(&self, dest: &Path) -> Result<()> {
        if dest.exists() {
            std::fs::remove_file(dest)?;
        }
        sqlx::query("VACUUM INTO ?")
            .bind(dest.display().to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
