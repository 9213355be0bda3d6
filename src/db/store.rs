//! String and set operations over the key-value tables.

use sqlx::{Row, SqlitePool};

use crate::errors::AppError;

/// Key-value store with string values and unordered-by-contract sets.
///
/// Every write overwrites unconditionally; there is no compare-and-set.
#[derive(Clone)]
pub struct KvStore {
    pool: SqlitePool,
}

impl KvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Round-trip to the store, used by the health check.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ==================== STRING OPERATIONS ====================

    /// Read a string value; `None` when the key is absent.
    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM kv_strings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("value")))
    }

    /// Write a string value, replacing whatever was there.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO kv_strings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ==================== SET OPERATIONS ====================

    /// Add a member to a set. Adding an existing member is a no-op.
    pub async fn set_add(&self, key: &str, member: &str) -> Result<(), AppError> {
        sqlx::query("INSERT OR IGNORE INTO kv_sets (key, member) VALUES (?, ?)")
            .bind(key)
            .bind(member)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a member from a set. Removing a missing member is a no-op.
    pub async fn set_remove(&self, key: &str, member: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_sets WHERE key = ? AND member = ?")
            .bind(key)
            .bind(member)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All members of a set, in insertion order.
    pub async fn set_members(&self, key: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT member FROM kv_sets WHERE key = ? ORDER BY rowid")
            .bind(key)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("member")).collect())
    }
}
