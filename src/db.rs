// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePool, Sqlite};

pub async fn create_db_pool(db_url: &str) -> Result<SqlitePool> {
    // Create database if it doesn't exist
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePool::connect(db_url).await?;
    migrate(&pool).await?;

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

/// Store `value` under `key`, replacing any previous value.
pub async fn kv_set(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO kv_store (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn kv_get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let record = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT value
        FROM kv_store
        WHERE key = ?
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(record.map(|(value,)| value))
}

pub async fn kv_remove(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM kv_store WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}

/// Single-connection in-memory pool; every connection to `sqlite::memory:`
/// would otherwise see its own empty database.
#[cfg(test)]
pub async fn create_test_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_kv_operations() -> Result<()> {
        let pool = create_test_pool().await?;

        assert!(kv_get(&pool, "missing").await?.is_none());

        kv_set(&pool, "k", "first").await?;
        assert_eq!(kv_get(&pool, "k").await?.as_deref(), Some("first"));

        // Overwrite
        kv_set(&pool, "k", "second").await?;
        assert_eq!(kv_get(&pool, "k").await?.as_deref(), Some("second"));

        kv_remove(&pool, "k").await?;
        assert!(kv_get(&pool, "k").await?.is_none());

        // Removing an absent key is fine
        kv_remove(&pool, "k").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_file_database_is_created() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}", dir.path().join("fx.db").display());

        let pool = create_db_pool(&url).await?;
        kv_set(&pool, "k", "v").await?;
        pool.close().await;

        let reopened = create_db_pool(&url).await?;
        assert_eq!(kv_get(&reopened, "k").await?.as_deref(), Some("v"));
        Ok(())
    }
}
