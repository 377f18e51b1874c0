// /////////////////////////////////////////////////////////////////////////////
// Cas Sync
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite schema helpers for the state index.
//!
//! Applies migrations on start-up so every process touching a cache root
//! sees a consistent database, whether it's the CLI or an integration test.

use sqlx::migrate::MigrateDatabase;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Runs pending migrations against the provided SQLite pool.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("ensuring state index schema is up to date");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("state index schema is up to date");
    Ok(())
}

/// Creates the SQLite database file if it doesn't exist yet.
pub async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    if !sqlx::Sqlite::database_exists(database_url).await? {
        debug!("state index database does not exist, creating: {}", database_url);
        sqlx::Sqlite::create_database(database_url).await?;
        info!("created new state index database: {}", database_url);
    } else {
        debug!("state index database already exists: {}", database_url);
    }
    Ok(())
}

/// Creates the database if missing, connects, and applies migrations.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    create_database_if_missing(database_url).await?;
    let pool = SqlitePool::connect(database_url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_create_database_if_missing() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{}", db_path);
        drop(temp);

        create_database_if_missing(&db_url).await.unwrap();
        create_database_if_missing(&db_url).await.unwrap();
    }

    #[tokio::test]
    async fn test_initialize_database() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{}", db_path);
        drop(temp);

        let pool = initialize_database(&db_url).await.unwrap();

        let result: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='state_index'")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result, 1, "state_index table should exist");
    }

    #[tokio::test]
    async fn test_ensure_schema_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let db_path = temp.path().to_str().unwrap();
        let db_url = format!("sqlite://{}", db_path);
        drop(temp);

        create_database_if_missing(&db_url).await.unwrap();
        let pool = SqlitePool::connect(&db_url).await.unwrap();

        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }
}
