use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the cache schema. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // GitHub issue ids are globally unique, so `id` alone is the key.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issues (
            id INTEGER PRIMARY KEY,
            repo TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT,
            html_url TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per repository whose scan completed.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scans (
            repo TEXT PRIMARY KEY,
            issue_count INTEGER NOT NULL,
            scanned_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issues_repo ON issues(repo)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issues_created_at ON issues(created_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
