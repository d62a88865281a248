//! SQLite issue cache.
//!
//! Issues are keyed by their GitHub id. A row in `scans` marks a repository
//! whose scan completed, so "scanned with zero open issues" and "never
//! scanned" stay distinguishable.

use anyhow::Result;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashSet;

use crate::models::{Issue, ScanRecord};

/// Insert or update `issues` in one transaction.
pub async fn upsert_issues(pool: &SqlitePool, issues: &[Issue]) -> Result<u64> {
    let mut tx = pool.begin().await?;

    for issue in issues {
        sqlx::query(
            r#"
            INSERT INTO issues (id, repo, title, body, html_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                repo = excluded.repo,
                title = excluded.title,
                body = excluded.body,
                html_url = excluded.html_url,
                created_at = excluded.created_at
            "#,
        )
        .bind(issue.id)
        .bind(&issue.repo)
        .bind(&issue.title)
        .bind(&issue.body)
        .bind(&issue.html_url)
        .bind(&issue.created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(issues.len() as u64)
}

/// All cached issues for `repo`, newest first.
pub async fn get_issues_for_repo(pool: &SqlitePool, repo: &str) -> Result<Vec<Issue>> {
    let rows = sqlx::query(
        "SELECT id, repo, title, body, html_url, created_at FROM issues \
         WHERE repo = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(repo)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Issue {
            id: row.get("id"),
            repo: row.get("repo"),
            title: row.get("title"),
            body: row.get("body"),
            html_url: row.get("html_url"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// Whether a scan of `repo` has completed at least once.
///
/// Databases written before scans were recorded only have issue rows, so
/// those count too.
pub async fn is_repo_scanned(pool: &SqlitePool, repo: &str) -> Result<bool> {
    let scanned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM scans WHERE repo = ?) \
             OR EXISTS(SELECT 1 FROM issues WHERE repo = ?)",
    )
    .bind(repo)
    .bind(repo)
    .fetch_one(pool)
    .await?;

    Ok(scanned)
}

pub async fn get_issue_ids(pool: &SqlitePool, repo: &str) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT id FROM issues WHERE repo = ?")
        .bind(repo)
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

pub async fn delete_issues(pool: &SqlitePool, ids: &[i64]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM issues WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Delete cached issues of `repo` that are not in `fresh_ids`.
///
/// An issue missing from the latest fetch was closed, transferred, or
/// deleted upstream. Returns the number of rows removed.
pub async fn prune_stale_issues(
    pool: &SqlitePool,
    repo: &str,
    fresh_ids: &HashSet<i64>,
) -> Result<u64> {
    let stale: Vec<i64> = get_issue_ids(pool, repo)
        .await?
        .into_iter()
        .filter(|id| !fresh_ids.contains(id))
        .collect();

    if stale.is_empty() {
        tracing::debug!(repo, "no stale issues to prune");
        return Ok(0);
    }

    tracing::info!(repo, count = stale.len(), "pruning stale issues");
    delete_issues(pool, &stale).await
}

/// Mark `repo` as scanned now with `issue_count` open issues.
pub async fn record_scan(pool: &SqlitePool, repo: &str, issue_count: i64) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        r#"
        INSERT INTO scans (repo, issue_count, scanned_at) VALUES (?, ?, ?)
        ON CONFLICT(repo) DO UPDATE SET issue_count = excluded.issue_count, scanned_at = excluded.scanned_at
        "#,
    )
    .bind(repo)
    .bind(issue_count)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Every scanned repository, most recently scanned first.
pub async fn list_scans(pool: &SqlitePool) -> Result<Vec<ScanRecord>> {
    let rows =
        sqlx::query("SELECT repo, issue_count, scanned_at FROM scans ORDER BY scanned_at DESC, repo")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .iter()
        .map(|row| ScanRecord {
            repo: row.get("repo"),
            issue_count: row.get("issue_count"),
            scanned_at: format_ts_iso(row.get("scanned_at")),
        })
        .collect())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
