//! Scan pipeline: fetch open issues from GitHub into the local cache.
//!
//! validate → fetch → upsert (one transaction) → prune stale ids → record scan.
//!
//! Pruning means the cache reflects the current open set after every scan:
//! issues closed upstream since the last scan are removed. A scan whose
//! pagination stopped early skips pruning, since a missing id may only sit
//! on a page that was never read.

use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use thiserror::Error;

use crate::cache;
use crate::config::Config;
use crate::db;
use crate::github::{self, GitHubClient};

/// Outcome of a successful scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub repo: String,
    pub issues_fetched: usize,
    pub issues_pruned: u64,
    /// `false` when GitHub pagination stopped early.
    pub complete: bool,
}

/// Why a scan failed, split by who is at fault.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{0}")]
    InvalidRepo(String),
    #[error("could not fetch issues: {0:#}")]
    Fetch(anyhow::Error),
    #[error("could not update cache: {0:#}")]
    Storage(anyhow::Error),
}

pub async fn scan_repo(
    pool: &SqlitePool,
    client: &GitHubClient,
    repo: &str,
) -> Result<ScanReport, ScanError> {
    github::validate_repo(repo).map_err(|e| ScanError::InvalidRepo(e.to_string()))?;

    tracing::info!(repo, "scanning open issues");
    let outcome = client
        .fetch_open_issues(repo)
        .await
        .map_err(ScanError::Fetch)?;
    let issues = outcome.issues;

    cache::upsert_issues(pool, &issues)
        .await
        .map_err(ScanError::Storage)?;

    let issues_pruned = if outcome.complete {
        let fresh: HashSet<i64> = issues.iter().map(|i| i.id).collect();
        cache::prune_stale_issues(pool, repo, &fresh)
            .await
            .map_err(ScanError::Storage)?
    } else {
        tracing::warn!(repo, "partial fetch, skipping prune of stale issues");
        0
    };

    let cached = cache::get_issue_ids(pool, repo)
        .await
        .map_err(ScanError::Storage)?;
    cache::record_scan(pool, repo, cached.len() as i64)
        .await
        .map_err(ScanError::Storage)?;

    tracing::info!(
        repo,
        fetched = issues.len(),
        pruned = issues_pruned,
        complete = outcome.complete,
        "scan complete"
    );

    Ok(ScanReport {
        repo: repo.to_string(),
        issues_fetched: issues.len(),
        issues_pruned,
        complete: outcome.complete,
    })
}

/// CLI entry point for `lens scan <repo>`.
pub async fn run_scan(config: &Config, repo: &str) -> anyhow::Result<()> {
    let pool = db::open(config).await?;
    let client = GitHubClient::new(&config.github)?;

    let report = scan_repo(&pool, &client, repo).await?;

    println!("Scan {}", report.repo);
    println!("  fetched: {} open issues", report.issues_fetched);
    println!("  pruned:  {} stale issues", report.issues_pruned);
    if !report.complete {
        println!("  warning: pagination stopped early, stale issues were not pruned");
    }
    println!("ok");

    pool.close().await;
    Ok(())
}
