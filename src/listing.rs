//! Read-only views of the cache for the `lens issues` and `lens repos` commands.

use anyhow::Result;

use crate::cache;
use crate::config::Config;
use crate::db;
use crate::models::Issue;

const TITLE_WIDTH: usize = 72;

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= TITLE_WIDTH {
        return title.to_string();
    }
    let cut: String = title.chars().take(TITLE_WIDTH - 3).collect();
    format!("{}...", cut)
}

fn print_issue_row(issue: &Issue) {
    println!(
        "#{:<12} {:<20} {}",
        issue.id,
        issue.created_at,
        truncate_title(&issue.title)
    );
}

/// Print cached issues of `repo`, newest first.
pub async fn run_issues(config: &Config, repo: &str) -> Result<()> {
    let pool = db::open(config).await?;

    if !cache::is_repo_scanned(&pool, repo).await? {
        println!("{} has not been scanned. Run `lens scan {}` first.", repo, repo);
        pool.close().await;
        return Ok(());
    }

    let issues = cache::get_issues_for_repo(&pool, repo).await?;
    println!("--- {} ({} open issues) ---", repo, issues.len());
    for issue in &issues {
        print_issue_row(issue);
    }

    pool.close().await;
    Ok(())
}

/// Print every scanned repository with its issue count and scan time.
pub async fn run_repos(config: &Config) -> Result<()> {
    let pool = db::open(config).await?;

    let scans = cache::list_scans(&pool).await?;
    if scans.is_empty() {
        println!("No repositories scanned yet.");
    } else {
        println!("{:<40} {:>8}  SCANNED AT", "REPO", "ISSUES");
        for scan in &scans {
            println!("{:<40} {:>8}  {}", scan.repo, scan.issue_count, scan.scanned_at);
        }
    }

    pool.close().await;
    Ok(())
}
