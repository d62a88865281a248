//! Core data models used throughout Issue Lens.
//!
//! These types represent the issues that flow from the GitHub API through
//! the local cache into the analysis engine.

use serde::{Deserialize, Serialize};

/// An issue as stored in the local cache.
///
/// This is the record the analysis engine consumes. `repo` is the
/// `owner/name` scope the issue was fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub repo: String,
    pub title: String,
    pub body: Option<String>,
    pub html_url: String,
    pub created_at: String,
}

/// Raw issue item from `GET /repos/{owner}/{repo}/issues`.
///
/// Only the fields the cache keeps are deserialized. The issues endpoint
/// also returns pull requests; those carry a `pull_request` object.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubIssue {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub created_at: String,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl GitHubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Normalize into a cache record scoped to `repo`.
    pub fn into_issue(self, repo: &str) -> Issue {
        Issue {
            id: self.id,
            repo: repo.to_string(),
            title: self.title,
            body: self.body,
            html_url: self.html_url,
            created_at: self.created_at,
        }
    }
}

/// A completed scan of one repository.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    pub repo: String,
    pub issue_count: i64,
    /// ISO8601
    pub scanned_at: String,
}
