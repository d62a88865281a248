//! GitHub REST client for open issues.
//!
//! Lists `GET /repos/{owner}/{name}/issues?state=open` page by page,
//! following the `Link: <…>; rel="next"` header. The issues endpoint also
//! returns pull requests; those are dropped here so the cache only ever
//! sees real issues.
//!
//! A failure on the first page is an error. A failure on a later page stops
//! pagination and keeps what was already fetched, since a partial issue list
//! is still useful for analysis.

use anyhow::{bail, Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use std::time::Duration;

use crate::config::GitHubConfig;
use crate::models::{GitHubIssue, Issue};

const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";

/// Check that `repo` is `owner/name`: two non-empty segments, one `/`,
/// only characters GitHub allows in owner and repository names.
pub fn validate_repo(repo: &str) -> Result<()> {
    let mut parts = repo.split('/');
    let (owner, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) => (owner, name),
        _ => bail!("invalid repository '{}': expected owner/name", repo),
    };

    for segment in [owner, name] {
        if segment.is_empty() {
            bail!("invalid repository '{}': expected owner/name", repo);
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            bail!("invalid repository '{}': unexpected character", repo);
        }
    }

    Ok(())
}

/// Extract the `rel="next"` target from a `Link` header value.
pub fn next_page_url(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

/// Result of paging through a repository's open issues.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub issues: Vec<Issue>,
    /// `false` when a later page failed and pagination stopped early.
    pub complete: bool,
}

pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    per_page: u32,
    token: Option<String>,
}

impl GitHubClient {
    /// Build a client from config. The token comes from `GITHUB_TOKEN`.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            token: config.token(),
        })
    }

    /// Replace the bearer token (or drop it with `None`).
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Fetch every open issue of `repo`, excluding pull requests.
    ///
    /// A failed later page yields what was fetched so far with
    /// `complete: false`.
    pub async fn fetch_open_issues(&self, repo: &str) -> Result<FetchOutcome> {
        validate_repo(repo)?;

        let mut url = format!(
            "{}/repos/{}/issues?state=open&per_page={}",
            self.api_base, repo, self.per_page
        );
        let mut issues = Vec::new();
        let mut page = 1u32;
        let mut complete = true;

        loop {
            let resp = self
                .request(&url)
                .send()
                .await
                .with_context(|| format!("Failed to fetch issues for {}", repo))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(500).collect();
                if page == 1 {
                    bail!("GitHub API error for {} (HTTP {}): {}", repo, status, snippet);
                }
                tracing::warn!(
                    repo,
                    page,
                    status = status.as_u16(),
                    fetched = issues.len(),
                    "stopping pagination early, keeping issues fetched so far"
                );
                complete = false;
                break;
            }

            let next = resp
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_url);

            let items: Vec<GitHubIssue> = resp
                .json()
                .await
                .with_context(|| format!("Invalid issues payload for {} (page {})", repo, page))?;

            if items.is_empty() {
                break;
            }

            let before = issues.len();
            issues.extend(
                items
                    .into_iter()
                    .filter(|item| !item.is_pull_request())
                    .map(|item| item.into_issue(repo)),
            );
            tracing::debug!(repo, page, kept = issues.len() - before, "fetched issues page");

            match next {
                Some(next_url) => {
                    url = next_url;
                    page += 1;
                }
                None => break,
            }
        }

        Ok(FetchOutcome { issues, complete })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .get(url)
            .header(USER_AGENT, concat!("issue-lens/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, ACCEPT_GITHUB_JSON);
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        req
    }
}
