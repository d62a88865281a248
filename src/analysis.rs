//! Issue analysis engine.
//!
//! Routes cached issues through a [`GenerationProvider`]. When the issues
//! fit in one call ([`plan_chunks`] says "direct") a single prompt is sent.
//! Otherwise the issues are summarized chunk by chunk (map) and the
//! labelled summaries are synthesized in one final call (reduce):
//!
//! ```text
//!            ┌── chunk 1 ──▶ generate ──▶ "Chunk 1/N Summary"  ─┐
//! issues ────┼── chunk 2 ──▶ generate ──▶ "Chunk 2/N Summary"  ─┼──▶ reduce ──▶ analysis
//!            └── chunk N ──▶ generate ──▶ "Chunk N/N Summary"  ─┘
//! ```
//!
//! Chunks run one after another in index order. A provider failure comes
//! back as error text and is carried into the reduce step like any other
//! summary; nothing here aborts an analysis.
//!
//! Used by both the `lens analyze` CLI command and `POST /analyze`.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{debug, info, info_span, Instrument};

use crate::cache;
use crate::config::{Config, LlmConfig};
use crate::db;
use crate::llm::{self, Credentials, GenerationProvider, GenerationRequest};
use crate::models::Issue;
use crate::plan::plan_chunks;
use crate::prompt;

/// Returned without calling any provider when there is nothing to analyze.
pub const NO_ISSUES_PROVIDED: &str = "No issues provided for analysis.";
/// Returned by [`analyze_repo`] for a repository that was never scanned.
pub const REPO_NOT_SCANNED: &str = "Repo not scanned. Please scan first.";
/// Returned by [`analyze_repo`] for a scanned repository with no open issues.
pub const NO_ISSUES_FOUND: &str = "No issues found for this repo.";

/// One map-step result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSummary {
    /// 1-based.
    pub index: usize,
    pub total: usize,
    pub text: String,
}

impl ChunkSummary {
    /// The form the summary takes inside the reduce prompt.
    pub fn labelled(&self) -> String {
        format!(
            "Chunk {}/{} Summary:\n{}",
            self.index, self.total, self.text
        )
    }
}

/// Select a provider from `credentials` and analyze `issues` with it.
pub async fn analyze_issues(
    credentials: &Credentials,
    settings: &LlmConfig,
    instruction: &str,
    issues: &[Issue],
) -> String {
    let provider = llm::select_provider(credentials, settings);
    generate_analysis(provider.as_ref(), instruction, issues).await
}

/// Analyze `issues` against `instruction` with the given provider.
///
/// Issues `plan.unit_count() + 1` provider calls for a map-reduce run, one
/// call for a direct pass, and none for an empty slice.
pub async fn generate_analysis(
    provider: &dyn GenerationProvider,
    instruction: &str,
    issues: &[Issue],
) -> String {
    if issues.is_empty() {
        return NO_ISSUES_PROVIDED.to_string();
    }

    let total = issues.len();
    let plan = plan_chunks(total, provider.chunk_size());

    let span = info_span!(
        "analysis",
        provider = %provider.kind(),
        issues = total,
        units = plan.unit_count(),
        direct = plan.direct
    );

    async move {
        info!("starting analysis");

        if plan.direct {
            let request = GenerationRequest::new(prompt::direct_prompt(instruction, issues), total);
            return provider.generate(&request).await;
        }

        let unit_count = plan.unit_count();
        let mut summaries = Vec::with_capacity(unit_count);

        for (i, range) in plan.boundaries.iter().enumerate() {
            let chunk = &issues[range.clone()];
            let text = if i == 0 {
                prompt::first_chunk_prompt(instruction, chunk, unit_count)
            } else {
                prompt::chunk_prompt(instruction, chunk)
            };

            debug!(chunk = i + 1, size = chunk.len(), "summarizing chunk");
            let summary = provider.generate(&GenerationRequest::new(text, total)).await;

            summaries.push(ChunkSummary {
                index: i + 1,
                total: unit_count,
                text: summary,
            });
        }

        let combined = summaries
            .iter()
            .map(ChunkSummary::labelled)
            .collect::<Vec<_>>()
            .join("\n\n");

        debug!("reducing chunk summaries");
        let request = GenerationRequest::new(prompt::reduce_prompt(instruction, &combined), total);
        provider.generate(&request).await
    }
    .instrument(span)
    .await
}

/// Analyze the cached issues of `repo`.
///
/// Storage errors propagate. Everything else, including provider
/// failures, ends up in the returned text.
pub async fn analyze_repo(
    pool: &SqlitePool,
    credentials: &Credentials,
    settings: &LlmConfig,
    repo: &str,
    instruction: &str,
) -> Result<String> {
    if !cache::is_repo_scanned(pool, repo).await? {
        return Ok(REPO_NOT_SCANNED.to_string());
    }

    let issues = cache::get_issues_for_repo(pool, repo).await?;
    if issues.is_empty() {
        return Ok(NO_ISSUES_FOUND.to_string());
    }

    Ok(analyze_issues(credentials, settings, instruction, &issues).await)
}

/// CLI entry point for `lens analyze`. Prints the analysis to stdout.
pub async fn run_analyze(config: &Config, repo: &str, instruction: &str) -> Result<()> {
    let pool = db::open(config).await?;
    let credentials = Credentials::from_env();

    let analysis = analyze_repo(&pool, &credentials, &config.llm, repo, instruction).await?;
    println!("{}", analysis);

    pool.close().await;
    Ok(())
}
