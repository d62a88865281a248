//! Prompt rendering for issue analysis.
//!
//! Every prompt the analysis engine sends is built here, so the wording of
//! the direct pass, the map steps and the final synthesis lives in one place.

use crate::models::Issue;

/// Placeholder rendered for issues without a body.
pub const NO_DESCRIPTION: &str = "No description";

/// Render one issue as a fixed two-line block.
pub fn format_issue(issue: &Issue) -> String {
    format!(
        "- #{} {} (Created: {})\n  Body: {}...\n",
        issue.id,
        issue.title,
        issue.created_at,
        issue.body.as_deref().unwrap_or(NO_DESCRIPTION)
    )
}

/// Render a list of issues in order, one block per issue.
pub fn join_context(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(format_issue)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-call prompt used when every issue fits in one provider call.
pub fn direct_prompt(instruction: &str, issues: &[Issue]) -> String {
    format!(
        "You are analyzing GitHub issues. \n\
         User Prompt: {}\n\n\
         Issues Context:\n{}\n\n\
         Please provide the analysis.",
        instruction,
        join_context(issues)
    )
}

/// Map prompt for the first chunk. Carries the same persona as the direct
/// pass so the model sees the full task once.
pub fn first_chunk_prompt(instruction: &str, issues: &[Issue], total: usize) -> String {
    format!(
        "You are analyzing GitHub issues. \n\
         User Prompt: {}\n\n\
         The issues are split into {} batches. This is batch 1. \
         Summarize the issues below as they relate to the user prompt.\n\
         Focus on themes, bugs, and feature requests.\n\n\
         Issues Context:\n{}",
        instruction,
        total,
        join_context(issues)
    )
}

/// Shorter map prompt for every chunk after the first.
pub fn chunk_prompt(instruction: &str, issues: &[Issue]) -> String {
    format!(
        "Summarize these GitHub issues relevant to this request: '{}'.\n\
         Focus on themes, bugs, and feature requests.\n\n\
         Issues:\n{}",
        instruction,
        join_context(issues)
    )
}

/// Reduce prompt that folds the labelled chunk summaries into one answer.
pub fn reduce_prompt(instruction: &str, combined_summaries: &str) -> String {
    format!(
        "You are providing a final analysis of GitHub issues based on summaries of issue batches.\n\
         User Prompt: {}\n\n\
         Intermediate Summaries:\n{}\n\n\
         Synthesize these summaries into a cohesive answer addressing the user prompt.",
        instruction, combined_summaries
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: i64, title: &str, body: Option<&str>) -> Issue {
        Issue {
            id,
            repo: "o/r".into(),
            title: title.into(),
            body: body.map(String::from),
            html_url: format!("https://github.com/o/r/issues/{}", id),
            created_at: "2024-03-01T10:00:00Z".into(),
        }
    }

    #[test]
    fn test_format_issue_with_body() {
        let text = format_issue(&issue(42, "Crash on save", Some("Stack trace attached")));
        assert_eq!(
            text,
            "- #42 Crash on save (Created: 2024-03-01T10:00:00Z)\n  Body: Stack trace attached...\n"
        );
    }

    #[test]
    fn test_format_issue_without_body() {
        let text = format_issue(&issue(1, "Empty", None));
        assert!(text.contains("Body: No description..."));
    }

    #[test]
    fn test_join_context_preserves_order() {
        let issues = vec![issue(3, "third", None), issue(1, "first", None)];
        let ctx = join_context(&issues);
        let third = ctx.find("#3 third").unwrap();
        let first = ctx.find("#1 first").unwrap();
        assert!(third < first);
    }

    #[test]
    fn test_join_context_empty() {
        assert_eq!(join_context(&[]), "");
    }

    #[test]
    fn test_direct_prompt_contains_instruction_and_issues() {
        let prompt = direct_prompt("Find regressions", &[issue(9, "Slow build", None)]);
        assert!(prompt.starts_with("You are analyzing GitHub issues."));
        assert!(prompt.contains("User Prompt: Find regressions"));
        assert!(prompt.contains("#9 Slow build"));
        assert!(prompt.ends_with("Please provide the analysis."));
    }

    #[test]
    fn test_first_chunk_carries_persona_later_chunks_do_not() {
        let issues = [issue(1, "A", None)];
        let first = first_chunk_prompt("themes?", &issues, 3);
        let later = chunk_prompt("themes?", &issues);
        assert!(first.contains("You are analyzing GitHub issues."));
        assert!(first.contains("3 batches"));
        assert!(!later.contains("You are analyzing"));
        assert!(later.contains("relevant to this request: 'themes?'"));
    }

    #[test]
    fn test_reduce_prompt_embeds_summaries() {
        let prompt = reduce_prompt("themes?", "Chunk 1/2 Summary:\nx\n\nChunk 2/2 Summary:\ny");
        assert!(prompt.contains("Intermediate Summaries:\nChunk 1/2 Summary:"));
        assert!(prompt.contains("User Prompt: themes?"));
    }
}
