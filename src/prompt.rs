use crate::budget::ProcessingResult;
use crate::changelog::{ChangeCategory, ChangelogEntry};
use crate::changeset::CommitInfo;
use anyhow::{Result, bail};
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

static ENTRY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+\.)?\s*\[?(?P<category>[A-Za-z][A-Za-z &]*?)\]?\s*(?:\((?P<scope>[^)]+)\))?\s*:\s*(?P<description>.+?)\s*$")
        .expect("valid regex")
});

fn instructions() -> String {
    let labels: Vec<&str> = ChangeCategory::ALL.iter().map(|c| c.label()).collect();
    format!(
        r#"
YOU ARE A CHANGELOG WRITER.

Describe the user-visible effect of the changes below as changelog entries.

OUTPUT FORMAT (one entry per line, nothing else):
- <category>: <description>

RULES:
- <category> is one of: {}
- descriptions are short, imperative and start with a capital letter
- mention what changed for users, not how the code changed
- one to five entries; merge closely related changes
- no preamble, no explanations, no markdown headings
"#,
        labels.join(", ")
    )
    .trim()
    .to_string()
}

/// each processed file under a header, the summary record as plain text
pub fn render_files(result: &ProcessingResult) -> String {
    let mut output = String::new();
    for file in &result.processed_files {
        if file.is_summary {
            let _ = writeln!(output, "{}\n", file.diff);
            continue;
        }
        let status = file.status.map_or("Changed", |status| status.label());
        match (file.original_size, file.compressed_size, &file.bulk_pattern_label) {
            (Some(original), Some(compressed), None) => {
                let _ = writeln!(
                    output,
                    "### {} ({status}, reduced from {original} to {compressed} chars)",
                    file.path
                );
            }
            _ => {
                let _ = writeln!(output, "### {} ({status})", file.path);
            }
        }
        let _ = writeln!(output, "```diff\n{}\n```\n", file.diff.trim_end());
    }
    output.trim_end().to_string()
}

/// bullet list of detected bulk patterns; empty when there are none
pub fn render_patterns(result: &ProcessingResult) -> String {
    result
        .patterns
        .values()
        .map(|pattern| {
            if pattern.details.is_empty() {
                format!("- {}: {}", pattern.kind, pattern.description)
            } else {
                format!(
                    "- {}: {} ({})",
                    pattern.kind,
                    pattern.description,
                    pattern.details.join(", ")
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_changes(output: &mut String, result: &ProcessingResult) {
    let patterns = render_patterns(result);
    if !patterns.is_empty() {
        let _ = writeln!(output, "Bulk changes detected:\n{patterns}\n");
    }
    if result.processed_files.is_empty() {
        output.push_str("(no file changes)");
    } else {
        output.push_str(&render_files(result));
    }
}

pub fn build_commit_prompt(commit: &CommitInfo, result: &ProcessingResult) -> String {
    let mut output = instructions();
    let _ = write!(
        output,
        "\n\nCommit message: {}\n",
        commit.summary
    );
    if !commit.body.is_empty() {
        let _ = writeln!(output, "Commit details:\n{}", commit.body);
    }
    let _ = writeln!(output, "Author: {}\n", commit.author);
    render_changes(&mut output, result);
    output
}

pub fn build_working_prompt(result: &ProcessingResult) -> String {
    let mut output = instructions();
    output.push_str("\n\nUncommitted changes in the working directory:\n\n");
    render_changes(&mut output, result);
    output
}

/// parse `- <category>: <description>` lines; other lines are ignored
pub fn parse_entries(response: &str, commit: Option<&str>) -> Result<Vec<ChangelogEntry>> {
    let entries: Vec<ChangelogEntry> = response
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .filter_map(|line| {
            let captures = ENTRY_LINE.captures(line)?;
            let category = ChangeCategory::from_label(&captures["category"])?;
            let description = captures["description"].trim();
            if description.is_empty() {
                return None;
            }
            Some(ChangelogEntry {
                category,
                scope: captures.name("scope").map(|m| m.as_str().trim().to_string()),
                description: description.to_string(),
                commit: commit.map(str::to_string),
            })
        })
        .collect();

    if entries.is_empty() {
        bail!("response contained no changelog entries");
    }
    Ok(entries)
}
