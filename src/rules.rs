//! Rule-based change classification, used when no AI provider is available
//! or when a provider call fails.

use crate::budget::is_dependency_manifest;
use crate::changelog::{ChangeCategory, ChangelogEntry};
use crate::changeset::{ChangeSet, CommitInfo, FileChange, FileStatus};
use regex::Regex;
use std::sync::LazyLock;

static CONVENTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^)]+)\))?(?P<bang>!)?:\s*(?P<desc>.+)$")
        .expect("valid regex")
});
static DECLARATION_ADDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+\s*(export\s+)?(pub(\(\w+\))?\s+)?(async\s+)?(function|class|fn|def|struct|enum|trait|interface)\s")
        .expect("valid regex")
});
static FIX_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\+.*(//|#|/\*).*\b(fix|fixes|fixed|bug|workaround)\b").expect("valid regex")
});

const VAGUE_MESSAGES: &[&str] = &[
    "wip", "update", "updates", "changes", "misc", "stuff", "fixup", "tmp", "save", "commit",
];

/// a parsed `type(scope)!: description` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventional {
    pub kind: String,
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: String,
}

pub fn parse_conventional(summary: &str) -> Option<Conventional> {
    let captures = CONVENTIONAL.captures(summary.trim())?;
    Some(Conventional {
        kind: captures["type"].to_lowercase(),
        scope: captures.name("scope").map(|m| m.as_str().trim().to_string()),
        breaking: captures.name("bang").is_some(),
        description: captures["desc"].trim().to_string(),
    })
}

fn category_for_type(kind: &str) -> Option<ChangeCategory> {
    let category = match kind {
        "feat" | "feature" => ChangeCategory::Feature,
        "fix" | "bugfix" | "hotfix" => ChangeCategory::Fix,
        "perf" => ChangeCategory::Performance,
        "refactor" => ChangeCategory::Refactor,
        "docs" | "doc" => ChangeCategory::Documentation,
        "test" | "tests" => ChangeCategory::Test,
        "build" | "ci" | "deps" => ChangeCategory::Build,
        "chore" | "style" | "revert" => ChangeCategory::Chore,
        _ => return None,
    };
    Some(category)
}

/// classify a commit message by conventional type, then by keywords
pub fn classify_message(summary: &str, body: &str) -> ChangeCategory {
    if body.contains("BREAKING CHANGE") || body.contains("BREAKING-CHANGE") {
        return ChangeCategory::Breaking;
    }
    if let Some(conventional) = parse_conventional(summary) {
        if conventional.breaking {
            return ChangeCategory::Breaking;
        }
        if let Some(category) = category_for_type(&conventional.kind) {
            return category;
        }
    }
    classify_keywords(summary)
}

fn classify_keywords(text: &str) -> ChangeCategory {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|word| lower.contains(word));

    if has(&["fix", "bug", "issue", "error", "crash", "resolve"]) {
        ChangeCategory::Fix
    } else if has(&["perf", "optimi", "speed", "faster", "cache"]) {
        ChangeCategory::Performance
    } else if has(&["refactor", "cleanup", "clean up", "restructure", "rename", "simplif"]) {
        ChangeCategory::Refactor
    } else if has(&["doc", "readme", "comment"]) {
        ChangeCategory::Documentation
    } else if has(&["test", "spec", "coverage"]) {
        ChangeCategory::Test
    } else if has(&["build", "ci ", "pipeline", "deps", "dependenc", "bump", "release"]) {
        ChangeCategory::Build
    } else if has(&["add", "implement", "introduce", "support", "new ", "create", "enable"]) {
        ChangeCategory::Feature
    } else {
        ChangeCategory::Chore
    }
}

/// classify a single file by its path and diff content
pub fn analyze_file_content(file: &FileChange) -> ChangeCategory {
    let lower = file.path.to_lowercase();
    let probe = format!("/{lower}");

    if probe.contains("/test/")
        || probe.contains("/tests/")
        || probe.contains(".test.")
        || probe.contains(".spec.")
        || lower.ends_with("_test.go")
        || lower.ends_with("_test.rs")
    {
        return ChangeCategory::Test;
    }
    if lower.ends_with(".md") || probe.contains("/docs/") {
        return ChangeCategory::Documentation;
    }
    if is_dependency_manifest(&file.path)
        || probe.contains("/.github/")
        || lower.ends_with("dockerfile")
        || lower.ends_with("makefile")
    {
        return ChangeCategory::Build;
    }

    let (added, removed, declarations, fixes) =
        file.changed_lines()
            .fold((0, 0, 0, 0), |(added, removed, declarations, fixes), line| {
                let is_added = line.starts_with('+');
                (
                    added + usize::from(is_added),
                    removed + usize::from(!is_added),
                    declarations + usize::from(DECLARATION_ADDED.is_match(line)),
                    fixes + usize::from(FIX_COMMENT.is_match(line)),
                )
            });

    match file.status {
        FileStatus::Added | FileStatus::Untracked => ChangeCategory::Feature,
        FileStatus::Deleted | FileStatus::Renamed => ChangeCategory::Refactor,
        FileStatus::Modified if fixes > 0 => ChangeCategory::Fix,
        FileStatus::Modified if declarations > 0 => ChangeCategory::Feature,
        FileStatus::Modified if removed > added * 2 => ChangeCategory::Refactor,
        FileStatus::Modified => ChangeCategory::Chore,
    }
}

/// the category most files in a change fall into
fn dominant_category(files: &[FileChange]) -> Option<ChangeCategory> {
    let categories: Vec<ChangeCategory> = files.iter().map(analyze_file_content).collect();
    ChangeCategory::ALL
        .iter()
        .copied()
        .map(|category| (category, categories.iter().filter(|c| **c == category).count()))
        .filter(|(_, count)| *count > 0)
        // ties go to the earlier (more notable) category
        .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then(b.cmp(a)))
        .map(|(category, _)| category)
}

fn is_vague(summary: &str) -> bool {
    let normalized = summary
        .trim()
        .trim_end_matches(['.', '!'])
        .to_lowercase();
    normalized.len() < 4 || VAGUE_MESSAGES.contains(&normalized.as_str())
}

/// one entry per commit, from its message or (for vague messages) its files
pub fn analyze_commit(commit: &CommitInfo) -> Vec<ChangelogEntry> {
    let conventional = parse_conventional(&commit.summary);
    let mut category = classify_message(&commit.summary, &commit.body);
    let description = conventional
        .as_ref()
        .map_or_else(|| commit.summary.clone(), |c| c.description.clone());

    if is_vague(&description) && category != ChangeCategory::Breaking {
        if let Some(dominant) = dominant_category(&commit.files) {
            category = dominant;
        }
        let description = describe_files(&commit.files);
        return vec![ChangelogEntry {
            category,
            scope: None,
            description,
            commit: Some(commit.short_id.clone()),
        }];
    }

    vec![ChangelogEntry {
        category,
        scope: conventional.and_then(|c| c.scope),
        description: capitalize(&description),
        commit: Some(commit.short_id.clone()),
    }]
}

/// one entry per working-directory file
pub fn analyze_working_changes(changeset: &ChangeSet) -> Vec<ChangelogEntry> {
    changeset
        .files
        .iter()
        .map(|file| ChangelogEntry {
            category: analyze_file_content(file),
            scope: None,
            description: describe_file_change(file),
            commit: None,
        })
        .collect()
}

fn describe_file_change(file: &FileChange) -> String {
    match (file.status, &file.old_path) {
        (FileStatus::Renamed, Some(old_path)) => format!("Rename {old_path} to {}", file.path),
        (FileStatus::Added | FileStatus::Untracked, _) => format!("Add {}", file.path),
        (FileStatus::Deleted, _) => format!("Remove {}", file.path),
        _ => format!("Update {}", file.path),
    }
}

fn describe_files(files: &[FileChange]) -> String {
    match files {
        [] => "Miscellaneous changes".to_string(),
        [file] => describe_file_change(file),
        [first, rest @ ..] => format!(
            "{} and {} other {}",
            describe_file_change(first),
            rest.len(),
            if rest.len() == 1 { "file" } else { "files" }
        ),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
