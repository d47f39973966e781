use super::priority::is_lockfile;
use super::{BulkPattern, PatternKind};
use crate::changeset::{FileChange, FileStatus};
use crate::constants::{FORMATTING_LINE_RATIO, FORMATTING_MIN_FILES, MASS_RENAME_MIN_FILES};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static PUNCTUATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s{}()\[\];,.:<>]*$").expect("valid regex"));
static ESLINT_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(//|/\*)\s*eslint-").expect("valid regex"));
static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(import\s|import\{|export\s.*\sfrom\s|(const|let|var)\s.*=\s*require\()")
        .expect("valid regex")
});

/// detect batch-level patterns over the whole input set
pub fn detect_patterns(files: &[FileChange]) -> BTreeMap<PatternKind, BulkPattern> {
    [
        detect_mass_rename(files),
        detect_formatting(files),
        detect_dependency_updates(files),
    ]
    .into_iter()
    .flatten()
    .map(|pattern| (pattern.kind, pattern))
    .collect()
}

fn detect_mass_rename(files: &[FileChange]) -> Option<BulkPattern> {
    let renamed: Vec<&FileChange> = files
        .iter()
        .filter(|file| file.status == FileStatus::Renamed)
        .collect();
    if renamed.len() < MASS_RENAME_MIN_FILES {
        return None;
    }

    Some(BulkPattern {
        kind: PatternKind::MassRename,
        count: renamed.len(),
        description: format!("{} files renamed or moved", renamed.len()),
        matching_paths: renamed.iter().map(|file| file.path.clone()).collect(),
        details: renamed.iter().map(|file| rename_pair(file)).collect(),
    })
}

fn detect_formatting(files: &[FileChange]) -> Option<BulkPattern> {
    let matching: BTreeSet<String> = files
        .iter()
        .filter(|file| is_likely_formatting(file))
        .map(|file| file.path.clone())
        .collect();
    if matching.len() < FORMATTING_MIN_FILES {
        return None;
    }

    Some(BulkPattern {
        kind: PatternKind::Formatting,
        count: matching.len(),
        description: format!(
            "{} files with whitespace, punctuation or import-order changes only",
            matching.len()
        ),
        matching_paths: matching,
        details: Vec::new(),
    })
}

fn detect_dependency_updates(files: &[FileChange]) -> Option<BulkPattern> {
    let matching: BTreeSet<String> = files
        .iter()
        .filter(|file| is_dependency_manifest(&file.path))
        .map(|file| file.path.clone())
        .collect();
    if matching.is_empty() {
        return None;
    }

    let count = matching.len();
    let noun = if count == 1 { "file" } else { "files" };
    Some(BulkPattern {
        kind: PatternKind::DependencyUpdate,
        count,
        description: format!("{count} dependency-related {noun} updated"),
        matching_paths: matching,
        details: Vec::new(),
    })
}

const MANIFEST_NAMES: &[&str] = &[
    "package.json",
    "npm-shrinkwrap.json",
    "cargo.toml",
    "go.mod",
    "go.sum",
    "gemfile",
    "composer.json",
    "requirements.txt",
    "pyproject.toml",
    "pipfile",
];

/// package manifests and lockfiles, matched on the file name only
pub fn is_dependency_manifest(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    MANIFEST_NAMES.contains(&name.as_str())
        || is_lockfile(&name)
}

/// more than 80% of the changed lines carry no semantic content
pub fn is_likely_formatting(file: &FileChange) -> bool {
    let (total, trivial) = file
        .changed_lines()
        .map(|line| &line[1..])
        .fold((0usize, 0usize), |(total, trivial), content| {
            (total + 1, trivial + usize::from(is_formatting_line(content)))
        });
    total > 0 && trivial as f64 / total as f64 > FORMATTING_LINE_RATIO
}

/// expects line content without the leading `+`/`-`
pub fn is_formatting_line(content: &str) -> bool {
    content.trim().is_empty()
        || PUNCTUATION_LINE.is_match(content)
        || ESLINT_COMMENT.is_match(content)
        || is_import_line(content)
}

pub fn is_import_line(content: &str) -> bool {
    IMPORT_LINE.is_match(content)
}

/// the one-line replacement shown instead of a matching file's diff
pub fn placeholder(pattern: &BulkPattern, file: &FileChange) -> String {
    match pattern.kind {
        PatternKind::MassRename => format!(
            "[Bulk {}]: {} ({})",
            pattern.kind,
            pattern.description,
            rename_pair(file)
        ),
        _ => format!("[Bulk {}]: {}", pattern.kind, pattern.description),
    }
}

fn rename_pair(file: &FileChange) -> String {
    match &file.old_path {
        Some(old_path) => format!("{old_path} → {}", file.path),
        None => file.path.clone(),
    }
}
