//! Diff budgeting for LLM prompts.
//!
//! Takes a batch of per-file diffs and produces a prioritized, size-bounded
//! rendition: the most informative files first, bulk mechanical changes
//! collapsed into one-line placeholders, noise stripped, oversized diffs
//! truncated, and whatever did not fit counted in a trailing summary record.

mod filter;
mod patterns;
mod priority;
mod truncate;

use crate::changeset::{FileChange, FileStatus};
use crate::constants::DEFAULT_HIGH_PRIORITY_COUNT;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub use filter::clean_diff;
pub use patterns::{detect_patterns, is_dependency_manifest};

/// preset budgets, from a quick summary up to a large release
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Standard,
    Detailed,
    Enterprise,
}

impl AnalysisMode {
    /// character budget for all diffs combined
    pub fn max_total_size(self) -> usize {
        match self {
            Self::Standard => 12_000,
            Self::Detailed => 20_000,
            Self::Enterprise => 30_000,
        }
    }

    /// number of files that get individual treatment
    pub fn max_file_count(self) -> usize {
        match self {
            Self::Standard => 15,
            Self::Detailed => 25,
            Self::Enterprise => 40,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BudgetOptions {
    pub analysis_mode: AnalysisMode,
    pub max_total_size: Option<usize>,
    pub max_file_count: Option<usize>,
    pub priority_files: Vec<String>,
    pub enable_filtering: bool,
    pub enable_pattern_detection: bool,
    pub high_priority_count: usize,
}

impl Default for BudgetOptions {
    fn default() -> Self {
        Self {
            analysis_mode: AnalysisMode::Standard,
            max_total_size: None,
            max_file_count: None,
            priority_files: Vec::new(),
            enable_filtering: true,
            enable_pattern_detection: true,
            high_priority_count: DEFAULT_HIGH_PRIORITY_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternKind {
    MassRename,
    Formatting,
    DependencyUpdate,
}

impl PatternKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::MassRename => "mass rename",
            Self::Formatting => "formatting",
            Self::DependencyUpdate => "dependency update",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// a batch-level characteristic spanning several files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPattern {
    pub kind: PatternKind,
    pub count: usize,
    pub description: String,
    pub matching_paths: BTreeSet<String>,
    /// `old → new` pairs for renames
    pub details: Vec<String>,
}

/// one entry of the budgeted output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    pub path: String,
    pub status: Option<FileStatus>, // none for the summary record
    pub diff: String,
    pub is_summary: bool,
    pub compression_applied: bool,
    pub bulk_pattern_label: Option<String>,
    pub original_size: Option<usize>,
    pub compressed_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingResult {
    pub processed_files: Vec<ProcessedFile>,
    pub total_size: usize,
    pub patterns: BTreeMap<PatternKind, BulkPattern>,
    pub files_processed_count: usize,
    pub files_skipped_count: usize,
}

impl ProcessingResult {
    pub fn summary(&self) -> Option<&ProcessedFile> {
        self.processed_files.iter().find(|file| file.is_summary)
    }
}

/// size measure used against the budget
pub fn estimate_size(text: &str) -> usize {
    text.len()
}

/// prioritizes, compresses and bounds a batch of file diffs
#[derive(Debug, Clone)]
pub struct DiffBudgetProcessor {
    max_total_size: usize,
    max_file_count: usize,
    priority_files: Vec<String>,
    enable_filtering: bool,
    enable_pattern_detection: bool,
    high_priority_count: usize,
}

impl DiffBudgetProcessor {
    pub fn new(options: BudgetOptions) -> Self {
        Self {
            max_total_size: options
                .max_total_size
                .unwrap_or_else(|| options.analysis_mode.max_total_size()),
            max_file_count: options
                .max_file_count
                .unwrap_or_else(|| options.analysis_mode.max_file_count()),
            priority_files: options.priority_files,
            enable_filtering: options.enable_filtering,
            enable_pattern_detection: options.enable_pattern_detection,
            high_priority_count: options.high_priority_count,
        }
    }

    pub fn max_total_size(&self) -> usize {
        self.max_total_size
    }

    pub fn max_file_count(&self) -> usize {
        self.max_file_count
    }

    pub fn process(&self, files: &[FileChange]) -> ProcessingResult {
        if files.is_empty() {
            return ProcessingResult::default();
        }

        let ordered = priority::prioritize(files, &self.priority_files);
        let patterns = if self.enable_pattern_detection {
            detect_patterns(files)
        } else {
            BTreeMap::new()
        };

        let candidates = &ordered[..ordered.len().min(self.max_file_count)];
        let mut processed_files = Vec::with_capacity(candidates.len() + 1);
        let mut remaining_budget = self.max_total_size;
        let mut total_size = 0;

        for (index, file) in candidates.iter().enumerate() {
            if remaining_budget == 0 {
                break;
            }
            let file_budget = remaining_budget / (candidates.len() - index);
            let high_priority = index < self.high_priority_count;
            let processed = self.process_file(file, file_budget, high_priority, &patterns);

            let size = estimate_size(&processed.diff);
            total_size += size;
            remaining_budget = remaining_budget.saturating_sub(size);
            processed_files.push(processed);
        }

        let admitted = processed_files.len();
        let skipped = &ordered[admitted..];
        if !skipped.is_empty() {
            processed_files.push(summarize_remaining(skipped));
        }

        ProcessingResult {
            files_processed_count: processed_files.len(),
            files_skipped_count: skipped.len(),
            processed_files,
            total_size,
            patterns,
        }
    }

    fn process_file(
        &self,
        file: &FileChange,
        budget: usize,
        high_priority: bool,
        patterns: &BTreeMap<PatternKind, BulkPattern>,
    ) -> ProcessedFile {
        let original_size = file.diff_len();

        // bulk placeholders override every other treatment
        if let Some(pattern) = patterns
            .values()
            .find(|pattern| pattern.matching_paths.contains(&file.path))
        {
            let diff = truncate::cap(patterns::placeholder(pattern, file), budget);
            return ProcessedFile {
                path: file.path.clone(),
                status: Some(file.status),
                compressed_size: Some(estimate_size(&diff)),
                diff,
                is_summary: false,
                compression_applied: true,
                bulk_pattern_label: Some(pattern.kind.label().to_string()),
                original_size: Some(original_size),
            };
        }

        let Some(raw) = file.diff_text() else {
            return ProcessedFile {
                path: file.path.clone(),
                status: Some(file.status),
                diff: describe_file(file),
                is_summary: false,
                compression_applied: false,
                bulk_pattern_label: None,
                original_size: None,
                compressed_size: None,
            };
        };

        let cleaned = if self.enable_filtering {
            clean_diff(raw)
        } else {
            raw.to_string()
        };
        let diff = if estimate_size(&cleaned) <= budget {
            cleaned
        } else if high_priority {
            truncate::structured(&cleaned, budget)
        } else {
            truncate::simple(&cleaned, budget)
        };

        let compression_applied = diff != raw;
        ProcessedFile {
            path: file.path.clone(),
            status: Some(file.status),
            original_size: compression_applied.then_some(original_size),
            compressed_size: compression_applied.then(|| estimate_size(&diff)),
            diff,
            is_summary: false,
            compression_applied,
            bulk_pattern_label: None,
        }
    }
}

/// one-line description for a change that carries no diff text
pub fn describe_file(file: &FileChange) -> String {
    let kind = match file_type_label(&file.path) {
        Some(label) => format!("{label} file"),
        None => "file".to_string(),
    };
    match (&file.old_path, file.status) {
        (Some(old_path), FileStatus::Renamed) => {
            format!("Renamed {kind}: {old_path} → {}", file.path)
        }
        _ => format!("{} {kind}: {}", file.status.label(), file.path),
    }
}

/// coarse file type derived from the extension
fn file_type_label(path: &str) -> Option<&'static str> {
    let extension = std::path::Path::new(path)
        .extension()?
        .to_string_lossy()
        .to_lowercase();
    let label = match extension.as_str() {
        "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => "JavaScript/TypeScript",
        "json" => "JSON",
        "md" | "markdown" => "Markdown",
        "css" | "scss" | "sass" | "less" => "stylesheet",
        "html" | "htm" => "HTML",
        "yml" | "yaml" => "YAML",
        "toml" => "TOML",
        "rs" => "Rust",
        "py" => "Python",
        "go" => "Go",
        "sh" | "bash" | "zsh" => "shell script",
        "png" | "jpg" | "jpeg" | "gif" | "svg" | "ico" | "webp" => "image",
        _ => return None,
    };
    Some(label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkippedCategory {
    Test,
    Documentation,
    Configuration,
    Build,
    Other,
}

impl SkippedCategory {
    const ALL: [Self; 5] = [
        Self::Test,
        Self::Documentation,
        Self::Configuration,
        Self::Build,
        Self::Other,
    ];

    fn of(path: &str) -> Self {
        let lower = path.to_lowercase();
        if priority::is_test_path(&lower) {
            Self::Test
        } else if priority::is_doc_path(&lower) || lower.ends_with(".txt") {
            Self::Documentation
        } else if priority::is_generated_path(&lower)
            || lower.ends_with("makefile")
            || lower.ends_with("dockerfile")
        {
            Self::Build
        } else if lower.contains("config")
            || [".json", ".yml", ".yaml", ".toml", ".ini", ".env"]
                .iter()
                .any(|ext| lower.ends_with(ext))
        {
            Self::Configuration
        } else {
            Self::Other
        }
    }

    fn noun(self, count: usize) -> String {
        let name = match self {
            Self::Test => "test",
            Self::Documentation => "documentation",
            Self::Configuration => "configuration",
            Self::Build => "build",
            Self::Other => "other",
        };
        let files = if count == 1 { "file" } else { "files" };
        format!("{count} {name} {files}")
    }
}

fn summarize_remaining(skipped: &[&FileChange]) -> ProcessedFile {
    let categories: Vec<SkippedCategory> = skipped
        .iter()
        .map(|file| SkippedCategory::of(&file.path))
        .collect();
    let breakdown: Vec<String> = SkippedCategory::ALL
        .iter()
        .map(|category| (category, categories.iter().filter(|c| *c == category).count()))
        .filter(|(_, count)| *count > 0)
        .map(|(category, count)| category.noun(count))
        .collect();

    let diff = format!(
        "Additional {} files not analyzed in detail: {}",
        skipped.len(),
        breakdown.join(", ")
    );
    ProcessedFile {
        path: format!("({} more files)", skipped.len()),
        status: None,
        diff,
        is_summary: true,
        compression_applied: false,
        bulk_pattern_label: None,
        original_size: None,
        compressed_size: None,
    }
}

#[cfg(test)]
mod tests;
