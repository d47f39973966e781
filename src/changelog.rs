use crate::budget::{DiffBudgetProcessor, ProcessingResult};
use crate::changeset::{ChangeSet, CommitInfo};
use crate::constants::{BATCH_DELAY_MS, BATCH_SIZE, CHUNK_DELAY_MS, MAX_CONCURRENT_REQUESTS};
use crate::provider::Provider;
use crate::{debug, prompt, rules, ui, warning};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::thread;
use std::time::Duration;

/// changelog sections, most notable first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeCategory {
    Breaking,
    Feature,
    Fix,
    Performance,
    Refactor,
    Documentation,
    Test,
    Build,
    Chore,
}

impl ChangeCategory {
    pub const ALL: [Self; 9] = [
        Self::Breaking,
        Self::Feature,
        Self::Fix,
        Self::Performance,
        Self::Refactor,
        Self::Documentation,
        Self::Test,
        Self::Build,
        Self::Chore,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Breaking => "Breaking Changes",
            Self::Feature => "Features",
            Self::Fix => "Bug Fixes",
            Self::Performance => "Performance",
            Self::Refactor => "Refactoring",
            Self::Documentation => "Documentation",
            Self::Test => "Tests",
            Self::Build => "Build & Dependencies",
            Self::Chore => "Maintenance",
        }
    }

    /// short label used in prompts and AI responses
    pub fn label(self) -> &'static str {
        match self {
            Self::Breaking => "breaking",
            Self::Feature => "feature",
            Self::Fix => "fix",
            Self::Performance => "perf",
            Self::Refactor => "refactor",
            Self::Documentation => "docs",
            Self::Test => "test",
            Self::Build => "build",
            Self::Chore => "chore",
        }
    }

    /// lenient parse of a label, a title or a conventional type
    pub fn from_label(label: &str) -> Option<Self> {
        let category = match label.trim().to_lowercase().as_str() {
            "breaking" | "breaking change" | "breaking changes" => Self::Breaking,
            "feature" | "features" | "feat" | "added" => Self::Feature,
            "fix" | "fixes" | "bug fix" | "bug fixes" | "fixed" => Self::Fix,
            "perf" | "performance" => Self::Performance,
            "refactor" | "refactoring" | "changed" => Self::Refactor,
            "docs" | "doc" | "documentation" => Self::Documentation,
            "test" | "tests" => Self::Test,
            "build" | "ci" | "deps" | "dependencies" | "build & dependencies" => Self::Build,
            "chore" | "maintenance" | "misc" | "other" | "style" => Self::Chore,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub category: ChangeCategory,
    pub scope: Option<String>,
    pub description: String,
    pub commit: Option<String>, // short id
}

/// turns commits or working changes into changelog entries
pub struct Generator {
    provider: Option<Box<dyn Provider>>,
    processor: DiffBudgetProcessor,
    debug_prompt: bool,
    debug_response: bool,
    chunk_delay: Duration,
    batch_delay: Duration,
}

impl Generator {
    pub fn new(provider: Option<Box<dyn Provider>>, processor: DiffBudgetProcessor) -> Self {
        Self {
            provider,
            processor,
            debug_prompt: false,
            debug_response: false,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
            batch_delay: Duration::from_millis(BATCH_DELAY_MS),
        }
    }

    pub fn with_debug(mut self, debug_prompt: bool, debug_response: bool) -> Self {
        self.debug_prompt = debug_prompt;
        self.debug_response = debug_response;
        self
    }

    #[cfg(test)]
    fn without_pacing(mut self) -> Self {
        self.chunk_delay = Duration::ZERO;
        self.batch_delay = Duration::ZERO;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider
            .as_deref()
            .map_or("rules", |provider| provider.name())
    }

    /// analyse commits in batches, with a bounded number of calls in flight
    pub fn analyze_commits(&self, commits: &[CommitInfo]) -> Vec<ChangelogEntry> {
        let Some(provider) = self.provider.as_deref() else {
            return commits.iter().flat_map(rules::analyze_commit).collect();
        };

        let progress = ProgressBar::new(commits.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner} [{bar:30}] {pos}/{len} commits")
                .expect("invalid progress template")
                .progress_chars("=> "),
        );

        let mut entries = Vec::new();
        for (batch_index, batch) in commits.chunks(BATCH_SIZE).enumerate() {
            if batch_index > 0 {
                thread::sleep(self.batch_delay);
            }
            for (chunk_index, chunk) in batch.chunks(MAX_CONCURRENT_REQUESTS).enumerate() {
                if chunk_index > 0 {
                    thread::sleep(self.chunk_delay);
                }
                let results: Vec<Option<Vec<ChangelogEntry>>> = thread::scope(|scope| {
                    let handles: Vec<_> = chunk
                        .iter()
                        .map(|commit| {
                            scope.spawn(move || self.analyze_commit_with(provider, commit))
                        })
                        .collect();
                    handles.into_iter().map(|handle| handle.join().ok()).collect()
                });
                progress.inc(chunk.len() as u64);
                entries.extend(results.into_iter().flatten().flatten());
            }
        }

        progress.finish_and_clear();
        entries
    }

    fn analyze_commit_with(
        &self,
        provider: &dyn Provider,
        commit: &CommitInfo,
    ) -> Vec<ChangelogEntry> {
        let result = self.processor.process(&commit.files);
        self.trace_budget(&commit.id, &result);
        let prompt = prompt::build_commit_prompt(commit, &result);

        match self.ask(provider, &prompt, Some(&commit.short_id)) {
            Ok(entries) => entries,
            Err(e) => {
                warning!(
                    "{} failed for {} ({:#}), using rule-based analysis",
                    provider.name(),
                    commit.short_id,
                    e
                );
                rules::analyze_commit(commit)
            }
        }
    }

    /// analyse the working directory with a single provider call
    pub fn analyze_working_changes(&self, changeset: &ChangeSet) -> Vec<ChangelogEntry> {
        let Some(provider) = self.provider.as_deref() else {
            return rules::analyze_working_changes(changeset);
        };

        let result = self.processor.process(&changeset.files);
        self.trace_budget(changeset.source(), &result);
        let prompt = prompt::build_working_prompt(&result);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner}")
                .expect("invalid spinner template"),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        let response = self.ask(provider, &prompt, None);
        spinner.finish_and_clear();

        match response {
            Ok(entries) => entries,
            Err(e) => {
                warning!("{} failed ({:#}), using rule-based analysis", provider.name(), e);
                rules::analyze_working_changes(changeset)
            }
        }
    }

    fn trace_budget(&self, subject: &str, result: &ProcessingResult) {
        if !self.debug_prompt {
            return;
        }
        debug!(
            "{}: {} entries ({} file slots), {} files skipped, {} of {} chars used",
            subject,
            result.files_processed_count,
            self.processor.max_file_count(),
            result.files_skipped_count,
            ui::format_count(result.total_size),
            ui::format_count(self.processor.max_total_size())
        );
        for pattern in result.patterns.values() {
            debug!("{} across {} files", pattern.kind, pattern.count);
        }
        if let Some(summary) = result.summary() {
            debug!("{}", summary.diff);
        }
    }

    fn ask(
        &self,
        provider: &dyn Provider,
        prompt: &str,
        commit: Option<&str>,
    ) -> Result<Vec<ChangelogEntry>> {
        if self.debug_prompt {
            debug!("{}", prompt);
        }
        let response = provider.complete(prompt)?;
        if self.debug_response {
            debug!("{}", response);
        }
        prompt::parse_entries(&response, commit)
    }
}

/// entries grouped by category in section order, duplicates removed
pub fn group_entries(entries: &[ChangelogEntry]) -> Vec<(ChangeCategory, Vec<&ChangelogEntry>)> {
    ChangeCategory::ALL
        .iter()
        .map(|&category| {
            let mut seen = std::collections::HashSet::new();
            let items: Vec<&ChangelogEntry> = entries
                .iter()
                .filter(|entry| entry.category == category)
                .filter(|entry| seen.insert(entry.description.to_lowercase()))
                .collect();
            (category, items)
        })
        .filter(|(_, items)| !items.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetOptions;
    use crate::changeset::{FileChange, FileStatus};
    use anyhow::bail;
    use chrono::DateTime;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// echoes the commit summary found in the prompt as a feature
    struct EchoProvider {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.prompts.lock().unwrap().push(prompt.to_string());

            let summary = prompt
                .lines()
                .find_map(|line| line.strip_prefix("Commit message: "))
                .unwrap_or("unknown")
                .to_string();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("- feature: {summary}"))
        }
    }

    // lets a test keep a handle on the provider it hands to the generator
    impl Provider for Arc<EchoProvider> {
        fn name(&self) -> &str {
            <EchoProvider as Provider>::name(self)
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            <EchoProvider as Provider>::complete(self, prompt)
        }
    }

    struct FailingProvider;

    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            bail!("service unavailable")
        }
    }

    fn commit(index: usize, summary: &str) -> CommitInfo {
        CommitInfo {
            id: format!("{index:07}abcdef"),
            short_id: format!("{index:07}"),
            summary: summary.to_string(),
            body: String::new(),
            author: "Test User".to_string(),
            time: DateTime::parse_from_rfc3339("2026-03-04T05:06:07+00:00").unwrap(),
            files: vec![FileChange::new(
                "src/lib.rs",
                FileStatus::Modified,
                "-old\n+new",
            )],
        }
    }

    fn processor() -> DiffBudgetProcessor {
        DiffBudgetProcessor::new(BudgetOptions::default())
    }

    #[test]
    fn batches_keep_commit_order_and_bound_concurrency() {
        let provider = Arc::new(EchoProvider::new());
        let commits: Vec<CommitInfo> = (0..12)
            .map(|i| commit(i, &format!("change number {i}")))
            .collect();
        let generator = Generator::new(Some(Box::new(Arc::clone(&provider))), processor())
            .without_pacing();

        let entries = generator.analyze_commits(&commits);
        assert_eq!(entries.len(), 12);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.description, format!("change number {i}"));
            assert_eq!(entry.commit.as_deref(), Some(format!("{i:07}").as_str()));
        }

        let max_in_flight = provider.max_in_flight.load(Ordering::SeqCst);
        assert!(max_in_flight <= MAX_CONCURRENT_REQUESTS, "{max_in_flight} in flight");
        assert!(max_in_flight > 1, "chunks ran one at a time");
        assert_eq!(provider.prompts.lock().unwrap().len(), 12);
    }

    #[test]
    fn partial_chunks_stay_within_the_limit() {
        let provider = Arc::new(EchoProvider::new());
        let commits: Vec<CommitInfo> = (0..7).map(|i| commit(i, "feat: thing")).collect();
        let generator = Generator::new(Some(Box::new(Arc::clone(&provider))), processor())
            .without_pacing();

        let entries = generator.analyze_commits(&commits);
        assert_eq!(entries.len(), 7);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= MAX_CONCURRENT_REQUESTS);
        assert_eq!(provider.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(provider.prompts.lock().unwrap().len(), 7);
    }

    #[test]
    fn provider_failure_falls_back_to_rules() {
        let commits = vec![commit(1, "fix(parser): handle empty input")];
        let generator = Generator::new(Some(Box::new(FailingProvider)), processor())
            .without_pacing();

        let entries = generator.analyze_commits(&commits);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, ChangeCategory::Fix);
        assert_eq!(entries[0].description, "Handle empty input");
        assert_eq!(entries[0].scope.as_deref(), Some("parser"));
    }

    #[test]
    fn no_provider_uses_rules() {
        let generator = Generator::new(None, processor());
        assert_eq!(generator.provider_name(), "rules");

        let changeset = ChangeSet {
            files: vec![FileChange::new("README.md", FileStatus::Modified, "+docs")],
            is_staged: false,
        };
        let entries = generator.analyze_working_changes(&changeset);
        assert_eq!(entries[0].category, ChangeCategory::Documentation);
    }

    #[test]
    fn grouping_orders_sections_and_drops_duplicates() {
        let entry = |category, description: &str| ChangelogEntry {
            category,
            scope: None,
            description: description.to_string(),
            commit: None,
        };
        let entries = vec![
            entry(ChangeCategory::Fix, "Fix crash"),
            entry(ChangeCategory::Feature, "Add export"),
            entry(ChangeCategory::Fix, "fix crash"),
            entry(ChangeCategory::Breaking, "Drop v1"),
        ];

        let grouped = group_entries(&entries);
        let categories: Vec<ChangeCategory> = grouped.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            categories,
            vec![
                ChangeCategory::Breaking,
                ChangeCategory::Feature,
                ChangeCategory::Fix
            ]
        );
        assert_eq!(grouped[2].1.len(), 1);
    }

    #[test]
    fn labels_parse_back() {
        for category in ChangeCategory::ALL {
            assert_eq!(ChangeCategory::from_label(category.label()), Some(category));
            assert_eq!(ChangeCategory::from_label(category.title()), Some(category));
        }
        assert_eq!(ChangeCategory::from_label("nonsense"), None);
    }
}
