use crate::budget::{AnalysisMode, BudgetOptions};
use crate::cli::Cli;
use crate::config::Config;
use crate::constants::{DEFAULT_HIGH_PRIORITY_COUNT, DEFAULT_MAX_COMMITS, DEFAULT_OUTPUT};
use crate::git::CommitRange;
use crate::provider::{ProviderKind, ProviderSettings};
use std::path::PathBuf;

/// settings for one run, resolved from config files and flags
#[allow(clippy::struct_excessive_bools)]
pub struct AppContext {
    /// analyse uncommitted changes rather than history
    pub working: bool,
    pub range: CommitRange,
    pub budget: BudgetOptions,
    pub provider: ProviderSettings,

    /// changelog file to merge into
    pub output: PathBuf,

    /// release label, editable from the prompt
    pub label: String,

    // output behaviour
    pub stdout: bool,
    pub assume_yes: bool,

    // debugging
    pub debug_prompt: bool,
    pub debug_response: bool,
}

impl AppContext {
    /// flags win over config, config wins over built-in defaults
    pub fn resolve(cli: Cli, config: Config) -> Self {
        let priority_files = if cli.priority_files.is_empty() {
            config.priority_files.unwrap_or_default()
        } else {
            cli.priority_files
        };

        let budget = BudgetOptions {
            analysis_mode: cli
                .mode
                .or(config.analysis_mode)
                .unwrap_or(AnalysisMode::Standard),
            max_total_size: cli.max_total_size.or(config.max_total_size),
            max_file_count: cli.max_files.or(config.max_file_count),
            priority_files,
            enable_filtering: !cli.no_filter && config.enable_filtering.unwrap_or(true),
            enable_pattern_detection: !cli.no_patterns
                && config.enable_pattern_detection.unwrap_or(true),
            high_priority_count: config
                .high_priority_count
                .unwrap_or(DEFAULT_HIGH_PRIORITY_COUNT),
        };

        let provider = ProviderSettings {
            kind: cli
                .provider
                .or(config.provider)
                .unwrap_or(ProviderKind::ClaudeCli),
            model: cli.model.or(config.model),
            base_url: cli.base_url.or(config.base_url),
            api_key_env: config.api_key_env,
        };

        let range = CommitRange {
            from: cli.from,
            to: cli.to,
            since_last_tag: cli.since_last_tag,
            max_commits: cli
                .max_commits
                .or(config.max_commits)
                .unwrap_or(DEFAULT_MAX_COMMITS),
            include_merges: cli.include_merges,
        };

        Self {
            working: cli.working,
            range,
            budget,
            provider,
            output: cli
                .output
                .or(config.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            label: cli.label,
            stdout: cli.stdout,
            assume_yes: cli.yes,
            debug_prompt: cli.debug_prompt,
            debug_response: cli.debug_response,
        }
    }
}
