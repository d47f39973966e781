use crate::budget::AnalysisMode;
use crate::provider::ProviderKind;
use clap::Parser;
use std::path::PathBuf;

/// git-auto-changelog: summarise git history or working changes into a changelog section
#[derive(Parser, Debug)]
#[command(
    name = "git-auto-changelog",
    about,
    long_about = None,
    disable_version_flag = true
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// describe uncommitted changes instead of commits
    #[arg(long, conflicts_with_all = ["from", "to", "since_last_tag"])]
    pub working: bool,

    /// start of the commit range (exclusive)
    #[arg(long, value_name = "REF", conflicts_with = "since_last_tag")]
    pub from: Option<String>,

    /// end of the commit range (default HEAD)
    #[arg(long, value_name = "REF")]
    pub to: Option<String>,

    /// start from the most recent tag
    #[arg(long)]
    pub since_last_tag: bool,

    /// maximum number of commits to analyse (0 for no limit)
    #[arg(long, value_name = "N")]
    pub max_commits: Option<usize>,

    /// include merge commits
    #[arg(long)]
    pub include_merges: bool,

    /// budget preset
    #[arg(long, value_enum)]
    pub mode: Option<AnalysisMode>,

    /// override the preset's total diff budget
    #[arg(long, value_name = "N")]
    pub max_total_size: Option<usize>,

    /// override the preset's file count
    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,

    /// always show this file first (repeatable)
    #[arg(long = "priority-file", value_name = "PATH")]
    pub priority_files: Vec<String>,

    /// keep whitespace, import and debug logging noise in diffs
    #[arg(long)]
    pub no_filter: bool,

    /// do not collapse renames, formatting and dependency updates
    #[arg(long)]
    pub no_patterns: bool,

    /// where descriptions come from
    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// model name passed to the provider
    #[arg(long)]
    pub model: Option<String>,

    /// API endpoint for HTTP providers
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// changelog file to update (default CHANGELOG.md)
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// release label for the new section
    #[arg(long, short, default_value = crate::constants::DEFAULT_LABEL)]
    pub label: String,

    /// print the section instead of writing the file
    #[arg(long)]
    pub stdout: bool,

    /// write without asking
    #[arg(long, short)]
    pub yes: bool,

    /// extra configuration file, applied after the global and repository ones
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// print prompts sent to the provider
    #[arg(long)]
    pub debug_prompt: bool,

    /// print raw provider responses
    #[arg(long)]
    pub debug_response: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
