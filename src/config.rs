//! Layered JSON configuration.
//!
//! Files are read in order: the global file under the user's config
//! directory, the repository's `.changelog.json`, then an explicit
//! `--config` file. Each later file overrides the fields it sets; command
//! line flags are applied on top of the merged result by `AppContext`.

use crate::budget::AnalysisMode;
use crate::provider::ProviderKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const REPO_CONFIG_FILE: &str = ".changelog.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub analysis_mode: Option<AnalysisMode>,
    pub max_total_size: Option<usize>,
    pub max_file_count: Option<usize>,
    pub priority_files: Option<Vec<String>>,
    pub enable_filtering: Option<bool>,
    pub enable_pattern_detection: Option<bool>,
    pub high_priority_count: Option<usize>,
    pub output: Option<PathBuf>,
    pub max_commits: Option<usize>,
}

impl Config {
    /// `~/.config/git-auto-changelog/config.json` or the platform equivalent
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.json"))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// merge every config layer that exists; an explicit path must exist
    pub fn load(repo_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let implicit = [Self::global_path(), Some(repo_root.join(REPO_CONFIG_FILE))];
        for path in implicit.into_iter().flatten() {
            if path.is_file() {
                config = config.merge(Self::load_from_file(&path)?);
            }
        }
        if let Some(path) = explicit {
            config = config.merge(Self::load_from_file(path)?);
        }

        Ok(config)
    }

    /// fields set in `other` win
    pub fn merge(self, other: Self) -> Self {
        Self {
            provider: other.provider.or(self.provider),
            model: other.model.or(self.model),
            base_url: other.base_url.or(self.base_url),
            api_key_env: other.api_key_env.or(self.api_key_env),
            analysis_mode: other.analysis_mode.or(self.analysis_mode),
            max_total_size: other.max_total_size.or(self.max_total_size),
            max_file_count: other.max_file_count.or(self.max_file_count),
            priority_files: other.priority_files.or(self.priority_files),
            enable_filtering: other.enable_filtering.or(self.enable_filtering),
            enable_pattern_detection: other
                .enable_pattern_detection
                .or(self.enable_pattern_detection),
            high_priority_count: other.high_priority_count.or(self.high_priority_count),
            output: other.output.or(self.output),
            max_commits: other.max_commits.or(self.max_commits),
        }
    }
}
