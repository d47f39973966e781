// changelog
pub const DEFAULT_OUTPUT: &str = "CHANGELOG.md";
pub const DEFAULT_LABEL: &str = "Unreleased";
pub const DEFAULT_MAX_COMMITS: usize = 200;
pub const MAX_FILES_TO_SHOW: usize = 10;

// diff budget
pub const DEFAULT_HIGH_PRIORITY_COUNT: usize = 5;
pub const FORMATTING_LINE_RATIO: f64 = 0.8;
pub const FORMATTING_MIN_FILES: usize = 5;
pub const MASS_RENAME_MIN_FILES: usize = 3;
pub const IMPORT_CHURN_THRESHOLD: usize = 10;
pub const MAX_CONSECUTIVE_BLANK_LINES: usize = 2;
pub const STRUCTURED_TRUNCATION_MIN_LINES: usize = 20;
pub const SIMPLE_TRUNCATION_RESERVE: usize = 50;

// scheduling
pub const BATCH_SIZE: usize = 10;
pub const MAX_CONCURRENT_REQUESTS: usize = 3;
pub const CHUNK_DELAY_MS: u64 = 100;
pub const BATCH_DELAY_MS: u64 = 1000;

// providers
pub const CLAUDE_TIMEOUT_SECS: u64 = 60;
pub const API_TIMEOUT_SECS: u64 = 60;
pub const API_MAX_TOKENS: u32 = 1024;
