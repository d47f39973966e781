//! Noise filtering applied to a diff before it is budgeted.

use super::patterns::is_import_line;
use crate::changeset::is_changed_line;
use crate::constants::{IMPORT_CHURN_THRESHOLD, MAX_CONSECUTIVE_BLANK_LINES};
use regex::Regex;
use std::sync::LazyLock;

static DEBUG_LOGGING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(console\.(log|debug|info)|(logger|log)\.(debug|info))\s*\(")
        .expect("valid regex")
});

/// strip low-signal lines from a diff; running it twice changes nothing
pub fn clean_diff(diff: &str) -> String {
    let lines: Vec<&str> = diff
        .lines()
        .filter(|line| !is_whitespace_only_change(line))
        .collect();
    let lines = collapse_import_churn(lines);
    let lines: Vec<String> = lines
        .into_iter()
        .filter(|line| !is_debug_logging_change(line))
        .collect();

    let mut cleaned = remove_excessive_empty_lines(&lines).join("\n");
    if diff.ends_with('\n') && !cleaned.is_empty() {
        cleaned.push('\n');
    }
    cleaned
}

/// `+` or `-` followed by nothing but whitespace
pub fn is_whitespace_only_change(line: &str) -> bool {
    is_changed_line(line) && line[1..].trim().is_empty()
}

pub fn is_import_change(line: &str) -> bool {
    is_changed_line(line) && is_import_line(&line[1..])
}

pub fn is_debug_logging_change(line: &str) -> bool {
    is_changed_line(line) && DEBUG_LOGGING.is_match(&line[1..])
}

/// replace bulk import churn with a single count line
fn collapse_import_churn(lines: Vec<&str>) -> Vec<String> {
    let import_count = lines.iter().filter(|line| is_import_change(line)).count();
    if import_count <= IMPORT_CHURN_THRESHOLD {
        return lines.into_iter().map(str::to_string).collect();
    }

    let mut result = Vec::with_capacity(lines.len() - import_count + 1);
    let mut summarized = false;
    for line in lines {
        if is_import_change(line) {
            if !summarized {
                result.push(format!("... [{import_count} import/require lines changed]"));
                summarized = true;
            }
        } else {
            result.push(line.to_string());
        }
    }
    result
}

/// remove excessive consecutive empty lines (keep max 2)
pub fn remove_excessive_empty_lines(lines: &[String]) -> Vec<String> {
    let mut result = Vec::with_capacity(lines.len());
    let mut consecutive_empty = 0;

    for line in lines {
        if line.trim().is_empty() {
            consecutive_empty += 1;
            if consecutive_empty <= MAX_CONSECUTIVE_BLANK_LINES {
                result.push(line.clone());
            }
        } else {
            consecutive_empty = 0;
            result.push(line.clone());
        }
    }

    result
}
