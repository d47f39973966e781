use crate::changelog::{ChangelogEntry, group_entries};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const CHANGELOG_HEADER: &str = "# Changelog";

/// one release section in keep-a-changelog style
pub fn render_section(label: &str, date: NaiveDate, entries: &[ChangelogEntry]) -> String {
    let mut output = format!("## [{label}] - {}\n", date.format("%Y-%m-%d"));

    let grouped = group_entries(entries);
    if grouped.is_empty() {
        output.push_str("\n_No notable changes._\n");
        return output;
    }

    for (category, items) in grouped {
        let _ = writeln!(output, "\n### {category}\n");
        for entry in items {
            let _ = writeln!(output, "{}", render_entry(entry));
        }
    }
    output
}

/// swap the release heading of an already rendered, possibly edited, section
pub fn relabel(section: &str, label: &str, date: NaiveDate) -> String {
    let heading = format!("## [{label}] - {}", date.format("%Y-%m-%d"));
    match section.split_once('\n') {
        Some((first, rest)) if first.starts_with("## ") => format!("{heading}\n{rest}"),
        None if section.starts_with("## ") => format!("{heading}\n"),
        _ => format!("{heading}\n\n{section}"),
    }
}

fn render_entry(entry: &ChangelogEntry) -> String {
    let mut line = String::from("- ");
    if let Some(scope) = &entry.scope {
        let _ = write!(line, "**{scope}:** ");
    }
    line.push_str(&entry.description);
    if let Some(commit) = &entry.commit {
        let _ = write!(line, " ({commit})");
    }
    line
}

/// insert `section` above the newest release, keeping the header and preamble
pub fn merge_into_existing(existing: &str, section: &str) -> String {
    let section = section.trim_end();
    if existing.trim().is_empty() {
        return format!("{CHANGELOG_HEADER}\n\n{section}\n");
    }

    let mut offset = 0;
    let mut has_header = false;
    let mut first_release = None;
    for line in existing.split_inclusive('\n') {
        if line.starts_with("## ") {
            first_release = Some(offset);
            break;
        }
        if line.starts_with("# ") {
            has_header = true;
        }
        offset += line.len();
    }

    match (has_header, first_release) {
        (false, _) => format!(
            "{CHANGELOG_HEADER}\n\n{section}\n\n{}",
            existing.trim_start()
        ),
        (true, Some(at)) => format!(
            "{}\n\n{section}\n\n{}",
            existing[..at].trim_end(),
            &existing[at..]
        ),
        (true, None) => format!("{}\n\n{section}\n", existing.trim_end()),
    }
}

/// merge `section` into the changelog at `path`, creating it if needed
pub fn write_changelog(path: &Path, section: &str) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    } else {
        String::new()
    };
    fs::write(path, merge_into_existing(&existing, section))
        .with_context(|| format!("failed to write {}", path.display()))
}
