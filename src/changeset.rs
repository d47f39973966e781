use anyhow::{Result, bail};
use chrono::{DateTime, FixedOffset};
use std::fmt;

/// how a file changed between two states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
}

impl FileStatus {
    /// parse a porcelain-style status code ('M', 'A', 'D', 'R' or '??')
    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "M" => Ok(Self::Modified),
            "A" => Ok(Self::Added),
            "D" => Ok(Self::Deleted),
            "R" => Ok(Self::Renamed),
            "??" => Ok(Self::Untracked),
            other => bail!("unknown file status code: {other:?}"),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Added => "A",
            Self::Modified => "M",
            Self::Deleted => "D",
            Self::Renamed => "R",
            Self::Untracked => "??",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "Added",
            Self::Modified => "Modified",
            Self::Deleted => "Deleted",
            Self::Renamed => "Renamed",
            Self::Untracked => "Untracked",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// a single file change with its diff text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    pub diff: Option<String>,     // none for binary, lock and minified files
    pub old_path: Option<String>, // set for renames
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: FileStatus, diff: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status,
            diff: Some(diff.into()),
            old_path: None,
        }
    }

    /// diff text, treating an empty diff the same as a missing one
    pub fn diff_text(&self) -> Option<&str> {
        self.diff.as_deref().filter(|diff| !diff.is_empty())
    }

    pub fn diff_len(&self) -> usize {
        self.diff.as_ref().map_or(0, String::len)
    }

    /// iterate over added and removed lines, excluding the `+++`/`---` headers
    pub fn changed_lines(&self) -> impl Iterator<Item = &str> {
        self.diff_text()
            .into_iter()
            .flat_map(str::lines)
            .filter(|line| is_changed_line(line))
    }
}

/// true for `+`/`-` diff lines that are not file headers
pub fn is_changed_line(line: &str) -> bool {
    (line.starts_with('+') && !line.starts_with("+++"))
        || (line.starts_with('-') && !line.starts_with("---"))
}

/// represents a set of working-directory changes (staged or unstaged)
#[derive(Debug)]
pub struct ChangeSet {
    pub files: Vec<FileChange>,
    pub is_staged: bool,
}

impl ChangeSet {
    pub fn source(&self) -> &str {
        if self.is_staged {
            "staged changes"
        } else {
            "unstaged changes"
        }
    }
}

/// a commit read from history, with the files it touched
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub summary: String,
    pub body: String,
    pub author: String,
    pub time: DateTime<FixedOffset>,
    pub files: Vec<FileChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_parse_at_the_boundary() {
        assert_eq!(FileStatus::from_code("M").unwrap(), FileStatus::Modified);
        assert_eq!(FileStatus::from_code(" A ").unwrap(), FileStatus::Added);
        assert_eq!(FileStatus::from_code("??").unwrap(), FileStatus::Untracked);
        assert!(FileStatus::from_code("X").is_err());

        for status in [
            FileStatus::Added,
            FileStatus::Modified,
            FileStatus::Deleted,
            FileStatus::Renamed,
            FileStatus::Untracked,
        ] {
            assert_eq!(FileStatus::from_code(status.code()).unwrap(), status);
        }
    }

    #[test]
    fn empty_diff_counts_as_missing() {
        let file = FileChange::new("a.txt", FileStatus::Modified, "");
        assert!(file.diff_text().is_none());
        assert_eq!(file.changed_lines().count(), 0);
    }

    #[test]
    fn changed_lines_skip_headers() {
        let file = FileChange::new(
            "a.txt",
            FileStatus::Modified,
            "--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-old\n+new\n context",
        );
        let lines: Vec<&str> = file.changed_lines().collect();
        assert_eq!(lines, vec!["-old", "+new"]);
    }
}
