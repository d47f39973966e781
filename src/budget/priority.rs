use crate::changeset::{FileChange, FileStatus};
use std::cmp::{Ordering, Reverse};

const SOURCE_EXTENSIONS: &[&str] = &[".js", ".ts", ".jsx", ".tsx", ".mjs", ".cjs"];
const LOCKFILE_SUFFIXES: &[&str] = &[".lock", "-lock.json", "-lock.yaml", "-lock.yml"];

/// order files most informative first (stable)
pub fn prioritize<'a>(files: &'a [FileChange], pinned: &[String]) -> Vec<&'a FileChange> {
    let mut ordered: Vec<&FileChange> = files.iter().collect();
    ordered.sort_by(|a, b| compare(a, b, pinned));
    ordered
}

fn compare(a: &FileChange, b: &FileChange, pinned: &[String]) -> Ordering {
    Reverse(is_pinned(&a.path, pinned))
        .cmp(&Reverse(is_pinned(&b.path, pinned)))
        .then_with(|| status_rank(a.status).cmp(&status_rank(b.status)))
        .then_with(|| importance(&b.path).cmp(&importance(&a.path)))
        .then_with(|| b.diff_len().cmp(&a.diff_len()))
}

fn is_pinned(path: &str, pinned: &[String]) -> bool {
    pinned
        .iter()
        .any(|p| path == p || path.ends_with(&format!("/{p}")))
}

pub fn status_rank(status: FileStatus) -> u8 {
    match status {
        FileStatus::Modified => 0,
        FileStatus::Renamed => 1,
        FileStatus::Added => 2,
        FileStatus::Deleted => 3,
        FileStatus::Untracked => 4,
    }
}

/// path-based importance; higher sorts first
pub fn importance(path: &str) -> i32 {
    let probe = format!("/{}", path.to_lowercase());
    let mut score = 0;

    if probe.contains("/src/") && SOURCE_EXTENSIONS.iter().any(|ext| probe.ends_with(ext)) {
        score += 100;
    }
    if probe.contains("/api/") || probe.contains("/routes/") {
        score += 60;
    }
    if probe.contains("/domains/") || probe.contains("/services/") {
        score += 50;
    }
    if probe.contains("/components/") {
        score += 40;
    }
    if probe.contains("/utils/") || probe.contains("/shared/") {
        score += 30;
    }
    if probe.ends_with("/package.json") || probe.contains("config") {
        score += 20;
    }
    if is_test_path(&probe) {
        score -= 20;
    }
    if is_doc_path(&probe) {
        score -= 30;
    }
    if is_generated_path(&probe) {
        score -= 100;
    }
    score
}

/// expects a lowercased path
pub fn is_test_path(path: &str) -> bool {
    let probe = slash_prefixed(path);
    probe.contains("/test/")
        || probe.contains("/tests/")
        || probe.contains(".test.")
        || probe.contains(".spec.")
}

/// expects a lowercased path
pub fn is_doc_path(path: &str) -> bool {
    path.ends_with(".md") || slash_prefixed(path).contains("/docs/")
}

/// expects a lowercased path
pub fn is_generated_path(path: &str) -> bool {
    let probe = slash_prefixed(path);
    probe.contains("/node_modules/")
        || probe.contains("/dist/")
        || probe.contains("/build/")
        || is_lockfile(&probe)
}

pub fn is_lockfile(path: &str) -> bool {
    LOCKFILE_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

fn slash_prefixed(path: &str) -> std::borrow::Cow<'_, str> {
    if path.starts_with('/') {
        path.into()
    } else {
        format!("/{path}").into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_files_outrank_docs_and_vendor() {
        assert_eq!(importance("src/index.ts"), 100);
        assert_eq!(importance("src/api/users.js"), 160);
        assert_eq!(importance("README.md"), -30);
        assert_eq!(importance("node_modules/left-pad/index.js"), -100);
        assert_eq!(importance("yarn.lock"), -100);
        assert!(importance("src/user.test.ts") < importance("src/user.ts"));
    }

    #[test]
    fn config_and_manifest_get_a_small_boost() {
        assert_eq!(importance("package.json"), 20);
        assert_eq!(importance("tsconfig.json"), 20);
    }

    #[test]
    fn status_dominates_path_score() {
        let files = vec![
            FileChange::new("docs/guide.md", FileStatus::Modified, "-a\n+b"),
            FileChange::new("src/api/core.ts", FileStatus::Deleted, "-x"),
            FileChange::new("src/app.ts", FileStatus::Added, "+y"),
        ];
        let ordered: Vec<&str> = prioritize(&files, &[])
            .iter()
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(ordered, vec!["docs/guide.md", "src/app.ts", "src/api/core.ts"]);
    }

    #[test]
    fn larger_diff_breaks_ties() {
        let files = vec![
            FileChange::new("lib/a.rs", FileStatus::Modified, "+1"),
            FileChange::new("lib/b.rs", FileStatus::Modified, "+1\n+2\n+3"),
        ];
        let ordered = prioritize(&files, &[]);
        assert_eq!(ordered[0].path, "lib/b.rs");
    }

    #[test]
    fn equal_files_keep_input_order() {
        let files = vec![
            FileChange::new("x/one.rs", FileStatus::Modified, "+a"),
            FileChange::new("x/two.rs", FileStatus::Modified, "+b"),
            FileChange::new("x/three.rs", FileStatus::Modified, "+c"),
        ];
        let ordered: Vec<&str> = prioritize(&files, &[])
            .iter()
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(ordered, vec!["x/one.rs", "x/two.rs", "x/three.rs"]);
    }

    #[test]
    fn pinned_files_come_first() {
        let files = vec![
            FileChange::new("src/app.ts", FileStatus::Modified, "+a"),
            FileChange::new("docs/CHANGES.md", FileStatus::Deleted, "-b"),
        ];
        let pinned = vec!["CHANGES.md".to_string()];
        let ordered = prioritize(&files, &pinned);
        assert_eq!(ordered[0].path, "docs/CHANGES.md");
    }
}
