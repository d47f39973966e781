use crate::changeset::{ChangeSet, CommitInfo, FileChange, FileStatus};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, TimeZone};
use git2::{
    Delta, DescribeFormatOptions, DescribeOptions, DiffFindOptions, DiffFormat, DiffOptions,
    Repository, RepositoryState, Sort,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// which commits to read
#[derive(Debug, Clone, Default)]
pub struct CommitRange {
    pub from: Option<String>, // exclusive
    pub to: Option<String>,   // inclusive, defaults to HEAD
    pub since_last_tag: bool,
    pub max_commits: usize,
    pub include_merges: bool,
}

/// sanity check that we're in a non-bare git repository in a good state;
/// returns the top of the working tree
pub fn sanity_check(path: &Path) -> Result<PathBuf> {
    let repo = Repository::discover(path).context("not in a git repository")?;

    if repo.state() != RepositoryState::Clean {
        bail!("repository is in the middle of an operation (merge, rebase, etc)");
    }

    match repo.workdir() {
        Some(workdir) => Ok(workdir.to_path_buf()),
        None => bail!("bare repositories are not supported"),
    }
}

/// get working-directory changes
/// checks staged changes first, falls back to unstaged (including untracked files)
/// returns None if no changes found
pub fn get_working_changes(path: &Path) -> Result<Option<ChangeSet>> {
    let repo = Repository::discover(path).context("failed to open git repository")?;

    let staged_diff = create_staged_diff(&repo)?;
    let files = files_from_git_diff(&staged_diff)?;
    if !files.is_empty() {
        return Ok(Some(ChangeSet {
            files,
            is_staged: true,
        }));
    }

    let unstaged_diff = create_unstaged_diff(&repo)?;
    let files = files_from_git_diff(&unstaged_diff)?;
    if files.is_empty() {
        return Ok(None);
    }

    Ok(Some(ChangeSet {
        files,
        is_staged: false,
    }))
}

/// name of the most recent tag reachable from `to` (HEAD when unset)
pub fn latest_tag(path: &Path, to: Option<&str>) -> Result<Option<String>> {
    let repo = Repository::discover(path).context("failed to open git repository")?;
    let tip = match resolve_commit(&repo, to.unwrap_or("HEAD")) {
        Ok(tip) => tip,
        // unborn HEAD has nothing to describe
        Err(_) if to.is_none() => return Ok(None),
        Err(e) => return Err(e),
    };
    latest_tag_from(&tip)
}

fn latest_tag_from(commit: &git2::Commit) -> Result<Option<String>> {
    let mut opts = DescribeOptions::new();
    opts.describe_tags();
    let describe = match commit.as_object().describe(&opts) {
        Ok(describe) => describe,
        // no tags reachable from this commit
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to describe {}", commit.id())),
    };

    let mut format = DescribeFormatOptions::new();
    format.abbreviated_size(0);
    let name = describe
        .format(Some(&format))
        .context("failed to format tag description")?;
    Ok(Some(name))
}

fn resolve_commit<'r>(repo: &'r Repository, rev: &str) -> Result<git2::Commit<'r>> {
    repo.revparse_single(rev)
        .with_context(|| format!("unknown revision: {rev}"))?
        .peel_to_commit()
        .with_context(|| format!("{rev} does not point at a commit"))
}

/// read commits in the range, newest first
pub fn get_commits(path: &Path, range: &CommitRange) -> Result<Vec<CommitInfo>> {
    let repo = Repository::discover(path).context("failed to open git repository")?;

    let mut revwalk = repo.revwalk().context("failed to start revision walk")?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .context("failed to sort revision walk")?;

    let tip = resolve_commit(&repo, range.to.as_deref().unwrap_or("HEAD"))?;
    revwalk.push(tip.id()).context("failed to walk from tip")?;

    // the last tag is looked up from the tip, so `--to` moves it too
    let from = match &range.from {
        Some(from) => Some(from.clone()),
        None if range.since_last_tag => latest_tag_from(&tip)?,
        None => None,
    };
    if let Some(from) = &from {
        let base = resolve_commit(&repo, from)?;
        revwalk.hide(base.id()).context("failed to exclude base")?;
    }

    let mut commits = Vec::new();
    for oid in revwalk {
        if range.max_commits > 0 && commits.len() >= range.max_commits {
            break;
        }
        let oid = oid.context("failed to walk history")?;
        let commit = repo.find_commit(oid).context("failed to read commit")?;
        if commit.parent_count() > 1 && !range.include_merges {
            continue;
        }
        commits.push(commit_info(&repo, &commit)?);
    }

    Ok(commits)
}

fn commit_info(repo: &Repository, commit: &git2::Commit) -> Result<CommitInfo> {
    let tree = commit.tree().context("failed to read commit tree")?;
    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree().context("failed to read parent tree")?),
        Err(_) => None, // root commit
    };

    let mut diff = repo
        .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
        .context("failed to create diff")?;
    detect_renames(&mut diff)?;
    let files = files_from_git_diff(&diff)?;

    let id = commit.id().to_string();
    let message = commit.message().unwrap_or("");
    let (summary, body) = message.split_once('\n').unwrap_or((message, ""));

    Ok(CommitInfo {
        short_id: id.chars().take(7).collect(),
        id,
        summary: summary.trim().to_string(),
        body: body.trim().to_string(),
        author: commit.author().name().unwrap_or("unknown").to_string(),
        time: commit_time(commit.time()),
        files,
    })
}

fn commit_time(time: git2::Time) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    offset
        .timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_default()
}

/// extract file changes with per-file diff text from a `git2::Diff`
fn files_from_git_diff(diff: &git2::Diff) -> Result<Vec<FileChange>> {
    let mut files = Vec::new();

    for delta in diff.deltas() {
        // skip ignored, unmodified, etc.
        let Some(code) = status_code(delta.status()) else {
            continue;
        };
        let status = FileStatus::from_code(code)?;

        let (path, old_path) = match status {
            FileStatus::Renamed => (
                delta.new_file().path(),
                delta
                    .old_file()
                    .path()
                    .map(|p| p.to_string_lossy().to_string()),
            ),
            FileStatus::Deleted => (delta.old_file().path(), None),
            _ => (delta.new_file().path(), None),
        };

        if let Some(path) = path {
            let path = path.to_string_lossy().to_string();
            let is_binary = delta.new_file().is_binary() || delta.old_file().is_binary();
            let diff_ignored = should_ignore_diff(&path) || is_binary;

            files.push(FileChange {
                path,
                status,
                // filled in below
                diff: (!diff_ignored).then(String::new),
                old_path,
            });
        }
    }

    let mut texts = format_diff(diff)?;
    for file in &mut files {
        if let Some(diff) = &mut file.diff {
            *diff = texts.remove(&file.path).unwrap_or_default();
            // binary detection happens while printing
            if diff.contains("Binary files") && !diff.contains("\n@@") {
                file.diff = None;
            }
        }
    }

    Ok(files)
}

/// create a diff object for staged changes
fn create_staged_diff(repo: &Repository) -> Result<git2::Diff<'_>> {
    // handle unborn branch (no commits yet) - compare against empty tree
    let tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree().context("failed to get tree")?),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
        Err(e) => return Err(e).context("failed to get HEAD"),
    };

    let mut diff = repo
        .diff_tree_to_index(tree.as_ref(), None, None)
        .context("failed to create diff")?;
    detect_renames(&mut diff)?;

    Ok(diff)
}

/// create a diff object for unstaged changes
fn create_unstaged_diff(repo: &Repository) -> Result<git2::Diff<'_>> {
    let mut opts = DiffOptions::new();
    opts.include_untracked(true);
    opts.recurse_untracked_dirs(true);
    opts.show_untracked_content(true);
    let mut diff = repo
        .diff_index_to_workdir(None, Some(&mut opts))
        .context("failed to create diff")?;
    detect_renames(&mut diff)?;

    Ok(diff)
}

fn detect_renames(diff: &mut git2::Diff) -> Result<()> {
    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    find_opts.rename_threshold(50); // 50% similarity (git default)
    find_opts.copy_threshold(50);
    diff.find_similar(Some(&mut find_opts))
        .context("failed to detect renames")
}

/// porcelain status code for the delta kinds a changelog cares about
fn status_code(delta: Delta) -> Option<&'static str> {
    match delta {
        Delta::Deleted => Some("D"),
        Delta::Modified | Delta::Typechange => Some("M"),
        Delta::Renamed => Some("R"),
        Delta::Added | Delta::Copied => Some("A"),
        Delta::Untracked => Some("??"),
        _ => None,
    }
}

/// check if file diff should be ignored (lock files, minified files, etc.)
fn should_ignore_diff(path: &str) -> bool {
    let path_lower = path.to_lowercase();

    if path_lower.ends_with("-lock.json") || path_lower.ends_with("-lock.yaml") {
        return true;
    }

    if let Some(ext) = Path::new(path).extension()
        && ext.to_string_lossy().to_lowercase() == "lock"
    {
        return true;
    }

    path_lower.ends_with(".min.js")
        || path_lower.ends_with(".min.css")
        || path_lower.ends_with("-min.js")
        || path_lower.ends_with("-min.css")
}

/// render a diff as unified text, one entry per file path
fn format_diff(diff: &git2::Diff) -> Result<HashMap<String, String>> {
    let mut output: HashMap<String, String> = HashMap::new();

    diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) else {
            return true;
        };
        let path = if delta.status() == Delta::Deleted {
            delta.old_file().path().unwrap_or(path)
        } else {
            path
        };
        let text = output
            .entry(path.to_string_lossy().to_string())
            .or_default();

        let origin = line.origin();
        match origin {
            // diff line types that need the origin character
            '+' | '-' | ' ' => text.push(origin),
            // other origin types (headers, etc.) don't need the character
            _ => {}
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .context("failed to format diff")?;

    for text in output.values_mut() {
        let trimmed = text.trim_end_matches('\n').len();
        text.truncate(trimmed);
    }
    Ok(output)
}
