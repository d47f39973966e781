mod budget;
mod changelog;
mod changeset;
mod cli;
mod config;
mod constants;
mod context;
mod git;
mod markdown;
mod prompt;
mod provider;
mod rules;
mod ui;

use crate::budget::DiffBudgetProcessor;
use crate::changelog::{ChangelogEntry, Generator};
use crate::changeset::FileChange;
use crate::cli::Cli;
use crate::config::Config;
use crate::constants::MAX_FILES_TO_SHOW;
use crate::context::AppContext;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    // sanity checks
    let root = git::sanity_check(Path::new("."))?;
    let config = Config::load(&root, cli.config.as_deref())?;
    let mut context = AppContext::resolve(cli, config);
    let interactive = !context.stdout && !context.assume_yes;
    if interactive && !(std::io::stdin().is_terminal() && std::io::stdout().is_terminal()) {
        bail!("interactive terminal required (use --yes or --stdout)");
    }

    // a missing API key should fail before any git work
    let provider = provider::build(&context.provider)?;
    let processor = DiffBudgetProcessor::new(context.budget.clone());
    let generator = Generator::new(provider, processor)
        .with_debug(context.debug_prompt, context.debug_response);

    let today = chrono::Local::now().date_naive();
    let (entries, date) = if context.working {
        (describe_working_changes(&generator, &root, context.stdout)?, today)
    } else {
        describe_commits(&generator, &root, &context)?
    };

    let section = markdown::render_section(&context.label, date, &entries);

    if context.stdout {
        print!("{section}");
        return Ok(());
    }

    let section = if interactive {
        match review(&mut context, date, section)? {
            Some(section) => section,
            None => std::process::exit(1),
        }
    } else {
        section
    };

    let output = output_path(&root, &context.output);
    markdown::write_changelog(&output, &section)?;
    status!("updated {}", output.display());

    Ok(())
}

/// entries for the commit range, dated by its newest commit
fn describe_commits(
    generator: &Generator,
    root: &Path,
    context: &AppContext,
) -> Result<(Vec<ChangelogEntry>, NaiveDate)> {
    if context.range.since_last_tag && context.range.from.is_none() && !context.stdout {
        match git::latest_tag(root, context.range.to.as_deref())? {
            Some(tag) => status!("reading commits since {}", tag),
            None => warning!("no tags found, reading the whole history"),
        }
    }

    let commits = git::get_commits(root, &context.range)?;
    if commits.is_empty() {
        bail!("no commits found in range");
    }

    if !context.stdout {
        let commit_word = if commits.len() == 1 { "commit" } else { "commits" };
        let size: usize = commits.iter().map(|c| total_diff_size(&c.files)).sum();
        status!(
            "analysing {} {} ({} chars of diff) with {}...",
            ui::format_count(commits.len()),
            commit_word,
            ui::format_count(size),
            generator.provider_name()
        );
    }

    let date = commits[0].time.date_naive();
    Ok((generator.analyze_commits(&commits), date))
}

fn describe_working_changes(
    generator: &Generator,
    root: &Path,
    quiet: bool,
) -> Result<Vec<ChangelogEntry>> {
    let Some(changeset) = git::get_working_changes(root)? else {
        bail!("no changes found");
    };

    if !quiet {
        let file_count = changeset.files.len();
        let file_word = if file_count == 1 { "file" } else { "files" };
        status!(
            "analysing {} touching {} {} ({} chars of diff) with {}...",
            changeset.source(),
            ui::format_count(file_count),
            file_word,
            ui::format_count(total_diff_size(&changeset.files)),
            generator.provider_name()
        );
        list_files(&changeset.files);
    }

    Ok(generator.analyze_working_changes(&changeset))
}

fn list_files(files: &[FileChange]) {
    for file in files.iter().take(MAX_FILES_TO_SHOW) {
        match &file.old_path {
            Some(old_path) => info!("{} {} → {}", file.status.code(), old_path, file.path),
            None => info!("{} {}", file.status.code(), file.path),
        }
    }
    if files.len() > MAX_FILES_TO_SHOW {
        info!("(+{} more)", files.len() - MAX_FILES_TO_SHOW);
    }
}

fn total_diff_size(files: &[FileChange]) -> usize {
    files.iter().map(FileChange::diff_len).sum()
}

/// show the section until the user accepts it; `None` aborts
fn review(context: &mut AppContext, date: NaiveDate, mut section: String) -> Result<Option<String>> {
    loop {
        info!();
        info!("{}", section.trim_end());
        info!();

        match ui::prompt(&["YES", "no", "edit", "label"])? {
            Some('y') => return Ok(Some(section)),
            Some('e') => {
                let edited = ui::edit_multi_line(&section)?;
                if edited.trim().is_empty() {
                    warning!("edited section is empty, keeping the previous text");
                } else {
                    section = format!("{edited}\n");
                }
            }
            Some('l') => {
                status!("release label:");
                if let Some(label) = ui::edit_one_line(&context.label)?
                    && !label.is_empty()
                {
                    section = markdown::relabel(&section, &label, date);
                    context.label = label;
                }
            }
            _ => return Ok(None),
        }
    }
}

fn output_path(root: &Path, output: &Path) -> PathBuf {
    if output.is_absolute() {
        output.to_path_buf()
    } else {
        root.join(output)
    }
}
