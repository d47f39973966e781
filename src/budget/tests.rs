use super::*;
use crate::changeset::{FileChange, FileStatus};

fn long_diff(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("+const value{i:03} = compute({i}) + offset;"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn processor() -> DiffBudgetProcessor {
    DiffBudgetProcessor::new(BudgetOptions::default())
}

fn non_summary(result: &ProcessingResult) -> Vec<&ProcessedFile> {
    result
        .processed_files
        .iter()
        .filter(|file| !file.is_summary)
        .collect()
}

#[test]
fn mode_presets() {
    let standard = processor();
    assert_eq!(standard.max_total_size(), 12_000);
    assert_eq!(standard.max_file_count(), 15);

    let enterprise = DiffBudgetProcessor::new(BudgetOptions {
        analysis_mode: AnalysisMode::Enterprise,
        ..BudgetOptions::default()
    });
    assert_eq!(enterprise.max_total_size(), 30_000);
    assert_eq!(enterprise.max_file_count(), 40);

    let overridden = DiffBudgetProcessor::new(BudgetOptions {
        analysis_mode: AnalysisMode::Detailed,
        max_total_size: Some(5_000),
        ..BudgetOptions::default()
    });
    assert_eq!(overridden.max_total_size(), 5_000);
    assert_eq!(overridden.max_file_count(), 25);
}

#[test]
fn empty_input_gives_empty_result() {
    let result = processor().process(&[]);
    assert_eq!(result, ProcessingResult::default());
    assert!(result.processed_files.is_empty());
    assert_eq!(result.total_size, 0);
    assert!(result.patterns.is_empty());
    assert_eq!(result.files_processed_count, 0);
    assert_eq!(result.files_skipped_count, 0);
}

#[test]
fn twenty_files_in_standard_mode_produce_one_summary() {
    let files: Vec<FileChange> = (0..20)
        .map(|i| FileChange::new(format!("src/module{i}.ts"), FileStatus::Modified, long_diff(2)))
        .collect();

    let result = processor().process(&files);
    assert_eq!(result.files_processed_count, 16);
    assert_eq!(result.files_skipped_count, 5);
    assert_eq!(result.processed_files.len(), 16);

    let summaries: Vec<&ProcessedFile> = result
        .processed_files
        .iter()
        .filter(|file| file.is_summary)
        .collect();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0]
        .diff
        .starts_with("Additional 5 files not analyzed in detail: 5 other files"));
    assert_eq!(result.summary(), Some(summaries[0]));
}

#[test]
fn total_size_stays_within_budget() {
    let files: Vec<FileChange> = (0..15)
        .map(|i| FileChange::new(format!("lib/big{i}.js"), FileStatus::Modified, long_diff(150)))
        .collect();

    let result = processor().process(&files);
    let sum: usize = non_summary(&result).iter().map(|f| f.diff.len()).sum();
    assert!(sum <= 12_000, "sum {sum} exceeds budget");
    assert_eq!(sum, result.total_size);
    assert!(result.processed_files.len() <= 16);
}

#[test]
fn earlier_files_get_the_larger_share() {
    let mut files = vec![FileChange::new("src/tiny.ts", FileStatus::Modified, "+x")];
    files.push(FileChange::new("src/huge.ts", FileStatus::Modified, long_diff(400)));

    let processor = DiffBudgetProcessor::new(BudgetOptions {
        max_total_size: Some(2_000),
        ..BudgetOptions::default()
    });
    let result = processor.process(&files);

    // huge sorts first (larger diff) and gets half; tiny uses almost nothing
    let huge = &result.processed_files[0];
    assert_eq!(huge.path, "src/huge.ts");
    assert!(huge.diff.len() <= 1_000);
    assert!(huge.compression_applied);
    assert_eq!(huge.original_size, Some(files[1].diff_len()));
    assert_eq!(huge.compressed_size, Some(huge.diff.len()));
}

#[test]
fn high_priority_file_keeps_structure() {
    let files = vec![FileChange::new("src/service.ts", FileStatus::Modified, long_diff(200))];
    let processor = DiffBudgetProcessor::new(BudgetOptions {
        max_total_size: Some(1_500),
        ..BudgetOptions::default()
    });

    let result = processor.process(&files);
    let file = &result.processed_files[0];
    assert!(file.diff.contains("omitted"));
    assert!(file.diff.len() <= 1_500);
}

#[test]
fn later_files_get_simple_truncation() {
    let files: Vec<FileChange> = (0..3)
        .map(|i| FileChange::new(format!("src/f{i}.ts"), FileStatus::Modified, long_diff(200)))
        .collect();
    let processor = DiffBudgetProcessor::new(BudgetOptions {
        max_total_size: Some(3_000),
        high_priority_count: 1,
        ..BudgetOptions::default()
    });

    let result = processor.process(&files);
    assert!(result.processed_files[0].diff.contains("lines omitted"));
    assert!(result.processed_files[1].diff.ends_with("... [truncated]"));
    assert!(result.processed_files[2].diff.ends_with("... [truncated]"));
}

#[test]
fn missing_diff_gets_a_description() {
    let files = vec![FileChange {
        path: "src/legacy.js".to_string(),
        status: FileStatus::Deleted,
        diff: None,
        old_path: None,
    }];

    let result = processor().process(&files);
    let diff = &result.processed_files[0].diff;
    assert_eq!(diff, "Deleted JavaScript/TypeScript file: src/legacy.js");
    assert!(!result.processed_files[0].compression_applied);
}

#[test]
fn renamed_without_diff_shows_both_paths() {
    let file = FileChange {
        path: "assets/logo.png".to_string(),
        status: FileStatus::Renamed,
        diff: Some(String::new()),
        old_path: Some("img/logo.png".to_string()),
    };
    assert_eq!(
        describe_file(&file),
        "Renamed image file: img/logo.png → assets/logo.png"
    );

    let unknown = FileChange {
        path: "LICENSE".to_string(),
        status: FileStatus::Added,
        diff: None,
        old_path: None,
    };
    assert_eq!(describe_file(&unknown), "Added file: LICENSE");
}

#[test]
fn mass_rename_replaces_diffs_with_placeholders() {
    let files: Vec<FileChange> = ["a", "b", "c"]
        .iter()
        .map(|name| FileChange {
            path: format!("lib/{name}.js"),
            status: FileStatus::Renamed,
            diff: Some("similarity index 100%".to_string()),
            old_path: Some(format!("src/{name}.js")),
        })
        .collect();

    let result = processor().process(&files);
    assert_eq!(result.patterns[&PatternKind::MassRename].count, 3);
    for file in &result.processed_files {
        assert!(file.diff.starts_with("[Bulk mass rename]: 3 files renamed or moved"));
        assert_eq!(file.bulk_pattern_label.as_deref(), Some("mass rename"));
    }
    assert!(result.processed_files[0].diff.contains("src/a.js → lib/a.js"));
}

#[test]
fn pattern_detection_can_be_disabled() {
    let files = vec![FileChange::new(
        "package.json",
        FileStatus::Modified,
        "-  \"left-pad\": \"1.0.0\"\n+  \"left-pad\": \"1.1.0\"",
    )];
    let processor = DiffBudgetProcessor::new(BudgetOptions {
        enable_pattern_detection: false,
        ..BudgetOptions::default()
    });

    let result = processor.process(&files);
    assert!(result.patterns.is_empty());
    assert!(result.processed_files[0].diff.contains("1.1.0"));

    let result = self::processor().process(&files);
    assert!(result.processed_files[0]
        .diff
        .starts_with("[Bulk dependency update]"));
}

#[test]
fn filtering_can_be_disabled() {
    let diff = "+  console.log('state', state);\n+  apply(state);";
    let files = vec![FileChange::new("src/store.js", FileStatus::Modified, diff)];

    let filtered = processor().process(&files);
    assert_eq!(filtered.processed_files[0].diff, "+  apply(state);");
    assert!(filtered.processed_files[0].compression_applied);

    let unfiltered = DiffBudgetProcessor::new(BudgetOptions {
        enable_filtering: false,
        ..BudgetOptions::default()
    })
    .process(&files);
    assert_eq!(unfiltered.processed_files[0].diff, diff);
    assert!(!unfiltered.processed_files[0].compression_applied);
    assert_eq!(unfiltered.processed_files[0].original_size, None);
}

#[test]
fn exhausted_budget_folds_remaining_files_into_summary() {
    let files: Vec<FileChange> = (0..6)
        .map(|i| FileChange {
            path: format!("docs/page{i}.md"),
            status: FileStatus::Modified,
            diff: None,
            old_path: None,
        })
        .collect();
    let processor = DiffBudgetProcessor::new(BudgetOptions {
        max_total_size: Some(60),
        ..BudgetOptions::default()
    });

    let result = processor.process(&files);
    let shown = non_summary(&result);
    assert!(shown.len() < files.len());
    assert_eq!(result.files_skipped_count, files.len() - shown.len());
    assert_eq!(result.files_processed_count, result.processed_files.len());

    let summary = result.summary().expect("summary record");
    assert!(summary.diff.contains(&format!(
        "{} documentation files",
        result.files_skipped_count
    )));
    assert_eq!(summary.status, None);
}

#[test]
fn every_input_path_is_accounted_for() {
    let mut files: Vec<FileChange> = (0..25)
        .map(|i| FileChange::new(format!("src/part{i}.ts"), FileStatus::Modified, long_diff(30)))
        .collect();
    files.push(FileChange::new("tests/part.test.ts", FileStatus::Added, "+it()"));
    files.push(FileChange::new("README.md", FileStatus::Modified, "+docs"));

    let result = processor().process(&files);
    let shown = non_summary(&result);
    for file in &shown {
        assert_eq!(files.iter().filter(|f| f.path == file.path).count(), 1);
    }
    assert_eq!(shown.len() + result.files_skipped_count, files.len());
    assert_eq!(
        result.files_skipped_count,
        files.len().saturating_sub(shown.len())
    );
}

#[test]
fn pinned_priority_files_are_shown_first() {
    let files = vec![
        FileChange::new("src/app.ts", FileStatus::Modified, "+a"),
        FileChange::new("CHANGELOG.md", FileStatus::Added, "+b"),
    ];
    let processor = DiffBudgetProcessor::new(BudgetOptions {
        priority_files: vec!["CHANGELOG.md".to_string()],
        ..BudgetOptions::default()
    });

    let result = processor.process(&files);
    assert_eq!(result.processed_files[0].path, "CHANGELOG.md");
}

#[test]
fn hundreds_of_manifests_stay_within_budget() {
    let files: Vec<FileChange> = (0..400)
        .map(|i| {
            FileChange::new(
                format!("packages/pkg-{i:03}/package.json"),
                FileStatus::Modified,
                "+x",
            )
        })
        .collect();

    let result = processor().process(&files);
    let shown = non_summary(&result);
    let sum: usize = shown.iter().map(|f| f.diff.len()).sum();
    assert!(sum <= 12_000, "sum {sum} exceeds budget");
    assert_eq!(sum, result.total_size);
    assert_eq!(shown.len(), 15);
    assert_eq!(result.files_skipped_count, 385);
    for file in &shown {
        assert_eq!(
            file.diff,
            "[Bulk dependency update]: 400 dependency-related files updated"
        );
    }

    let tight = DiffBudgetProcessor::new(BudgetOptions {
        max_total_size: Some(100),
        ..BudgetOptions::default()
    })
    .process(&files);
    let sum: usize = non_summary(&tight).iter().map(|f| f.diff.len()).sum();
    assert!(sum <= 100, "sum {sum} exceeds budget");
}

#[test]
fn monorepo_sources_are_not_dependency_updates() {
    let files: Vec<FileChange> = (0..400)
        .map(|i| {
            FileChange::new(
                format!("packages/pkg-{i:03}/src/index.ts"),
                FileStatus::Modified,
                "+x",
            )
        })
        .collect();

    let result = processor().process(&files);
    assert!(!result.patterns.contains_key(&PatternKind::DependencyUpdate));
    let shown = non_summary(&result);
    assert_eq!(shown.len(), 15);
    assert!(shown.iter().all(|file| file.diff == "+x"));
}
