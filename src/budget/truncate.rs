use crate::constants::{SIMPLE_TRUNCATION_RESERVE, STRUCTURED_TRUNCATION_MIN_LINES};
use regex::Regex;
use std::sync::LazyLock;

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(function|class|const|let|var|export|async)\b").expect("valid regex")
});

const HEAD_PERCENT: usize = 40;
const TAIL_PERCENT: usize = 30;
const MIDDLE_PERCENT: usize = 20;

/// keep the head, the tail and declarations from the middle
pub fn structured(text: &str, budget: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= STRUCTURED_TRUNCATION_MIN_LINES {
        return simple(text, budget);
    }

    // room for the widest marker this text can produce, plus its newline
    let reserved = omitted_marker(lines.len()).len() + 1;
    if reserved > budget {
        return simple(text, budget);
    }
    let body = budget - reserved;

    let head_len = lines_within(lines.iter(), body * HEAD_PERCENT / 100);
    let tail_len = lines_within(lines[head_len..].iter().rev(), body * TAIL_PERCENT / 100);
    let middle = &lines[head_len..lines.len() - tail_len];

    let middle_budget = body * MIDDLE_PERCENT / 100;
    let mut important = Vec::new();
    let mut used = 0;
    for line in middle.iter().filter(|line| DECLARATION.is_match(line)) {
        let cost = line.len() + 1;
        if used + cost > middle_budget {
            break;
        }
        used += cost;
        important.push(*line);
    }
    let omitted = middle.len() - important.len();

    let marker = omitted_marker(omitted);
    let result = lines[..head_len]
        .iter()
        .copied()
        .chain(std::iter::once(marker.as_str()))
        .chain(important)
        .chain(lines[lines.len() - tail_len..].iter().copied())
        .collect::<Vec<_>>()
        .join("\n");

    cap(result, budget)
}

fn omitted_marker(count: usize) -> String {
    format!("... [{count} lines omitted] ...")
}

/// cut near the budget, preferring a line boundary
pub fn simple(text: &str, budget: usize) -> String {
    let cut = floor_char_boundary(text, budget.saturating_sub(SIMPLE_TRUNCATION_RESERVE));
    let mut kept = &text[..cut];
    if let Some(newline) = kept.rfind('\n')
        && newline * 5 >= cut * 4
    {
        kept = &kept[..newline];
    }
    cap(format!("{kept}\n... [truncated]"), budget)
}

/// how many lines fit in `limit` bytes, counting one newline per line
fn lines_within<'a>(lines: impl Iterator<Item = &'a &'a str>, limit: usize) -> usize {
    let mut used = 0;
    lines
        .take_while(|line| {
            used += line.len() + 1;
            used <= limit
        })
        .count()
}

/// hard cut at `budget` bytes, on a char boundary
pub fn cap(mut text: String, budget: usize) -> String {
    if text.len() > budget {
        let end = floor_char_boundary(&text, budget);
        text.truncate(end);
    }
    text
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    (0..=index)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0)
}
