use anyhow::{Context, Result, bail};
use num_format::{Locale, ToFormattedString};

#[doc(hidden)]
#[macro_export]
macro_rules! __colored_line {
    ($stream:ident, $color:ident, $($arg:tt)*) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::$stream(), "{}", format!($($arg)*).$color());
    }};
}

#[macro_export]
macro_rules! warning {
    ($fmt:literal $($rest:tt)*) => { $crate::__colored_line!(stderr, yellow, $fmt $($rest)*) };
    ($expr:expr) => { $crate::__colored_line!(stderr, yellow, "{}", $expr) };
}

#[macro_export]
macro_rules! error {
    ($fmt:literal $($rest:tt)*) => { $crate::__colored_line!(stderr, red, $fmt $($rest)*) };
    ($expr:expr) => { $crate::__colored_line!(stderr, red, "{}", $expr) };
}

#[macro_export]
macro_rules! status {
    ($fmt:literal $($rest:tt)*) => { $crate::__colored_line!(stdout, green, $fmt $($rest)*) };
    ($expr:expr) => { $crate::__colored_line!(stdout, green, "{}", $expr) };
}

/// prompts and raw responses; stderr so `--stdout` output stays clean
#[macro_export]
macro_rules! debug {
    ($fmt:literal $($rest:tt)*) => { $crate::__colored_line!(stderr, dimmed, $fmt $($rest)*) };
    ($expr:expr) => { $crate::__colored_line!(stderr, dimmed, "{}", $expr) };
}

#[macro_export]
macro_rules! info {
    () => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout());
    }};
    ($fmt:literal $($rest:tt)*) => { $crate::__colored_line!(stdout, normal, $fmt $($rest)*) };
    ($expr:expr) => { $crate::__colored_line!(stdout, normal, "{}", $expr) };
}

/// `1234567` → `1,234,567`
pub fn format_count(count: usize) -> String {
    count.to_formatted_string(&Locale::en)
}

/// "[Y]ES/[n]o" text and the lowercase key for each option
fn option_keys(options: &[&str]) -> (String, Vec<char>) {
    let mut labels = Vec::with_capacity(options.len());
    let mut keys = Vec::with_capacity(options.len());
    for option in options {
        let mut chars = option.chars();
        let Some(first) = chars.next() else { continue };
        labels.push(format!("[{first}]{}", chars.as_str()));
        keys.push(first.to_lowercase().next().unwrap_or(first));
    }
    (labels.join("/"), keys)
}

struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        crossterm::terminal::enable_raw_mode()
            .context("this command requires an interactive terminal")?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

/// single-key choice; enter picks the first option, esc and ctrl-c give `None`
pub fn prompt(options: &[&str]) -> Result<Option<char>> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
    use std::io::{self, Write};

    let options: Vec<&str> = options.iter().copied().filter(|o| !o.is_empty()).collect();
    let (text, keys) = option_keys(&options);
    if keys.is_empty() {
        bail!("prompt requires at least one option");
    }
    print!("{text} ? ");
    let _ = io::stdout().flush();

    let choice = {
        let _raw = RawMode::enable()?;
        loop {
            let Event::Key(key) = event::read().context("failed to read key")? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc => break None,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break None,
                KeyCode::Enter => break Some(0),
                KeyCode::Char(c) => {
                    let lower = c.to_lowercase().next().unwrap_or(c);
                    if let Some(index) = keys.iter().position(|&k| k == lower) {
                        break Some(index);
                    }
                }
                _ => {}
            }
        }
    };

    match choice {
        Some(index) => {
            info!("{}", options[index]);
            Ok(Some(keys[index]))
        }
        None => {
            info!("^C");
            Ok(None)
        }
    }
}

/// inline edit with `initial` pre-filled; `None` when cancelled
pub fn edit_one_line(initial: &str) -> Result<Option<String>> {
    use rustyline::DefaultEditor;
    use rustyline::error::ReadlineError;

    let mut editor = DefaultEditor::new().context("failed to initialise line editor")?;
    match editor.readline_with_initial("? ", (initial, "")) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e).context("failed to read line"),
    }
}

/// edit `text` in `$VISUAL`/`$EDITOR`; an emptied buffer comes back empty
pub fn edit_multi_line(text: &str) -> Result<String> {
    use std::io::Write;
    use std::process::Command;

    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .context("neither VISUAL nor EDITOR is set")?;

    let mut file = tempfile::Builder::new()
        .prefix("changelog-")
        .suffix(".md")
        .tempfile()
        .context("failed to create temporary file")?;
    file.write_all(text.as_bytes())
        .and_then(|()| file.flush())
        .context("failed to write temporary file")?;

    // EDITOR may carry arguments, so run it through the shell
    let path = file.path().to_string_lossy().into_owned();
    let quoted = shlex::try_quote(&path).context("temporary path cannot be quoted")?;
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{editor} {quoted}"))
        .status()
        .with_context(|| format!("failed to run editor: {editor}"))?;
    if !status.success() {
        bail!("editor exited with {status}");
    }

    let edited = std::fs::read_to_string(file.path()).context("failed to read edited file")?;
    Ok(edited.trim_end().to_string())
}
