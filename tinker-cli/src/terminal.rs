//! Terminal presentation
//!
//! The output view prints each entry as it is appended, colored by level.
//! Compile errors also get a source excerpt with a caret under the column.

use owo_colors::OwoColorize;
use std::io::{self, Write};
use tinker_api::{ErrorReport, UncaughtError};
use tinker_output::{LogEntry, OutputLevel, OutputView};

/// Prints sink entries to stdout as they arrive
pub struct TerminalView {
    timestamp_format: String,
    color: bool,
}

impl TerminalView {
    pub fn new(timestamp_format: &str, color: bool) -> Self {
        Self {
            timestamp_format: timestamp_format.to_string(),
            color,
        }
    }

    pub fn format_entry(&self, entry: &LogEntry) -> String {
        let stamp = format!("[{}]", entry.timestamp_text(&self.timestamp_format));
        if !self.color {
            return format!("{} {}", stamp, entry.rendered_text());
        }
        let text = entry.rendered_text();
        let body = match entry.level() {
            OutputLevel::Log => text.to_string(),
            OutputLevel::Info => text.cyan().to_string(),
            OutputLevel::Warn => text.yellow().to_string(),
            OutputLevel::Error => text.red().bold().to_string(),
            OutputLevel::Result => text.green().to_string(),
        };
        format!("{} {}", stamp.dimmed(), body)
    }
}

impl OutputView for TerminalView {
    fn entry_appended(&self, entry: &LogEntry, _index: usize) {
        let mut out = io::stdout().lock();
        // a closed stdout only loses output
        let _ = writeln!(out, "{}", self.format_entry(entry));
    }

    fn cleared(&self) {
        if self.color {
            print!("\x1b[2J\x1b[H");
            let _ = io::stdout().flush();
        }
    }

    fn scroll_to(&self, _index: usize) {
        // the terminal follows the newest line on its own
    }
}

/// Report an uncaught deferred error on stderr
pub fn print_uncaught(err: &UncaughtError, color: bool) {
    if color {
        eprintln!("{}", err.to_string().red());
    } else {
        eprintln!("{}", err);
    }
}

/// Print a structured error, with source context when it has a location
pub fn print_report(report: &ErrorReport, source: &str) {
    eprintln!("{}", report);
    if let (Some(line), Some(column)) = (report.line, report.column) {
        for excerpt in source_context(source, line, column) {
            eprintln!("{}", excerpt);
        }
    }
}

/// Lines around `error_line` with a caret under `error_col`
pub fn source_context(source: &str, error_line: usize, error_col: usize) -> Vec<String> {
    const CONTEXT_LINES: usize = 2;

    let lines: Vec<&str> = source.lines().collect();
    if error_line == 0 || error_line > lines.len() {
        return Vec::new();
    }
    let start = error_line.saturating_sub(CONTEXT_LINES).max(1);
    let end = (error_line + CONTEXT_LINES).min(lines.len());
    let width = end.to_string().len();

    let mut out = Vec::new();
    for number in start..=end {
        out.push(format!("{:>width$} | {}", number, lines[number - 1], width = width));
        if number == error_line {
            out.push(format!("{:>width$} | {}^", "", " ".repeat(error_col.saturating_sub(1)), width = width));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinker_config::OutputOptions;
    use tinker_output::OutputSink;

    #[test]
    fn test_source_context_marks_column() {
        let source = "let a = 1;\nconst x: number = 'bad';\nlet b = 2;\nlet c = 3;";
        assert_eq!(
            source_context(source, 2, 7),
            vec![
                "1 | let a = 1;",
                "2 | const x: number = 'bad';",
                "  |       ^",
                "3 | let b = 2;",
                "4 | let c = 3;",
            ]
        );
        assert!(source_context(source, 9, 1).is_empty());
    }

    #[test]
    fn test_plain_entry_format() {
        let sink = OutputSink::new(&OutputOptions::default());
        sink.append_text(OutputLevel::Warn, "careful");
        let entry = &sink.entries()[0];
        let view = TerminalView::new("%H", false);
        let line = view.format_entry(entry);
        assert!(line.ends_with("] careful"), "{}", line);
        assert!(line.starts_with('['));
    }
}
