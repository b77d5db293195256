use serde::Serialize;
use std::io::Write;
use stack_reconcile::report::{LineStatus, ReportLine};

/// Abstraction over user-facing output.
///
/// Command modules use this trait instead of `println!`/`eprintln!` so that
/// reports go to stdout and commentary to stderr consistently, and so that
/// `--json` can silence commentary.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Stopping containers...")
    fn status(&self, message: &str);

    /// Success message (e.g., "Stack already stopped")
    fn success(&self, message: &str);

    /// Warning message (e.g., "2 processes left alone")
    fn warning(&self, message: &str);

    /// Error message
    fn error(&self, message: &str);

    /// Inline progress (no trailing newline). Call `finish_progress` after.
    fn progress(&self, message: &str);

    /// Finish an inline progress line with a result.
    fn finish_progress(&self, result: &str);

    /// One report line on stdout.
    fn line(&self, line: &ReportLine);

    /// Plain report text on stdout (summary lines, listings).
    fn report(&self, text: &str);

    /// A blank line separator.
    fn blank(&self);
}

/// Standard CLI output: report on stdout, commentary on stderr, with ANSI
/// colors on the status word.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn success(&self, message: &str) {
        eprintln!("\x1b[32m{}\x1b[0m", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("\x1b[33m{}\x1b[0m", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }

    fn progress(&self, message: &str) {
        eprint!("{}", message);
        std::io::stderr().flush().ok();
    }

    fn finish_progress(&self, result: &str) {
        eprintln!("{}", result);
    }

    fn line(&self, line: &ReportLine) {
        let color = match line.status {
            LineStatus::Pass => "32",
            LineStatus::Fail => "31",
            LineStatus::Skip => "90",
            LineStatus::Warn => "33",
        };
        let rendered = line.to_string();
        let rest = rendered
            .strip_prefix(line.status.as_str())
            .unwrap_or(&rendered);
        println!("\x1b[{}m{}\x1b[0m{}", color, line.status, rest);
    }

    fn report(&self, text: &str) {
        println!("{}", text);
    }

    fn blank(&self) {
        println!();
    }
}

/// Plain output for pipes: no escapes, same streams as [`CliOutput`].
pub struct PlainOutput;

impl UserOutput for PlainOutput {
    fn status(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn success(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn progress(&self, message: &str) {
        eprint!("{}", message);
        std::io::stderr().flush().ok();
    }

    fn finish_progress(&self, result: &str) {
        eprintln!("{}", result);
    }

    fn line(&self, line: &ReportLine) {
        println!("{}", line);
    }

    fn report(&self, text: &str) {
        println!("{}", text);
    }

    fn blank(&self) {
        println!();
    }
}

/// Suppresses all commentary. Used with `--json`, where stdout carries only
/// the document.
pub struct QuietOutput;

impl UserOutput for QuietOutput {
    fn status(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn progress(&self, _message: &str) {}
    fn finish_progress(&self, _result: &str) {}
    fn line(&self, _line: &ReportLine) {}
    fn report(&self, _text: &str) {}
    fn blank(&self) {}
}

/// Pretty JSON document on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Output for the current invocation.
pub fn select(json: bool) -> &'static dyn UserOutput {
    use std::io::IsTerminal;
    if json {
        &QuietOutput
    } else if std::io::stdout().is_terminal() {
        &CliOutput
    } else {
        &PlainOutput
    }
}
