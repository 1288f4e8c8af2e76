//! Terminal UI — spinners, stage banners, and the final summary.
//!
//! # Design goals
//!
//! - **Clean by default.** While a command is running the user sees only a spinner and the command
//!   line.  Its output is captured and goes to the log files.
//! - **Informative on failure.** If a command exits non-zero its captured stdout *and* stderr are
//!   printed in full so the operator can diagnose the problem without digging through
//!   `backup.log`.
//! - **Testable without a terminal.** [`StageOutcome`] is a plain data type.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille spinner frames — same style as indicatif's default.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Green ✓  — printed when a stage succeeds.
fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}
/// Red ✗    — printed when a stage fails.
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}
/// Cyan ✓   — printed next to the final success summary.
fn icon_done() -> console::StyledObject<&'static str> {
    style("✓").cyan().bold()
}

// ─── Stage result ─────────────────────────────────────────────────────────────

/// The outcome of a single command or pipeline stage.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// Human-readable label, usually the command line.
    pub label: String,
    /// Whether the stage completed without error.
    pub success: bool,
    /// Captured stdout.  Empty when it was redirected to a log file.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Failure reason, if any.
    pub error: Option<String>,
}

impl StageOutcome {
    pub fn ok(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            success: true,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
        }
    }

    pub fn failed_with(label: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.into()),
        }
    }

    /// Print the one-line summary (✓/✗ + label) to stdout.
    ///
    /// On failure, also prints the captured stdout/stderr and the error
    /// message.
    pub fn print(&self) {
        if self.success {
            println!("  {}  {}", icon_ok(), style(&self.label).bold());
        } else {
            println!("  {}  {}", icon_err(), style(&self.label).bold());

            if let Some(ref msg) = self.error {
                eprintln!();
                eprintln!("  {} {}", style("Error:").red().bold(), msg);
            }

            if !self.stdout.is_empty() {
                eprintln!();
                eprintln!("  {} stdout:", style("►").dim());
                for line in self.stdout.lines() {
                    eprintln!("    {line}");
                }
            }
            if !self.stderr.is_empty() {
                eprintln!();
                eprintln!("  {} stderr:", style("►").dim());
                for line in self.stderr.lines() {
                    eprintln!("    {line}");
                }
            }
        }
    }

    /// Returns `true` if the stage did not succeed.
    pub const fn failed(&self) -> bool {
        !self.success
    }
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

/// Create and start an indeterminate spinner for `label`.
///
/// The spinner ticks at ~80 ms and is cleared with
/// [`ProgressBar::finish_and_clear`].  Hidden when stderr is not a terminal.
pub fn make_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan}  {msg}") {
        pb.set_style(style.tick_chars(SPINNER_CHARS));
    }
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// A section header printed before each group of commands.
pub fn print_heading(title: &str) {
    println!();
    println!("  {}", style(title).bold().underlined());
}

// ─── Summary banner ───────────────────────────────────────────────────────────

/// Print the final summary after all stages have run.
///
/// Shows a success banner when everything passed, or a failure banner listing
/// what failed.
pub fn print_summary(outcomes: &[StageOutcome]) {
    let failed: Vec<&StageOutcome> = outcomes.iter().filter(|o| o.failed()).collect();
    println!();
    if failed.is_empty() {
        println!(
            "  {} {}",
            icon_done(),
            style(format!("All {} command(s) completed successfully.", outcomes.len()))
                .cyan()
                .bold()
        );
    } else {
        eprintln!(
            "  {}  {}",
            icon_err(),
            style(format!(
                "{} of {} command(s) failed.",
                failed.len(),
                outcomes.len()
            ))
            .red()
            .bold()
        );
        for o in &failed {
            eprintln!("    {} {}", icon_err(), style(&o.label).red());
        }
    }
    println!();
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(label: &str, err: &str, stdout: &str, stderr: &str) -> StageOutcome {
        StageOutcome {
            label: label.into(),
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: Some(err.into()),
        }
    }

    #[test]
    fn ok_outcome_is_not_failed() {
        let o = StageOutcome::ok("gzip x");
        assert!(!o.failed());
        assert!(o.error.is_none());
    }

    #[test]
    fn failed_with_carries_error() {
        let o = StageOutcome::failed_with("gzip x", "boom");
        assert!(o.failed());
        assert_eq!(o.error.as_deref(), Some("boom"));
    }

    #[test]
    fn print_does_not_panic_on_failure_with_output() {
        failure("tar", "exit 2", "some\nlines", "tar: oops").print();
        StageOutcome::ok("tar").print();
    }

    #[test]
    fn summary_smoke() {
        print_summary(&[StageOutcome::ok("a"), StageOutcome::ok("b")]);
        print_summary(&[
            StageOutcome::ok("a"),
            failure("b", "exit 1", "", "detail"),
        ]);
        print_summary(&[]);
    }

    #[test]
    fn spinner_can_be_cleared() {
        let pb = make_spinner("label");
        pb.finish_and_clear();
    }
}
