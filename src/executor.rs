//! Sequential command execution.
//!
//! Commands run one after another, each behind a spinner.  A command that
//! exits non-zero, or cannot be started at all, is logged and recorded as a
//! failed [`StageOutcome`]; execution always moves on to the next command.
//! The only fatal condition is being unable to write a command's stdout log.

use std::{
    fs::OpenOptions,
    io::Write,
    path::Path,
    process::{Output, Stdio},
};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::{runner::Command, ui::{StageOutcome, make_spinner}};

// ─── Captured execution ───────────────────────────────────────────────────────

/// What a finished process left behind.
#[derive(Debug)]
pub struct Captured {
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Raw bytes; file lists may carry names that are not UTF-8.
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Captured {
    fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `command` in its working directory, capturing stdout and stderr.
///
/// Errors only when the process cannot be spawned.
pub fn run_captured(command: &Command) -> Result<Captured> {
    let argv = command.argv();
    let (prog, rest) = argv.split_first().context("cannot run an empty command")?;

    let output: Output = std::process::Command::new(prog)
        .args(rest)
        .current_dir(&command.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| {
            format!(
                "failed to spawn '{}' in '{}'",
                command.line,
                command.working_dir.display()
            )
        })?;

    Ok(Captured {
        success: output.status.success(),
        code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Append `prefix` followed by `data` to `path`, creating it if needed.
/// `data` is written untouched.
pub fn append_log(path: &Path, prefix: &str, data: &[u8]) -> Result<()> {
    debug!("Storing command stdout into file '{}'", path.display());
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    f.write_all(prefix.as_bytes())
        .and_then(|()| f.write_all(data))
        .and_then(|()| f.flush())
        .with_context(|| format!("error while storing stdout into '{}'", path.display()))
}

// ─── Executor ─────────────────────────────────────────────────────────────────

/// Runs batches of commands, printing a ✓/✗ line for each.
#[derive(Debug, Default)]
pub struct Executor {
    /// Print outcome lines to the terminal.  Off in tests.
    quiet: bool,
}

impl Executor {
    pub const fn new() -> Self {
        Self { quiet: false }
    }

    #[cfg(test)]
    pub const fn quiet() -> Self {
        Self { quiet: true }
    }

    /// Execute `commands` in order.
    ///
    /// Returns one outcome per command.  Errors only when a stdout log file
    /// cannot be written.
    pub fn execute(&self, commands: &[Command]) -> Result<Vec<StageOutcome>> {
        let listing: String = commands.iter().map(|c| format!("\n\t'{}'", c.line)).collect();
        info!("{} command(s) to be executed:{listing}", commands.len());

        let mut outcomes = Vec::with_capacity(commands.len());
        for command in commands {
            let outcome = self.execute_one(command)?;
            if !self.quiet {
                outcome.print();
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn execute_one(&self, command: &Command) -> Result<StageOutcome> {
        debug!("Changing current directory to '{}'", command.working_dir.display());
        info!("Executing command:\n\t'{}' ...", command.line);

        let spinner = (!self.quiet).then(|| make_spinner(&command.line));
        let result = run_captured(command);
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let captured = match result {
            Ok(c) => c,
            Err(e) => {
                error!("'{}' could not be started, reason: {e:#}", command.line);
                return Ok(StageOutcome::failed_with(&command.line, format!("{e:#}")));
            },
        };

        let stderr = captured.stderr_lossy();
        if !captured.success {
            let stdout = captured.stdout_lossy();
            debug!("\nstdout:\n{stdout}\n\nstderr:\n{stderr}");
            let code = captured
                .code
                .map_or_else(|| "killed by signal".to_string(), |c| c.to_string());
            let msg = format!("'{}' failed, return code: {code}", command.line);
            error!("{msg}");
            return Ok(StageOutcome {
                label: command.line.clone(),
                success: false,
                stdout,
                stderr,
                error: Some(msg),
            });
        }

        info!("Command finished, no error raised.");
        let stdout = if let Some(log) = &command.stdout_log {
            append_log(log, &command.log_prefix, &captured.stdout)?;
            debug!(
                "stdout: saved in a separate file '{}'\nstderr:\n{stderr}",
                log.display()
            );
            String::new()
        } else {
            let stdout = captured.stdout_lossy();
            debug!("\nstdout:\n{stdout}\nstderr:\n{stderr}");
            stdout
        };

        Ok(StageOutcome {
            label: command.line.clone(),
            success: true,
            stdout,
            stderr,
            error: None,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(line: &str) -> Command {
        Command::new(line, std::env::temp_dir())
    }

    // ── run_captured ─────────────────────────────────────────────────────────

    #[test]
    fn run_captured_true_succeeds() {
        let c = run_captured(&cmd("true")).unwrap();
        assert!(c.success);
        assert_eq!(c.code, Some(0));
    }

    #[test]
    fn run_captured_false_fails() {
        let c = run_captured(&cmd("false")).unwrap();
        assert!(!c.success);
        assert_eq!(c.code, Some(1));
    }

    #[test]
    fn run_captured_captures_stdout() {
        let c = run_captured(&cmd("echo hello")).unwrap();
        assert_eq!(c.stdout, b"hello\n");
    }

    #[test]
    fn run_captured_uses_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let c = run_captured(&Command::new("ls", dir.path())).unwrap();
        assert!(c.stdout_lossy().contains("marker.txt"));
    }

    #[test]
    fn run_captured_empty_line_errors() {
        assert!(run_captured(&cmd("  ")).is_err());
    }

    #[test]
    fn run_captured_missing_binary_errors() {
        assert!(run_captured(&cmd("definitely-not-a-real-binary-xyz")).is_err());
    }

    // ── append_log ────────────────────────────────────────────────────────────

    #[test]
    fn append_log_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("out.log");
        append_log(&log, "[1]", b"a\n").unwrap();
        append_log(&log, "[2]", b"b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "[1]a\n[2]b\n");
    }

    #[test]
    fn append_log_into_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(append_log(&dir.path().join("no/such/dir.log"), "", b"x").is_err());
    }

    // ── Executor ──────────────────────────────────────────────────────────────

    #[test]
    fn failures_do_not_stop_execution() {
        let outcomes = Executor::quiet()
            .execute(&[
                cmd("false"),
                cmd("definitely-not-a-real-binary-xyz"),
                cmd("echo still-running"),
            ])
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].failed());
        assert!(outcomes[0].error.as_deref().unwrap().contains("return code: 1"));
        assert!(outcomes[1].failed());
        assert!(outcomes[2].success);
        assert!(outcomes[2].stdout.contains("still-running"));
    }

    #[test]
    fn stdout_goes_to_log_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("filelist.log");
        let commands = vec![
            Command::new("echo one", dir.path())
                .with_stdout_log(&log)
                .with_log_prefix("--1--\n"),
            Command::new("echo two", dir.path())
                .with_stdout_log(&log)
                .with_log_prefix("--2--\n"),
        ];
        let outcomes = Executor::quiet().execute(&commands).unwrap();
        assert!(outcomes.iter().all(|o| o.success && o.stdout.is_empty()));
        assert_eq!(
            std::fs::read_to_string(&log).unwrap(),
            "--1--\none\n--2--\ntwo\n"
        );
    }

    #[test]
    fn log_keeps_non_utf8_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("filelist.log");
        let c = Command::new(r"printf \377name", dir.path()).with_stdout_log(&log);
        let outcomes = Executor::quiet().execute(&[c]).unwrap();
        assert!(outcomes[0].success);
        assert_eq!(std::fs::read(&log).unwrap(), b"\xffname");
    }

    #[test]
    fn failed_command_does_not_touch_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("x.log");
        let c = Command::new("false", dir.path()).with_stdout_log(&log);
        let outcomes = Executor::quiet().execute(&[c]).unwrap();
        assert!(outcomes[0].failed());
        assert!(!log.exists());
    }

    #[test]
    fn unwritable_log_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let c = Command::new("true", dir.path()).with_stdout_log(dir.path().join("a/b.log"));
        assert!(Executor::quiet().execute(&[c]).is_err());
    }

    #[test]
    fn empty_batch_is_fine() {
        assert!(Executor::quiet().execute(&[]).unwrap().is_empty());
    }
}
