//! Command construction helpers.
//!
//! This module is responsible for *building* the external invocations that
//! make up a backup run.  It deliberately does **not** execute anything —
//! process execution lives in [`crate::executor`] so that the spinner can own
//! the terminal while commands run.
//!
//! Keeping construction separate from execution means every function here is
//! pure and trivially unit-testable without spawning any child processes.
//!
//! # Command lines
//!
//! A [`Command`] carries its line as a single string, exactly as it is logged.
//! [`Command::argv`] splits it on whitespace; no shell is involved, so quoting
//! and redirection are not interpreted.

use std::path::{Path, PathBuf};

use crate::settings::{ListingSettings, Settings};

/// Width of the `=` rule framing each archive command in the file-list log.
const RULE_WIDTH: usize = 78;

// ─── Command ──────────────────────────────────────────────────────────────────

/// A single external-program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The full command line, e.g. `"gzip /backup/system/etc.tar"`.
    pub line: String,
    /// Directory the process is started in.
    pub working_dir: PathBuf,
    /// When set, stdout of a successful run is appended here.
    pub stdout_log: Option<PathBuf>,
    /// Written to `stdout_log` right before the captured stdout.
    pub log_prefix: String,
}

impl Command {
    pub fn new(line: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            line: line.into(),
            working_dir: working_dir.into(),
            stdout_log: None,
            log_prefix: String::new(),
        }
    }

    /// Append stdout of a successful run to `path`.
    #[must_use]
    pub fn with_stdout_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_log = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_log_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.log_prefix = prefix.into();
        self
    }

    /// Whitespace-split argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        self.line.split_whitespace().map(String::from).collect()
    }
}

// ─── Archive actions ──────────────────────────────────────────────────────────

/// Values substituted into an archive action template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionVars {
    /// `<backup_dir>/<destination>/<archive_name>.tar`
    pub archive: String,
    /// Source directory, relative to the group's working directory.
    pub dir: String,
    /// Pre-rendered `--exclude <x> ` sequence, possibly empty.
    pub exclude: String,
}

impl ActionVars {
    /// The compressed archive, `<archive>.gz`.
    pub fn zip_archive(&self) -> String {
        format!("{}.gz", self.archive)
    }
}

/// Resolve a builtin action name to its template.
///
/// Anything that is not a builtin name is treated as a literal template.
pub fn action_template(action: &str) -> &str {
    match action {
        "tar" => "tar -cvf {archive} {exclude}{dir}",
        "gzip" => "gzip {archive}",
        "gzip-verify" | "gzip-test" => "gzip -t {zip_archive}",
        other => other,
    }
}

/// Substitute `{archive}`, `{dir}`, `{exclude}` and `{zip_archive}`.
///
/// Unknown placeholders are left untouched.
pub fn render_action(action: &str, vars: &ActionVars) -> String {
    action_template(action.trim())
        .replace("{zip_archive}", &vars.zip_archive())
        .replace("{archive}", &vars.archive)
        .replace("{exclude}", &vars.exclude)
        .replace("{dir}", &vars.dir)
}

/// Render a comma-separated exclude list as `--exclude <x> ` repeated.
pub fn render_excludes(exclude: Option<&str>) -> String {
    exclude
        .into_iter()
        .flat_map(|e| e.split(','))
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|e| format!("--exclude {e} "))
        .collect()
}

/// Banner written to the file-list log before each archive command's output.
pub fn archive_log_prefix(line: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("\n{rule}\n{line}\n{rule}\n")
}

/// The archive (position 0) command of a `<dir>` entry.
pub fn archive_command(
    line: String,
    working_dir: &Path,
    backup_dir: &Path,
    settings: &Settings,
) -> Command {
    let prefix = archive_log_prefix(&line);
    Command::new(line, working_dir)
        .with_stdout_log(backup_dir.join(&settings.archive.filelist_log))
        .with_log_prefix(prefix)
}

// ─── Checksums ────────────────────────────────────────────────────────────────

/// `<program> <relative>` run inside the backup directory.
pub fn checksum_command(relative: &str, backup_dir: &Path, settings: &Settings) -> Command {
    Command::new(
        format!("{} {relative}", settings.checksum.program),
        backup_dir,
    )
    .with_stdout_log(backup_dir.join(&settings.checksum.file))
}

// ─── Listings ─────────────────────────────────────────────────────────────────

/// One inventory command; the working directory is irrelevant, so the backup
/// directory is used.
pub fn listing_command(listing: &ListingSettings, backup_dir: &Path) -> Command {
    Command::new(listing.command.clone(), backup_dir).with_stdout_log(backup_dir.join(&listing.log))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
