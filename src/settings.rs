//! Tool settings and loading logic.
//!
//! `Settings` is a direct 1-to-1 mapping of `config.toml`.  Every field has a
//! `Default` impl so the file is entirely optional — running `backupper`
//! without any settings file reproduces the classic layout: `backup.log`,
//! `archive-filelist.log`, `md5checksum.log` and the two `dpkg` listings.
//!
//! This file configures the *tool*.  What gets archived is described by the
//! XML plan, see [`crate::plan`].
//!
//! # File format
//!
//! ```toml
//! dir_prefix       = "BACKUP-"
//! timestamp_format = "%Y-%m-%d-%Hh-%Mm-%Ss"
//!
//! [log]
//! file  = "backup.log"
//! level = "debug"
//!
//! [archive]
//! filelist_log = "archive-filelist.log"
//!
//! [checksum]
//! program = "md5sum"
//! mask    = "*.tar*"
//! file    = "md5checksum.log"
//!
//! [copy]
//! plan_files = true
//! executable = false
//!
//! [[listing]]
//! command = "dpkg --get-selections"
//! log     = "dpkg--get-selections.log"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ─── Top-level ────────────────────────────────────────────────────────────────

/// Root settings object, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    /// Prefix of the per-run backup directory name.
    #[serde(default = "default_dir_prefix")]
    pub dir_prefix: String,

    /// `chrono` format string appended to [`Settings::dir_prefix`].
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    #[serde(default)]
    pub log: LogSettings,

    #[serde(default)]
    pub archive: ArchiveSettings,

    #[serde(default)]
    pub checksum: ChecksumSettings,

    #[serde(default)]
    pub copy: CopySettings,

    /// System inventory commands run after the archives are done.
    #[serde(default = "default_listings", rename = "listing")]
    pub listings: Vec<ListingSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dir_prefix: default_dir_prefix(),
            timestamp_format: default_timestamp_format(),
            log: LogSettings::default(),
            archive: ArchiveSettings::default(),
            checksum: ChecksumSettings::default(),
            copy: CopySettings::default(),
            listings: default_listings(),
        }
    }
}

// ─── [log] ────────────────────────────────────────────────────────────────────

/// Run log written inside the backup directory.
#[derive(Debug, Deserialize, Serialize)]
pub struct LogSettings {
    /// File name, relative to the backup directory.
    #[serde(default = "default_log_file")]
    pub file: String,

    /// Level for the file log.  The console log follows `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

// ─── [archive] ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct ArchiveSettings {
    /// Receives the stdout of every archive command (the `tar -v` file list).
    #[serde(default = "default_filelist_log")]
    pub filelist_log: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            filelist_log: default_filelist_log(),
        }
    }
}

// ─── [checksum] ───────────────────────────────────────────────────────────────

/// Checksums of the finished archives.
#[derive(Debug, Deserialize, Serialize)]
pub struct ChecksumSettings {
    /// Checksum program, invoked as `<program> <relative path>`.
    #[serde(default = "default_checksum_program")]
    pub program: String,

    /// Glob matched against file names anywhere below the backup directory.
    #[serde(default = "default_checksum_mask")]
    pub mask: String,

    /// Output file, relative to the backup directory.
    #[serde(default = "default_checksum_file")]
    pub file: String,
}

impl Default for ChecksumSettings {
    fn default() -> Self {
        Self {
            program: default_checksum_program(),
            mask: default_checksum_mask(),
            file: default_checksum_file(),
        }
    }
}

// ─── [copy] ───────────────────────────────────────────────────────────────────

/// What gets copied verbatim into the backup directory before archiving.
#[derive(Debug, Deserialize, Serialize)]
pub struct CopySettings {
    /// Copy every `*.xml` next to the plan, so the backup documents itself.
    #[serde(default = "default_true")]
    pub plan_files: bool,

    /// Copy the running `backupper` binary as well.
    #[serde(default)]
    pub executable: bool,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            plan_files: true,
            executable: false,
        }
    }
}

// ─── [[listing]] ──────────────────────────────────────────────────────────────

/// One inventory command whose stdout is stored in `log`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ListingSettings {
    pub command: String,
    pub log: String,
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

// These free functions are required by `#[serde(default = "…")]` — serde
// cannot call `Default::default()` for individual fields, only for whole
// structs.

pub fn default_dir_prefix() -> String {
    "BACKUP-".into()
}

pub fn default_timestamp_format() -> String {
    "%Y-%m-%d-%Hh-%Mm-%Ss".into()
}

pub fn default_log_file() -> String {
    "backup.log".into()
}

pub fn default_log_level() -> String {
    "debug".into()
}

pub fn default_filelist_log() -> String {
    "archive-filelist.log".into()
}

pub fn default_checksum_program() -> String {
    "md5sum".into()
}

pub fn default_checksum_mask() -> String {
    "*.tar*".into()
}

pub fn default_checksum_file() -> String {
    "md5checksum.log".into()
}

pub fn default_listings() -> Vec<ListingSettings> {
    vec![
        ListingSettings {
            command: "dpkg --get-selections".into(),
            log: "dpkg--get-selections.log".into(),
        },
        ListingSettings {
            command: "dpkg -l".into(),
            log: "dpkg-l.log".into(),
        },
    ]
}

const fn default_true() -> bool {
    true
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// `$XDG_CONFIG_HOME/backupper/config.toml`, if a config dir can be resolved.
pub fn global_settings_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|d| d.join("backupper").join("config.toml"))
}

/// Resolve and load the settings for this run.
///
/// 1. `explicit` (from `--settings`) must exist and parse.
/// 2. Otherwise the global file is used when it exists.
/// 3. Otherwise everything is defaulted.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("settings file '{}' does not exist", path.display());
        }
        return parse_settings(path);
    }

    match global_settings_path() {
        Some(path) if path.exists() => parse_settings(&path),
        _ => Ok(Settings::default()),
    }
}

/// Read and parse a `Settings` from `path`.
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn parse_settings(path: &Path) -> Result<Settings> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
