//! Checksums of the finished archives.
//!
//! Every file below the backup directory whose name matches the configured
//! mask gets one checksum command.  Paths are passed relative to the backup
//! directory (`system/etc.tar.gz`), so the resulting `md5checksum.log` can be
//! verified later with `md5sum -c` from inside a restored copy.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    runner::{Command, checksum_command},
    settings::Settings,
};

/// Files under `root` (recursively) whose file name matches `mask`, sorted.
pub fn find_archives(root: &Path, mask: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/**/{mask}",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    debug!("Looking for archives matching '{pattern}'");

    let mut found = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("invalid mask '{mask}'"))? {
        let path = entry.context("reading backup directory")?;
        if path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// `path` relative to `root`, without a leading separator.
pub fn relative_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .trim_start_matches('/')
        .to_string()
}

/// One checksum command per archive found under `backup_dir`.
pub fn checksum_commands(backup_dir: &Path, settings: &Settings) -> Result<Vec<Command>> {
    Ok(find_archives(backup_dir, &settings.checksum.mask)?
        .iter()
        .map(|p| checksum_command(&relative_name(backup_dir, p), backup_dir, settings))
        .collect())
}
