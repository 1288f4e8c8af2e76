//! Default backup pipeline — runs when no subcommand is given.
//!
//! # Pipeline stages (in order)
//!
//! | # | Stage      | Flag to skip      | Description                                   |
//! |---|------------|-------------------|-----------------------------------------------|
//! | 1 | Prepare    | —                 | Create `<dest>/BACKUP-<timestamp>`, open log  |
//! | 2 | Copy       | `--no-copy`       | Copy plan files (and optionally the binary)   |
//! | 3 | Plan       | —                 | Parse XML, create destination subdirectories  |
//! | 4 | Archives   | —                 | Run every archive/compress/verify command     |
//! | 5 | Checksums  | `--no-checksums`  | `md5sum` every archive into `md5checksum.log` |
//! | 6 | Listings   | `--no-listings`   | `dpkg --get-selections`, `dpkg -l`            |
//!
//! Stages 2 and 3 are fatal on error.  Individual commands in stages 4–6 are
//! logged when they fail and the run carries on; `--strict` turns any such
//! failure into a non-zero exit at the end.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use tracing::{error, info};

use crate::{
    checksum::checksum_commands,
    cli::Cli,
    executor::Executor,
    logging,
    plan::Plan,
    runner::listing_command,
    settings::{CopySettings, Settings},
    ui::{StageOutcome, print_heading, print_summary},
};

// ─── Entry points ─────────────────────────────────────────────────────────────

/// Execute the full backup into a fresh directory below `destination`.
pub fn run(cli: &Cli, plan_path: &Path, destination: &Path, settings: &Settings) -> Result<()> {
    let args: Vec<std::ffi::OsString> = std::env::args_os().skip(1).collect();
    println!("backupper, raw arguments: {args:?}");

    validate_inputs(plan_path, destination)?;
    println!(
        "Using XML plan '{}', destination directory '{}'",
        plan_path.display(),
        destination.display()
    );

    let started = Local::now();
    let backup_dir = backup_dir_path(destination, settings, &started)?;
    println!("Final destination directory: '{}'", backup_dir.display());
    fs::create_dir(&backup_dir)
        .with_context(|| format!("could not create directory '{}'", backup_dir.display()))?;

    let log_file = backup_dir.join(&settings.log.file);
    logging::init(Some((log_file.as_path(), settings.log.level.as_str())))?;
    info!("Start time: {}", started.format("%Hh %Mm %Ss"));

    let result = pipeline(cli, plan_path, &backup_dir, settings);
    if let Err(ref e) = result {
        error!("{e:#}");
    }
    finish(&started);

    let outcomes = result?;
    print_summary(&outcomes);

    let failed = outcomes.iter().filter(|o| o.failed()).count();
    if cli.strict && failed > 0 {
        bail!("{failed} command(s) failed");
    }
    Ok(())
}

/// Print what a run would do, without creating or executing anything.
pub fn print_plan(plan_path: &Path, destination: &Path, settings: &Settings) -> Result<()> {
    let backup_dir = backup_dir_path(destination, settings, &Local::now())?;
    let plan = Plan::load(plan_path)?;

    println!("# backup directory: {}", backup_dir.display());
    for dest in plan.destinations(&backup_dir) {
        println!("# destination:      {}", dest.display());
    }
    for command in plan.commands(&backup_dir, settings) {
        match &command.stdout_log {
            Some(log) => println!(
                "(cd {}) {}  >> {}",
                command.working_dir.display(),
                command.line,
                log.display()
            ),
            None => println!("(cd {}) {}", command.working_dir.display(), command.line),
        }
    }
    Ok(())
}

// ─── Stages ───────────────────────────────────────────────────────────────────

fn pipeline(
    cli: &Cli,
    plan_path: &Path,
    backup_dir: &Path,
    settings: &Settings,
) -> Result<Vec<StageOutcome>> {
    let executor = Executor::new();
    let mut outcomes = Vec::new();

    if !cli.no_copy {
        print_heading("Copy");
        for copied in copy_files(plan_path, backup_dir, &settings.copy).context("copy failed")? {
            StageOutcome::ok(format!("{}", copied.display())).print();
        }
    }

    print_heading("Plan");
    let plan = Plan::load(plan_path).context("error while processing input file")?;
    plan.prepare_destinations(backup_dir)?;
    let commands = plan.commands(backup_dir, settings);
    StageOutcome::ok(format!(
        "{} command(s) from {}",
        commands.len(),
        plan_path.display()
    ))
    .print();

    print_heading("Archives");
    outcomes.extend(
        executor
            .execute(&commands)
            .context("executing commands failed")?,
    );

    if !cli.no_checksums {
        print_heading("Checksums");
        let commands =
            checksum_commands(backup_dir, settings).context("error generating checksums")?;
        outcomes.extend(
            executor
                .execute(&commands)
                .context("error generating checksums")?,
        );
    }

    if !cli.no_listings && !settings.listings.is_empty() {
        print_heading("Listings");
        let commands: Vec<_> = settings
            .listings
            .iter()
            .map(|l| listing_command(l, backup_dir))
            .collect();
        outcomes.extend(
            executor
                .execute(&commands)
                .context("error while running listings")?,
        );
    }

    Ok(outcomes)
}

fn finish(started: &DateTime<Local>) {
    let ended = Local::now();
    info!("Finish time: {}", ended.format("%Hh %Mm %Ss"));
    let lasted = ended.signed_duration_since(*started);
    info!(
        "Backup lasted: {} minutes ({} seconds)",
        lasted.num_minutes(),
        lasted.num_seconds()
    );
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// The plan must be readable and the destination an existing directory.
pub fn validate_inputs(plan_path: &Path, destination: &Path) -> Result<()> {
    fs::File::open(plan_path)
        .with_context(|| format!("can't open file '{}'", plan_path.display()))?;
    if !destination.is_dir() {
        bail!(
            "'{}' is not a directory or does not exist",
            destination.display()
        );
    }
    Ok(())
}

/// `<abs destination>/<dir_prefix><timestamp>`.
pub fn backup_dir_path(
    destination: &Path,
    settings: &Settings,
    at: &DateTime<Local>,
) -> Result<PathBuf> {
    let mut name = settings.dir_prefix.clone();
    write!(name, "{}", at.format(&settings.timestamp_format))
        .map_err(|_| anyhow::anyhow!("invalid timestamp_format '{}'", settings.timestamp_format))?;
    let root = std::path::absolute(destination)
        .with_context(|| format!("resolving {}", destination.display()))?;
    Ok(root.join(name))
}

/// Copy the plan's sibling `*.xml` files (and the running binary, if enabled)
/// into `backup_dir`, keeping modification times.
pub fn copy_files(plan_path: &Path, backup_dir: &Path, copy: &CopySettings) -> Result<Vec<PathBuf>> {
    let mut sources: Vec<PathBuf> = Vec::new();

    if copy.executable {
        sources.push(std::env::current_exe().context("locating the running executable")?);
    }

    if copy.plan_files {
        let plan_abs = std::path::absolute(plan_path)
            .with_context(|| format!("resolving {}", plan_path.display()))?;
        let plan_dir = plan_abs.parent().unwrap_or_else(|| Path::new("/"));
        let pattern = format!("{}/*.xml", glob::Pattern::escape(&plan_dir.to_string_lossy()));
        for entry in glob::glob(&pattern).context("invalid plan directory pattern")? {
            let path = entry?;
            if path.is_file() {
                sources.push(path);
            }
        }
        if !sources.contains(&plan_abs) {
            sources.push(plan_abs);
        }
    }

    sources
        .iter()
        .map(|src| {
            info!("Copy file '{}' to '{}'", src.display(), backup_dir.display());
            copy_preserving_mtime(src, backup_dir)
        })
        .collect()
}

fn copy_preserving_mtime(src: &Path, dir: &Path) -> Result<PathBuf> {
    let name = src
        .file_name()
        .with_context(|| format!("'{}' has no file name", src.display()))?;
    let dst = dir.join(name);
    fs::copy(src, &dst)
        .with_context(|| format!("copying {} to {}", src.display(), dst.display()))?;

    let modified = fs::metadata(src)
        .and_then(|m| m.modified())
        .with_context(|| format!("reading mtime of {}", src.display()))?;
    fs::File::options()
        .write(true)
        .open(&dst)
        .and_then(|f| f.set_modified(modified))
        .with_context(|| format!("setting mtime of {}", dst.display()))?;
    Ok(dst)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
