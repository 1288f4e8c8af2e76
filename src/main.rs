//! `backupper` — system backups driven by an XML plan.
//!
//! # Overview
//!
//! This binary is a thin orchestration layer around `tar`, `gzip` and
//! `md5sum`.  The XML plan lists the directories to archive; every run
//! produces a fresh `BACKUP-<timestamp>` directory holding the archives,
//! their checksums, the tar file lists, package listings and a full run log.
//!
//! # Usage
//!
//! ```text
//! backupper -c plan.xml -d /mnt/backups        # run the backup
//! backupper -c plan.xml -d /mnt/backups --print-plan
//! backupper init                               # scaffold backup.xml
//! ```
//!
//! # Module layout
//!
//! | Module                   | Responsibility                                |
//! |--------------------------|-----------------------------------------------|
//! | [`cli`]                  | Argument types parsed by clap                 |
//! | [`settings`]             | `Settings` struct + TOML loader               |
//! | [`plan`]                 | XML plan → commands                           |
//! | [`runner`]               | `Command` type and construction helpers       |
//! | [`executor`]             | Sequential, captured command execution        |
//! | [`checksum`]             | Archive discovery for the checksum stage      |
//! | [`logging`]              | `tracing` subscriber (stderr + run log)       |
//! | [`ui`]                   | Spinner, outcome lines, summary               |
//! | [`commands::init`]       | `backupper init` subcommand                   |
//! | [`commands::run`]        | Default backup pipeline                       |

mod checksum;
mod cli;
mod commands;
mod executor;
mod logging;
mod plan;
mod runner;
mod settings;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Subcommand};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        // ── backupper init ────────────────────────────────────────────────────
        Some(Subcommand::Init { output }) => {
            logging::init(None)?;
            commands::init::run(output)?;
        },

        // ── backupper (default pipeline) ──────────────────────────────────────
        None => {
            let settings = settings::load_settings(cli.settings.as_deref())?;
            let plan = cli.config.as_deref().context("--config is required")?;
            let destination = cli
                .directory
                .as_deref()
                .context("--directory is required")?;

            if cli.print_plan {
                logging::init(None)?;
                commands::run::print_plan(plan, destination, &settings)?;
                return Ok(());
            }

            commands::run::run(&cli, plan, destination, &settings)?;
        },
    }

    Ok(())
}
