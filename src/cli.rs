//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and then
//! passed (by reference) into the command handlers.

use std::path::PathBuf;

use clap::Parser;

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name    = "backupper",
    about   = "Creates a backup (tar archives, compression, consistency checks, \
               md5sums) of the directories listed in an XML plan",
    version,
    subcommand_negates_reqs = true,
    // Show a compact two-column help layout.
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// XML plan describing the directories to archive.
    #[arg(short, long, value_name = "FILE", required = true)]
    pub config: Option<PathBuf>,

    /// Destination directory; each run creates a timestamped
    /// `BACKUP-…` directory inside it.
    #[arg(short = 'd', long, value_name = "DIR", required = true)]
    pub directory: Option<PathBuf>,

    /// Subcommand to run.  Omit to run the backup.
    #[command(subcommand)]
    pub command: Option<Subcommand>,

    /// TOML settings file.
    ///
    /// Defaults to `$XDG_CONFIG_HOME/backupper/config.toml` when that file
    /// exists, otherwise built-in defaults are used.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Print the commands the plan expands to and exit.
    ///
    /// Nothing is created and nothing is run.
    #[arg(long)]
    pub print_plan: bool,

    /// Skip checksum generation for the finished archives.
    #[arg(long)]
    pub no_checksums: bool,

    /// Skip the package listing commands (`dpkg --get-selections`, …).
    #[arg(long)]
    pub no_listings: bool,

    /// Do not copy the plan files into the backup directory.
    #[arg(long)]
    pub no_copy: bool,

    /// Exit non-zero when any command failed.
    ///
    /// By default failures are logged and the run still exits 0.
    #[arg(long)]
    pub strict: bool,
}

/// Explicit subcommands.  Running `backupper` with no subcommand performs
/// the backup.
#[derive(clap::Subcommand, Debug, PartialEq, Eq)]
pub enum Subcommand {
    /// Scaffold a commented example plan.
    ///
    /// Exits with an error if the file already exists to avoid accidental
    /// overwrites.
    Init {
        /// Where to write the plan.
        #[arg(short, long, value_name = "FILE", default_value = "backup.xml")]
        output: PathBuf,
    },
}
