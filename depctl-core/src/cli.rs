//! CLI argument parsing for depctl.
//!
//! Without a mode flag depctl applies the requirements file.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Apply,
    Backup,
    Restore,
    Migrate,
    ShowInstalled,
}

#[derive(Debug, Parser)]
#[command(name = "depctl", version)]
#[command(about = "Keep installed packages in line with a requirements file")]
#[command(group(
    ArgGroup::new("mode")
        .args(["backup_packages", "restore_packages", "migrate_packages", "show_installed"])
        .multiple(false)
))]
pub struct Cli {
    /// Requirements file
    #[arg(short = 'c', long, default_value = "requirements.json")]
    pub config: PathBuf,

    /// Where the per-package report is written
    #[arg(short = 'o', long, default_value = "installed.json")]
    pub output: PathBuf,

    /// Reinstall packages that already match their policy
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Snapshot installed packages to the backup file
    #[arg(long)]
    pub backup_packages: bool,

    /// Reinstall the exact versions recorded in a snapshot
    #[arg(long, value_name = "PATH")]
    pub restore_packages: Option<PathBuf>,

    /// Convert the legacy text snapshot to the JSON format
    #[arg(long)]
    pub migrate_packages: bool,

    /// Print the last report as a table
    #[arg(long)]
    pub show_installed: bool,

    /// Log install commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Settings file (defaults to depctl.toml when present)
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.backup_packages {
            Mode::Backup
        } else if self.restore_packages.is_some() {
            Mode::Restore
        } else if self.migrate_packages {
            Mode::Migrate
        } else if self.show_installed {
            Mode::ShowInstalled
        } else {
            Mode::Apply
        }
    }
}
