//! depctl entry point: parse flags, load settings, detect the environment and
//! dispatch the selected mode.

use anyhow::{bail, Result};
use clap::Parser;
use depctl_core::cli::{Cli, Mode};
use depctl_core::environment::detect_environment;
use depctl_core::orchestrator::{run_requirements, RunSummary, Session};
use depctl_core::report::{load_report, render_table, write_report};
use depctl_core::requirements::load_requirements;
use depctl_core::settings::Settings;
use depctl_core::{logging, snapshot, DepctlError};
use depctl_host::LocalHost;
use log::{error, info};

pub fn run() -> Result<()> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<()> {
    logging::init_with(cli.log_file.as_deref(), cli.verbose);
    let result = dispatch(&cli);
    if let Err(err) = &result {
        match err.downcast_ref::<DepctlError>() {
            Some(e) if e.is_structural() => error!("Aborting: {e}"),
            _ => error!("{err:#}"),
        }
    }
    result
}

fn dispatch(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.settings.as_deref())?;
    let mode = cli.mode();

    if mode == Mode::ShowInstalled {
        let records = load_report(&cli.output)?;
        print!("{}", render_table(&records));
        return Ok(());
    }

    // Requirements are validated before anything touches the host.
    let requirements = match mode {
        Mode::Apply => Some(load_requirements(&cli.config)?),
        _ => None,
    };

    let host = LocalHost::new();
    let env = detect_environment(&host, &settings);

    if mode == Mode::Migrate {
        snapshot::migrate_packages(&settings, &env)?;
        return Ok(());
    }

    let session = Session::new(&host, settings, env, cli.dry_run, cli.force);
    match (mode, &cli.restore_packages) {
        (Mode::Backup, _) => {
            snapshot::backup_packages(&session)?;
            Ok(())
        }
        (Mode::Restore, Some(path)) => {
            let summary = RunSummary::new(snapshot::restore_packages(&session, path)?);
            write_report(&cli.output, &summary.records)?;
            finish(summary)
        }
        _ => {
            let requirements = requirements.unwrap_or_default();
            let summary = run_requirements(&session, &requirements, &cli.config, &cli.output)?;
            finish(summary)
        }
    }
}

fn finish(summary: RunSummary) -> Result<()> {
    if !summary.is_success() {
        bail!(
            "{} of {} packages failed",
            summary.failed,
            summary.records.len()
        );
    }
    info!("All {} packages satisfied", summary.records.len());
    Ok(())
}
