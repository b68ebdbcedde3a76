//! Backup, restore and migration of the installed package set.
//!
//! Snapshots are JSON documents (schema 2). The legacy format is plain
//! `pip freeze` text, which `restore` still reads and `migrate` converts.

use crate::backends::{BrewBackend, Manager, PipBackend};
use crate::environment::{Environment, InstallMethod};
use crate::orchestrator::Session;
use crate::report::{write_json_atomic, InstalledRecord};
use crate::requirements::{normalize_name, Policy, Requirement};
use crate::settings::Settings;
use anyhow::Result;
use depctl_error::{DepctlError, DepctlResult};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SNAPSHOT_SCHEMA: u32 = 2;

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub package: String,
    pub version: String,
    pub manager: Manager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema: u32,
    pub created_at_unix_ms: u64,
    pub install_method: InstallMethod,
    pub packages: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new(install_method: InstallMethod, packages: Vec<SnapshotEntry>) -> Self {
        Self {
            schema: SNAPSHOT_SCHEMA,
            created_at_unix_ms: now_unix_ms(),
            install_method,
            packages,
        }
    }

    /// Restoring a snapshot means pinning every entry exactly.
    pub fn requirements(&self) -> Vec<Requirement> {
        self.packages
            .iter()
            .map(|e| {
                Requirement::new(&e.package, &e.version, Policy::Exact).with_manager(e.manager)
            })
            .collect()
    }
}

/// Parses `pip freeze` text: `name==version` lines. Comments, options,
/// editable installs and direct references are skipped. Later duplicates win.
pub fn parse_freeze(text: &str) -> Vec<SnapshotEntry> {
    let mut entries: Vec<SnapshotEntry> = Vec::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with('-') || line.contains(" @ ") {
            continue;
        }
        let Some((name, version)) = line.split_once("==") else {
            continue;
        };
        let (name, version) = (name.trim(), version.trim());
        let version = version.split(';').next().unwrap_or("").trim();
        if name.is_empty() || version.is_empty() {
            continue;
        }
        let key = normalize_name(name);
        entries.retain(|e| normalize_name(&e.package) != key);
        entries.push(SnapshotEntry {
            package: name.to_string(),
            version: version.to_string(),
            manager: Manager::Pip,
        });
    }
    entries
}

fn read_required(path: &Path, what: &str) -> DepctlResult<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(DepctlError::Fatal(format!(
            "{what} not found: {}",
            path.display()
        ))),
        Err(err) => Err(DepctlError::Io(err)),
    }
}

/// Loads a snapshot in either the current JSON schema or legacy freeze text.
pub fn load_snapshot(path: &Path, install_method: InstallMethod) -> DepctlResult<Snapshot> {
    let content = read_required(path, "snapshot")?;
    if content.trim_start().starts_with('{') {
        let snapshot: Snapshot = serde_json::from_str(&content)
            .map_err(|err| DepctlError::config(path, format!("invalid snapshot: {err}")))?;
        if snapshot.schema > SNAPSHOT_SCHEMA {
            return Err(DepctlError::config(
                path,
                format!(
                    "snapshot schema {} is newer than supported {}",
                    snapshot.schema, SNAPSHOT_SCHEMA
                ),
            ));
        }
        return Ok(snapshot);
    }
    Ok(Snapshot::new(install_method, parse_freeze(&content)))
}

/// Captures the installed package set and writes it to `settings.backup_path`.
///
/// A Homebrew-managed environment is captured through Homebrew only; pip
/// never drives a Homebrew interpreter.
pub fn backup_packages(session: &Session<'_>) -> Result<Snapshot> {
    let env = session.environment();
    let settings = session.settings();

    let (manager, listed) = if env.install_method == InstallMethod::Brew {
        let brew = BrewBackend::new(settings);
        (Manager::Brew, brew.list_installed(session.host()))
    } else {
        let pip = PipBackend::new(settings, env);
        (Manager::Pip, pip.list_installed(session.host()))
    };
    let packages: Vec<SnapshotEntry> = listed
        .into_iter()
        .map(|(package, version)| SnapshotEntry {
            package,
            version,
            manager,
        })
        .collect();

    if packages.is_empty() {
        warn!("No installed packages found; writing an empty snapshot");
    }
    let snapshot = Snapshot::new(env.install_method, packages);
    write_json_atomic(&settings.backup_path, &snapshot)?;
    info!(
        "Backed up {} packages to {}",
        snapshot.packages.len(),
        settings.backup_path.display()
    );
    Ok(snapshot)
}

/// Reinstalls the exact versions recorded in `path`.
///
/// Entries already at their recorded version produce no action; failures are
/// recorded per package and the batch carries on. A snapshot the environment
/// cannot serve (pip entries for a Homebrew interpreter) is rejected before
/// anything runs.
pub fn restore_packages(session: &Session<'_>, path: &Path) -> DepctlResult<Vec<InstalledRecord>> {
    let snapshot = load_snapshot(path, session.environment().install_method)?;
    let requirements = snapshot.requirements();
    session.check_managers(&requirements, path)?;
    info!(
        "Restoring {} packages from {}",
        snapshot.packages.len(),
        path.display()
    );
    Ok(session.process_all(&requirements, false))
}

/// Converts the legacy freeze snapshot into the current schema.
pub fn migrate_packages(settings: &Settings, env: &Environment) -> Result<Snapshot> {
    let source = &settings.legacy_backup_path;
    let content = read_required(source, "legacy snapshot")?;
    let snapshot = Snapshot::new(env.install_method, parse_freeze(&content));
    write_json_atomic(&settings.backup_path, &snapshot)?;
    info!(
        "Migrated {} packages from {} to {}",
        snapshot.packages.len(),
        source.display(),
        settings.backup_path.display()
    );
    Ok(snapshot)
}
