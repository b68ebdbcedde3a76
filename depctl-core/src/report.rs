//! `installed.json` report.
//!
//! One record per requirement, rewritten every run. Writes go through a
//! temp file + rename so CI artifact collection never sees a partial file.

use crate::backends::Manager;
use crate::policy::Status;
use crate::requirements::{Policy, Requirement};
use anyhow::{Context, Result};
use depctl_error::{DepctlError, DepctlResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The manager ran and succeeded.
    Applied,
    /// Nothing needed doing.
    Unchanged,
    /// Dry run; the command was logged, not run.
    Planned,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub package: String,
    pub manager: Manager,
    pub policy: Policy,
    #[serde(default)]
    pub target: String,
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub status: Status,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstalledRecord {
    pub fn new(
        req: &Requirement,
        manager: Manager,
        installed_version: Option<String>,
        latest_version: Option<String>,
        status: Status,
    ) -> Self {
        Self {
            package: req.package.clone(),
            manager,
            policy: req.policy(),
            target: req.target().to_string(),
            installed_version,
            latest_version,
            status,
            outcome: Outcome::Unchanged,
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("installed.json");
    path.with_file_name(format!("{file_name}.tmp"))
}

/// Serializes `value` as pretty JSON and atomically replaces `path`.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let tmp_path = temp_path(path);
    let mut payload = serde_json::to_string_pretty(value).context("Failed to serialize")?;
    payload.push('\n');

    let mut file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp file: {}", tmp_path.display()))?;
    file.write_all(payload.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    file.sync_all().context("Failed to flush")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to atomically replace {}", path.display()))?;
    Ok(())
}

pub fn write_report(path: &Path, records: &[InstalledRecord]) -> Result<()> {
    write_json_atomic(path, records)
}

pub fn load_report(path: &Path) -> DepctlResult<Vec<InstalledRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(DepctlError::Fatal(format!(
                "no installed report at {}",
                path.display()
            )));
        }
        Err(err) => return Err(DepctlError::Io(err)),
    };
    serde_json::from_str(&content)
        .map_err(|err| DepctlError::config(path, format!("invalid report: {err}")))
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Applied => "applied",
        Outcome::Unchanged => "unchanged",
        Outcome::Planned => "planned",
        Outcome::Failed => "FAILED",
    }
}

/// Aligned text table for `--show-installed`.
pub fn render_table(records: &[InstalledRecord]) -> String {
    const HEADERS: [&str; 8] = [
        "PACKAGE", "MANAGER", "POLICY", "TARGET", "INSTALLED", "LATEST", "STATUS", "OUTCOME",
    ];
    let rows: Vec<[String; 8]> = records
        .iter()
        .map(|r| {
            [
                r.package.clone(),
                r.manager.to_string(),
                r.policy.to_string(),
                if r.target.is_empty() { "-".to_string() } else { r.target.clone() },
                r.installed_version.clone().unwrap_or_else(|| "-".to_string()),
                r.latest_version.clone().unwrap_or_else(|| "-".to_string()),
                r.status.to_string(),
                outcome_label(r.outcome).to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let format_row = |cells: &[&str]| {
        cells
            .iter()
            .zip(widths.iter())
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = format_row(&HEADERS[..]);
    out.push('\n');
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&format_row(&cells));
        out.push('\n');
    }
    for record in records.iter().filter(|r| r.failed()) {
        if let Some(err) = &record.error {
            out.push_str(&format!("{}: {}\n", record.package, err));
        }
    }
    out
}
