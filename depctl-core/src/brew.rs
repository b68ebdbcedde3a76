//! Homebrew helpers.
//!
//! Everything goes through `brew info --json=v2`, which is stable across
//! Homebrew releases, instead of scraping `brew list` text.

use depctl_host::ProcessOps;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
struct InfoDocument {
    #[serde(default)]
    formulae: Vec<Formula>,
    #[serde(default)]
    casks: Vec<Cask>,
}

#[derive(Debug, Deserialize)]
struct Formula {
    name: String,
    #[serde(default)]
    versions: FormulaVersions,
    #[serde(default)]
    installed: Vec<InstalledKeg>,
    #[serde(default)]
    linked_keg: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FormulaVersions {
    #[serde(default)]
    stable: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstalledKeg {
    version: String,
}

#[derive(Debug, Deserialize)]
struct Cask {
    token: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    installed: Option<String>,
}

/// Installed and available versions of one formula or cask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewPackageInfo {
    pub name: String,
    pub installed: Option<String>,
    pub stable: Option<String>,
}

impl From<Formula> for BrewPackageInfo {
    fn from(f: Formula) -> Self {
        // The linked keg is what is on PATH; otherwise the newest keg wins.
        let installed = f
            .linked_keg
            .filter(|k| f.installed.iter().any(|i| &i.version == k))
            .or_else(|| f.installed.last().map(|k| k.version.clone()));
        Self {
            name: f.name,
            installed,
            stable: f.versions.stable,
        }
    }
}

impl From<Cask> for BrewPackageInfo {
    fn from(c: Cask) -> Self {
        Self {
            name: c.token,
            installed: c.installed,
            stable: c.version,
        }
    }
}

fn parse_info_document(json: &str) -> Option<InfoDocument> {
    match serde_json::from_str(json) {
        Ok(doc) => Some(doc),
        Err(err) => {
            log::debug!("unparseable brew info output: {err}");
            None
        }
    }
}

/// Parses `brew info --json=v2 <name>` output.
pub fn parse_info(json: &str) -> Option<BrewPackageInfo> {
    let doc = parse_info_document(json)?;
    if let Some(formula) = doc.formulae.into_iter().next() {
        return Some(formula.into());
    }
    doc.casks.into_iter().next().map(Into::into)
}

/// Parses `brew info --json=v2 --installed` output into `(name, version)` pairs.
pub fn parse_installed(json: &str) -> Vec<(String, String)> {
    let Some(doc) = parse_info_document(json) else {
        return Vec::new();
    };
    doc.formulae
        .into_iter()
        .map(BrewPackageInfo::from)
        .chain(doc.casks.into_iter().map(BrewPackageInfo::from))
        .filter_map(|info| info.installed.map(|v| (info.name, v)))
        .collect()
}

/// `brew --prefix`, or `None` when Homebrew is not usable.
pub fn brew_prefix(host: &dyn ProcessOps, brew_bin: &str, timeout: Duration) -> Option<PathBuf> {
    host.query_stdout(brew_bin, &["--prefix"], timeout)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

pub fn info(
    host: &dyn ProcessOps,
    brew_bin: &str,
    package: &str,
    timeout: Duration,
) -> Option<BrewPackageInfo> {
    let out = host.query_stdout(brew_bin, &["info", "--json=v2", package], timeout)?;
    parse_info(&out)
}

/// All installed formulae and casks with their versions.
pub fn list_installed(
    host: &dyn ProcessOps,
    brew_bin: &str,
    timeout: Duration,
) -> Vec<(String, String)> {
    host.query_stdout(brew_bin, &["info", "--json=v2", "--installed"], timeout)
        .map(|out| parse_installed(&out))
        .unwrap_or_default()
}
