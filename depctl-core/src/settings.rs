//! Runtime settings.
//!
//! Layering, lowest to highest: built-in defaults, an optional TOML file
//! (`--settings` or `depctl.toml` in the working directory), `DEPCTL_*`
//! environment variables, then CLI flags (applied by the caller).

use depctl_error::{DepctlError, DepctlResult};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SETTINGS_FILE: &str = "depctl.toml";

pub const PYTHON_ENV: &str = "DEPCTL_PYTHON";
pub const BREW_BIN_ENV: &str = "DEPCTL_BREW_BIN";
pub const PIP_INDEX_URL_ENV: &str = "DEPCTL_PIP_INDEX_URL";
pub const BACKUP_PATH_ENV: &str = "DEPCTL_BACKUP_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub python: String,
    pub brew_bin: String,
    pub apt_get_bin: String,
    pub dpkg_query_bin: String,
    pub apt_cache_bin: String,
    pub dnf_bin: String,
    pub rpm_bin: String,
    pub powershell_bin: String,
    /// Base URL of a PyPI-compatible JSON API. Empty disables index lookups.
    pub pip_index_url: String,
    pub pip_extra_args: Vec<String>,
    pub query_timeout_secs: u64,
    pub install_timeout_secs: u64,
    pub index_timeout_secs: u64,
    pub backup_path: PathBuf,
    pub legacy_backup_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            brew_bin: "brew".to_string(),
            apt_get_bin: "apt-get".to_string(),
            dpkg_query_bin: "dpkg-query".to_string(),
            apt_cache_bin: "apt-cache".to_string(),
            dnf_bin: "dnf".to_string(),
            rpm_bin: "rpm".to_string(),
            powershell_bin: if cfg!(windows) { "powershell" } else { "pwsh" }.to_string(),
            pip_index_url: "https://pypi.org".to_string(),
            pip_extra_args: Vec::new(),
            query_timeout_secs: 60,
            install_timeout_secs: 30 * 60,
            index_timeout_secs: 15,
            backup_path: PathBuf::from("packages.backup.json"),
            legacy_backup_path: PathBuf::from("packages.backup.txt"),
        }
    }
}

impl Settings {
    /// Loads settings from `explicit`, or from `depctl.toml` when present,
    /// then applies environment overrides.
    pub fn load(explicit: Option<&Path>) -> DepctlResult<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_SETTINGS_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_SETTINGS_FILE))?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> DepctlResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(DepctlError::Fatal(format!(
                    "settings file not found: {}",
                    path.display()
                )));
            }
            Err(err) => return Err(DepctlError::Io(err)),
        };
        Self::from_toml(&content, path)
    }

    pub fn from_toml(content: &str, path: &Path) -> DepctlResult<Self> {
        toml::from_str(content)
            .map_err(|err| DepctlError::config(path, format!("invalid settings: {err}")))
    }

    /// Applies `DEPCTL_*` overrides; `lookup` is usually `std::env::var`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(python) = lookup(PYTHON_ENV).filter(|v| !v.is_empty()) {
            self.python = python;
        }
        if let Some(brew) = lookup(BREW_BIN_ENV).filter(|v| !v.is_empty()) {
            self.brew_bin = brew;
        }
        // An empty index URL is meaningful: it turns index lookups off.
        if let Some(url) = lookup(PIP_INDEX_URL_ENV) {
            self.pip_index_url = url;
        }
        if let Some(path) = lookup(BACKUP_PATH_ENV).filter(|v| !v.is_empty()) {
            self.backup_path = PathBuf::from(path);
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs.max(1))
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_secs(self.index_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn toml_overrides_only_named_fields() {
        let settings = Settings::from_toml(
            "python = \"/opt/py/bin/python3\"\ninstall_timeout_secs = 120\npip_extra_args = [\"--user\"]\n",
            Path::new("depctl.toml"),
        )
        .unwrap();
        assert_eq!(settings.python, "/opt/py/bin/python3");
        assert_eq!(settings.install_timeout(), Duration::from_secs(120));
        assert_eq!(settings.pip_extra_args, vec!["--user".to_string()]);
        assert_eq!(settings.brew_bin, "brew");
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let err = Settings::from_toml("pythn = \"x\"", Path::new("depctl.toml")).unwrap_err();
        assert!(matches!(err, DepctlError::Config { .. }));
    }

    #[test]
    fn missing_explicit_file_is_fatal() {
        let dir = tempdir().unwrap();
        let err = Settings::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, DepctlError::Fatal(_)));
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = [
            (PYTHON_ENV, "/tmp/mock-python"),
            (PIP_INDEX_URL_ENV, ""),
            (BACKUP_PATH_ENV, "/tmp/backup.json"),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings.apply_env(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(settings.python, "/tmp/mock-python");
        assert_eq!(settings.pip_index_url, "");
        assert_eq!(settings.backup_path, PathBuf::from("/tmp/backup.json"));
        assert_eq!(settings.brew_bin, "brew");
    }

    #[test]
    fn zero_timeouts_are_clamped() {
        let settings = Settings {
            query_timeout_secs: 0,
            ..Settings::default()
        };
        assert_eq!(settings.query_timeout(), Duration::from_secs(1));
    }
}
