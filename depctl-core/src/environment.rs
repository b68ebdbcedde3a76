//! Python environment detection.
//!
//! Detection runs once at startup and the resulting [`Environment`] is passed
//! explicitly to everything that needs it. Detection failures never abort a run:
//! they degrade to [`InstallMethod::Standalone`].

use crate::brew;
use crate::settings::Settings;
use depctl_error::{DepctlError, DepctlResult};
use depctl_host::{path, ProcessOps};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Interpreter locations owned by the operating system.
const SYSTEM_PREFIXES: &[&str] = &[
    "/usr/bin/",
    "/usr/lib/",
    "/usr/libexec/",
    "/bin/",
    "/System/",
    "/Library/Developer/",
    "C:\\Windows\\",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMethod {
    Brew,
    System,
    Standalone,
}

impl fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallMethod::Brew => write!(f, "brew"),
            InstallMethod::System => write!(f, "system"),
            InstallMethod::Standalone => write!(f, "standalone"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Macos,
    Linux,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::Macos,
            "linux" => Platform::Linux,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub install_method: InstallMethod,
    pub brew_available: bool,
    pub brew_prefix: Option<PathBuf>,
    pub python: PathBuf,
    pub platform: Platform,
}

impl Environment {
    /// Fallback used when detection fails.
    pub fn standalone(python: impl Into<PathBuf>) -> Self {
        Self {
            install_method: InstallMethod::Standalone,
            brew_available: false,
            brew_prefix: None,
            python: python.into(),
            platform: Platform::current(),
        }
    }
}

/// Whether `python` lives inside a virtual environment (`<venv>/bin/python`
/// next to `<venv>/pyvenv.cfg`).
fn in_virtualenv(python: &Path) -> bool {
    python
        .parent()
        .and_then(Path::parent)
        .map(|root| root.join("pyvenv.cfg").is_file())
        .unwrap_or(false)
}

/// Classifies an interpreter from its resolved path and the Homebrew prefix.
pub fn classify(resolved: &Path, brew_prefix: Option<&Path>, in_venv: bool) -> InstallMethod {
    if in_venv {
        return InstallMethod::Standalone;
    }
    if let Some(prefix) = brew_prefix {
        let prefix = path::resolve(prefix);
        if resolved.starts_with(&prefix) {
            return InstallMethod::Brew;
        }
    }
    let resolved_str = resolved.to_string_lossy();
    if SYSTEM_PREFIXES.iter().any(|p| resolved_str.starts_with(p)) {
        return InstallMethod::System;
    }
    InstallMethod::Standalone
}

fn try_detect(host: &dyn ProcessOps, settings: &Settings) -> DepctlResult<Environment> {
    let python = path::which(&settings.python).ok_or_else(|| {
        DepctlError::Detection(format!("python interpreter {} not found", settings.python))
    })?;
    let resolved = path::resolve(&python);
    debug!("python: {} -> {}", python.display(), resolved.display());

    let brew_prefix = brew::brew_prefix(host, &settings.brew_bin, settings.query_timeout());
    let brew_available = brew_prefix.is_some();
    let install_method = classify(&resolved, brew_prefix.as_deref(), in_virtualenv(&python));

    Ok(Environment {
        install_method,
        brew_available,
        brew_prefix,
        python,
        platform: Platform::current(),
    })
}

/// Detects the active environment.
pub fn detect_environment(host: &dyn ProcessOps, settings: &Settings) -> Environment {
    match try_detect(host, settings) {
        Ok(env) => {
            info!(
                "Environment: {} (python {}, brew {})",
                env.install_method,
                env.python.display(),
                if env.brew_available { "available" } else { "absent" }
            );
            env
        }
        Err(err) => {
            warn!("{err}; assuming a standalone environment");
            Environment::standalone(&settings.python)
        }
    }
}
