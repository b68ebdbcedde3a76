//! Package-manager backends.
//!
//! Each backend knows how to ask its manager for installed/latest versions and
//! how to phrase an install. Queries never fail: anything that goes wrong
//! (missing binary, non-zero exit, odd output) reads as "unknown".

pub mod apt;
pub mod brew;
pub mod dnf;
pub mod pip;
pub mod powershell;

use crate::environment::{Environment, InstallMethod};
use crate::policy::{Pin, Status};
use crate::settings::Settings;
use depctl_error::DepctlResult;
use depctl_host::ProcessOps;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use apt::AptBackend;
pub use brew::BrewBackend;
pub use dnf::DnfBackend;
pub use pip::PipBackend;
pub use powershell::PowerShellBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manager {
    Brew,
    Pip,
    Apt,
    Dnf,
    #[serde(alias = "pwsh")]
    PowerShell,
}

impl fmt::Display for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Manager::Brew => "brew",
            Manager::Pip => "pip",
            Manager::Apt => "apt",
            Manager::Dnf => "dnf",
            Manager::PowerShell => "powershell",
        };
        f.write_str(s)
    }
}

impl Manager {
    /// Manager used for requirements that do not name one.
    pub fn default_for(env: &Environment) -> Self {
        match env.install_method {
            InstallMethod::Brew => Manager::Brew,
            InstallMethod::System | InstallMethod::Standalone => Manager::Pip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// What the installer has been asked to do for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallAction {
    Install(Pin),
    Upgrade(Pin),
    Downgrade(Pin),
    /// Forced reinstall of an already matching package.
    Reinstall(Pin),
}

impl InstallAction {
    /// Maps a policy status to an action; `None` when nothing should run.
    pub fn from_status(status: Status, pin: Pin, force: bool) -> Option<Self> {
        match status {
            Status::Installing => Some(Self::Install(pin)),
            Status::Upgrading => Some(Self::Upgrade(pin)),
            Status::Downgrading => Some(Self::Downgrade(pin)),
            Status::Matched if force => Some(Self::Reinstall(pin)),
            Status::Matched | Status::Skipped => None,
        }
    }

    pub fn pin(&self) -> &Pin {
        match self {
            Self::Install(pin)
            | Self::Upgrade(pin)
            | Self::Downgrade(pin)
            | Self::Reinstall(pin) => pin,
        }
    }
}

/// A package manager that depctl can query and drive.
pub trait PackageBackend {
    fn manager(&self) -> Manager;

    fn installed_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String>;

    fn latest_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String>;

    /// Command that carries out `action`; errors when the manager cannot express it.
    fn install_command(&self, package: &str, action: &InstallAction) -> DepctlResult<CommandSpec>;

    /// Fails when the manager would not land on `pin`. Managers that take a
    /// version on the command line always can.
    fn verify_pin(&self, _host: &dyn ProcessOps, _package: &str, _pin: &Pin) -> DepctlResult<()> {
        Ok(())
    }
}

/// Builds the backend for `manager` from settings and the detected environment.
pub fn for_manager(
    manager: Manager,
    settings: &Settings,
    env: &Environment,
) -> Box<dyn PackageBackend> {
    match manager {
        Manager::Brew => Box::new(BrewBackend::new(settings)),
        Manager::Pip => Box::new(PipBackend::new(settings, env)),
        Manager::Apt => Box::new(AptBackend::new(settings)),
        Manager::Dnf => Box::new(DnfBackend::new(settings)),
        Manager::PowerShell => Box::new(PowerShellBackend::new(settings)),
    }
}

/// Last non-empty line of a command's output.
pub(crate) fn last_line(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_mapping_respects_force() {
        let pin = Pin::Exact("1.0".into());
        assert_eq!(
            InstallAction::from_status(Status::Matched, pin.clone(), false),
            None
        );
        assert_eq!(
            InstallAction::from_status(Status::Matched, pin.clone(), true),
            Some(InstallAction::Reinstall(pin.clone()))
        );
        assert_eq!(InstallAction::from_status(Status::Skipped, pin.clone(), true), None);
        assert_eq!(
            InstallAction::from_status(Status::Downgrading, pin.clone(), false),
            Some(InstallAction::Downgrade(pin))
        );
    }

    #[test]
    fn manager_names_round_trip_through_serde() {
        let m: Manager = serde_json::from_str("\"powershell\"").unwrap();
        assert_eq!(m, Manager::PowerShell);
        let m: Manager = serde_json::from_str("\"pwsh\"").unwrap();
        assert_eq!(m, Manager::PowerShell);
        assert_eq!(serde_json::to_string(&Manager::Dnf).unwrap(), "\"dnf\"");
    }

    #[test]
    fn last_line_skips_blank_lines() {
        assert_eq!(last_line("Updating metadata\n\n 1.2.3 \n\n"), Some("1.2.3"));
        assert_eq!(last_line("  \n"), None);
    }
}
