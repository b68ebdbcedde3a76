use super::{CommandSpec, InstallAction, Manager, PackageBackend};
use crate::brew;
use crate::policy::Pin;
use crate::settings::Settings;
use crate::version;
use depctl_error::{DepctlError, DepctlResult};
use depctl_host::ProcessOps;
use std::cmp::Ordering;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BrewBackend {
    brew_bin: String,
    timeout: Duration,
}

impl BrewBackend {
    pub fn new(settings: &Settings) -> Self {
        Self {
            brew_bin: settings.brew_bin.clone(),
            timeout: settings.query_timeout(),
        }
    }

    pub fn list_installed(&self, host: &dyn ProcessOps) -> Vec<(String, String)> {
        brew::list_installed(host, &self.brew_bin, self.timeout)
    }
}

impl PackageBackend for BrewBackend {
    fn manager(&self) -> Manager {
        Manager::Brew
    }

    fn installed_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        brew::info(host, &self.brew_bin, package, self.timeout)?.installed
    }

    fn latest_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        brew::info(host, &self.brew_bin, package, self.timeout)?.stable
    }

    fn install_command(&self, package: &str, action: &InstallAction) -> DepctlResult<CommandSpec> {
        let verb = match action {
            InstallAction::Install(_) => "install",
            InstallAction::Upgrade(_) => "upgrade",
            InstallAction::Reinstall(_) => "reinstall",
            InstallAction::Downgrade(pin) => {
                return Err(DepctlError::install(
                    package,
                    format!("Homebrew cannot install an older version ({pin})"),
                ));
            }
        };
        Ok(CommandSpec::new(&self.brew_bin).arg(verb).arg(package))
    }

    /// Homebrew only installs the formula's current stable version, so an
    /// exact pin must equal it and a floor must not be above it.
    fn verify_pin(&self, host: &dyn ProcessOps, package: &str, pin: &Pin) -> DepctlResult<()> {
        let stable = self.latest_version(host, package);
        match (pin, stable.as_deref()) {
            (Pin::Newest, _) => Ok(()),
            (Pin::Exact(target), Some(stable))
                if version::compare(stable, target) == Some(Ordering::Equal) =>
            {
                Ok(())
            }
            (Pin::Exact(target), Some(stable)) => Err(DepctlError::install(
                package,
                format!("Homebrew offers {stable}, not the pinned {target}"),
            )),
            (Pin::Exact(target), None) => Err(DepctlError::install(
                package,
                format!("Homebrew stable version unknown; cannot pin {target}"),
            )),
            (Pin::AtLeast(floor), Some(stable))
                if version::compare(stable, floor) == Some(Ordering::Less) =>
            {
                Err(DepctlError::install(
                    package,
                    format!("Homebrew offers {stable}, below the required {floor}"),
                ))
            }
            (Pin::AtLeast(_), _) => Ok(()),
        }
    }
}
