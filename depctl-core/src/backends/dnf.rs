use super::{last_line, CommandSpec, InstallAction, Manager, PackageBackend};
use crate::policy::Pin;
use crate::settings::Settings;
use depctl_error::DepctlResult;
use depctl_host::ProcessOps;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DnfBackend {
    dnf: String,
    rpm: String,
    timeout: Duration,
}

impl DnfBackend {
    pub fn new(settings: &Settings) -> Self {
        Self {
            dnf: settings.dnf_bin.clone(),
            rpm: settings.rpm_bin.clone(),
            timeout: settings.query_timeout(),
        }
    }
}

/// `dnf` prints metadata progress before results; the version is the last
/// line that starts with a digit.
fn version_line(output: &str) -> Option<String> {
    last_line(output)
        .filter(|l| l.starts_with(|c: char| c.is_ascii_digit()))
        .map(str::to_string)
}

impl PackageBackend for DnfBackend {
    fn manager(&self) -> Manager {
        Manager::Dnf
    }

    fn installed_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        let out = host.query_stdout(
            &self.rpm,
            &["-q", "--queryformat", "%{VERSION}", package],
            self.timeout,
        )?;
        version_line(&out)
    }

    fn latest_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        let out = host.query_stdout(
            &self.dnf,
            &[
                "repoquery",
                "--quiet",
                "--latest-limit=1",
                "--queryformat",
                "%{version}\n",
                package,
            ],
            self.timeout,
        )?;
        version_line(&out)
    }

    fn install_command(&self, package: &str, action: &InstallAction) -> DepctlResult<CommandSpec> {
        let target = match action.pin() {
            Pin::Exact(v) => format!("{package}-{v}"),
            Pin::AtLeast(_) | Pin::Newest => package.to_string(),
        };
        let verb = match action {
            InstallAction::Install(_) => "install",
            InstallAction::Upgrade(_) => "upgrade",
            InstallAction::Downgrade(_) => "downgrade",
            InstallAction::Reinstall(_) => "reinstall",
        };
        Ok(CommandSpec::new(&self.dnf).args([verb, "-y"]).arg(target))
    }
}
