use super::{CommandSpec, InstallAction, Manager, PackageBackend};
use crate::policy::Pin;
use crate::settings::Settings;
use depctl_error::DepctlResult;
use depctl_host::ProcessOps;
use std::time::Duration;

/// Pulls the `Candidate:` version out of `apt-cache policy` output.
pub fn parse_candidate(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|l| l.trim().strip_prefix("Candidate:"))
        .map(str::trim)
        .find(|v| !v.is_empty() && *v != "(none)")
        .map(str::to_string)
}

const DPKG_FORMAT: &str = "-f=${db:Status-Abbrev} ${Version}";

/// Version from `dpkg-query -W -f='${db:Status-Abbrev} ${Version}'`.
///
/// Only `ii` (wanted install, installed) counts; removed packages that kept
/// their config files (`rc`) and half-installed states read as absent.
pub fn parse_dpkg_status(output: &str) -> Option<String> {
    let mut fields = output.split_whitespace();
    let status = fields.next()?;
    if status != "ii" {
        return None;
    }
    fields.next().map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct AptBackend {
    apt_get: String,
    dpkg_query: String,
    apt_cache: String,
    timeout: Duration,
}

impl AptBackend {
    pub fn new(settings: &Settings) -> Self {
        Self {
            apt_get: settings.apt_get_bin.clone(),
            dpkg_query: settings.dpkg_query_bin.clone(),
            apt_cache: settings.apt_cache_bin.clone(),
            timeout: settings.query_timeout(),
        }
    }
}

impl PackageBackend for AptBackend {
    fn manager(&self) -> Manager {
        Manager::Apt
    }

    fn installed_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        host.query_stdout(&self.dpkg_query, &["-W", DPKG_FORMAT, package], self.timeout)
            .and_then(|out| parse_dpkg_status(&out))
    }

    fn latest_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        host.query_stdout(&self.apt_cache, &["policy", package], self.timeout)
            .and_then(|out| parse_candidate(&out))
    }

    fn install_command(&self, package: &str, action: &InstallAction) -> DepctlResult<CommandSpec> {
        let target = match action.pin() {
            Pin::Exact(v) => format!("{package}={v}"),
            Pin::AtLeast(_) | Pin::Newest => package.to_string(),
        };
        let spec = CommandSpec::new(&self.apt_get).args(["install", "-y"]);
        let spec = match action {
            InstallAction::Install(_) => spec,
            InstallAction::Upgrade(_) => spec.arg("--only-upgrade"),
            InstallAction::Downgrade(_) => spec.arg("--allow-downgrades"),
            InstallAction::Reinstall(_) => spec.arg("--reinstall"),
        };
        Ok(spec.arg(target))
    }
}
