use super::{CommandSpec, InstallAction, Manager, PackageBackend};
use crate::environment::Environment;
use crate::policy::Pin;
use crate::pypi::IndexClient;
use crate::requirements::normalize_name;
use crate::settings::Settings;
use depctl_error::DepctlResult;
use depctl_host::ProcessOps;
use serde::Deserialize;
use std::time::Duration;

const LIST_ARGS: &[&str] = &["-m", "pip", "list", "--format=json", "--disable-pip-version-check"];

#[derive(Debug, Deserialize)]
struct ListedPackage {
    name: String,
    version: String,
}

/// Parses `pip list --format=json` output.
pub fn parse_pip_list(json: &str) -> Vec<(String, String)> {
    match serde_json::from_str::<Vec<ListedPackage>>(json) {
        Ok(list) => list.into_iter().map(|p| (p.name, p.version)).collect(),
        Err(err) => {
            log::debug!("unparseable pip list output: {err}");
            Vec::new()
        }
    }
}

/// Parses `pip index versions <pkg>` text output.
pub fn parse_index_versions(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(latest) = line.trim().strip_prefix("LATEST:") {
            let latest = latest.trim();
            if !latest.is_empty() {
                return Some(latest.to_string());
            }
        }
    }
    // First line is `name (version)`.
    let first = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let open = first.find('(')?;
    let close = first[open..].find(')')? + open;
    let version = first[open + 1..close].trim();
    (!version.is_empty()).then(|| version.to_string())
}

fn requirement_spec(package: &str, pin: &Pin) -> String {
    match pin {
        Pin::Exact(v) => format!("{package}=={v}"),
        Pin::AtLeast(v) => format!("{package}>={v}"),
        Pin::Newest => package.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct PipBackend {
    python: String,
    extra_args: Vec<String>,
    index: Option<IndexClient>,
    timeout: Duration,
}

impl PipBackend {
    pub fn new(settings: &Settings, env: &Environment) -> Self {
        Self {
            python: env.python.display().to_string(),
            extra_args: settings.pip_extra_args.clone(),
            index: IndexClient::new(&settings.pip_index_url, settings.index_timeout()),
            timeout: settings.query_timeout(),
        }
    }

    /// Every package pip reports as installed.
    pub fn list_installed(&self, host: &dyn ProcessOps) -> Vec<(String, String)> {
        host.query_stdout(&self.python, LIST_ARGS, self.timeout)
            .map(|out| parse_pip_list(&out))
            .unwrap_or_default()
    }

    fn index_versions(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        let args = [
            "-m",
            "pip",
            "index",
            "versions",
            package,
            "--disable-pip-version-check",
        ];
        host.query_stdout(&self.python, &args, self.timeout)
            .and_then(|out| parse_index_versions(&out))
    }
}

impl PackageBackend for PipBackend {
    fn manager(&self) -> Manager {
        Manager::Pip
    }

    fn installed_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        let wanted = normalize_name(package);
        self.list_installed(host)
            .into_iter()
            .find(|(name, _)| normalize_name(name) == wanted)
            .map(|(_, version)| version)
    }

    fn latest_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        self.index
            .as_ref()
            .and_then(|index| index.latest_version(package))
            .or_else(|| self.index_versions(host, package))
    }

    fn install_command(&self, package: &str, action: &InstallAction) -> DepctlResult<CommandSpec> {
        let mut spec = CommandSpec::new(&self.python)
            .args(["-m", "pip", "install", "--disable-pip-version-check", "--no-input"])
            .args(self.extra_args.iter().cloned());
        spec = match action {
            InstallAction::Install(_) | InstallAction::Downgrade(_) => spec,
            InstallAction::Upgrade(_) => spec.arg("--upgrade"),
            InstallAction::Reinstall(_) => spec.arg("--force-reinstall"),
        };
        Ok(spec.arg(requirement_spec(package, action.pin())))
    }
}
