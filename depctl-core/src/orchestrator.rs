//! Drives a batch of requirements through query, policy and install.

use crate::backends::{self, InstallAction, Manager, PackageBackend};
use crate::environment::{Environment, InstallMethod};
use crate::installer::Installer;
use crate::policy::{decide, Status};
use crate::report::{write_report, InstalledRecord, Outcome};
use crate::requirements::Requirement;
use crate::settings::Settings;
use crate::versions;
use anyhow::Result;
use depctl_error::{DepctlError, DepctlResult};
use depctl_host::ProcessOps;
use log::{error, info, warn};
use std::collections::HashMap;
use std::path::Path;

const ALL_MANAGERS: [Manager; 5] = [
    Manager::Brew,
    Manager::Pip,
    Manager::Apt,
    Manager::Dnf,
    Manager::PowerShell,
];

/// Everything one run needs: host, settings, the detected environment and a
/// backend per manager.
pub struct Session<'a> {
    host: &'a dyn ProcessOps,
    settings: Settings,
    env: Environment,
    backends: HashMap<Manager, Box<dyn PackageBackend>>,
    installer: Installer<'a>,
    force: bool,
}

impl<'a> Session<'a> {
    pub fn new(
        host: &'a dyn ProcessOps,
        settings: Settings,
        env: Environment,
        dry_run: bool,
        force: bool,
    ) -> Self {
        let backends = ALL_MANAGERS
            .iter()
            .map(|&m| (m, backends::for_manager(m, &settings, &env)))
            .collect();
        let installer = Installer::new(host, settings.install_timeout(), dry_run);
        Self {
            host,
            settings,
            env,
            backends,
            installer,
            force,
        }
    }

    /// Replaces the backend registered for its manager.
    pub fn with_backend(mut self, backend: Box<dyn PackageBackend>) -> Self {
        self.backends.insert(backend.manager(), backend);
        self
    }

    pub fn host(&self) -> &'a dyn ProcessOps {
        self.host
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn manager_for(&self, req: &Requirement) -> Manager {
        req.manager.unwrap_or_else(|| Manager::default_for(&self.env))
    }

    pub fn backend(&self, manager: Manager) -> &dyn PackageBackend {
        // Every manager is registered in `new`.
        self.backends[&manager].as_ref()
    }

    /// Rejects requirement sets this environment cannot serve.
    ///
    /// A Homebrew-managed Python must not also be driven by pip directly.
    pub fn check_managers(&self, requirements: &[Requirement], path: &Path) -> DepctlResult<()> {
        if self.env.install_method != InstallMethod::Brew {
            return Ok(());
        }
        let pip_pinned: Vec<&str> = requirements
            .iter()
            .filter(|r| r.manager == Some(Manager::Pip))
            .map(|r| r.package.as_str())
            .collect();
        if pip_pinned.is_empty() {
            return Ok(());
        }
        Err(DepctlError::config(
            path,
            format!(
                "pip requested for {} but the environment is managed by Homebrew",
                pip_pinned.join(", ")
            ),
        ))
    }

    /// Resolves and applies one requirement. Install failures are recorded
    /// on the returned record, never propagated.
    pub fn process(&self, req: &Requirement, lookup_latest: bool) -> InstalledRecord {
        let manager = self.manager_for(req);
        let backend = self.backend(manager);

        let installed = versions::installed_version(backend, self.host, &req.package);
        let latest = if lookup_latest {
            versions::latest_version(backend, self.host, &req.package)
        } else {
            None
        };

        let decision = decide(req, installed.as_deref(), latest.as_deref());
        info!(
            "{} [{}] {}: {}",
            req.package, manager, decision.status, decision.detail
        );
        if decision.status == Status::Skipped {
            warn!("Skipping {}: {}", req.package, decision.detail);
        }

        let mut record = InstalledRecord::new(req, manager, installed, latest, decision.status);
        let Some(action) = InstallAction::from_status(decision.status, decision.pin, self.force)
        else {
            return record;
        };

        match self.installer.install_package(backend, &req.package, &action) {
            Ok(Outcome::Applied) => {
                record.outcome = Outcome::Applied;
                if let Some(now) = versions::installed_version(backend, self.host, &req.package) {
                    record.installed_version = Some(now);
                }
            }
            Ok(outcome) => record.outcome = outcome,
            Err(err) => {
                error!("{err}");
                record.outcome = Outcome::Failed;
                record.error = Some(err.to_string());
            }
        }
        record
    }

    pub fn process_all(
        &self,
        requirements: &[Requirement],
        lookup_latest: bool,
    ) -> Vec<InstalledRecord> {
        requirements
            .iter()
            .map(|req| self.process(req, lookup_latest))
            .collect()
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub records: Vec<InstalledRecord>,
    pub failed: usize,
}

impl RunSummary {
    pub fn new(records: Vec<InstalledRecord>) -> Self {
        let failed = records.iter().filter(|r| r.failed()).count();
        Self { records, failed }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Applies already-validated requirements and writes the report to `output`.
pub fn run_requirements(
    session: &Session<'_>,
    requirements: &[Requirement],
    config: &Path,
    output: &Path,
) -> Result<RunSummary> {
    session.check_managers(requirements, config)?;
    info!(
        "Processing {} requirements from {}",
        requirements.len(),
        config.display()
    );
    let summary = RunSummary::new(session.process_all(requirements, true));
    write_report(output, &summary.records)?;
    info!(
        "Wrote {} ({} packages, {} failed)",
        output.display(),
        summary.records.len(),
        summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::Policy;
    use depctl_host::FakeHost;

    fn settings() -> Settings {
        Settings {
            pip_index_url: String::new(),
            ..Settings::default()
        }
    }

    fn brew_env() -> Environment {
        Environment {
            install_method: InstallMethod::Brew,
            brew_available: true,
            brew_prefix: Some("/opt/homebrew".into()),
            python: "/opt/homebrew/bin/python3".into(),
            platform: crate::environment::Platform::Macos,
        }
    }

    #[test]
    fn default_manager_follows_environment() {
        let host = FakeHost::new();
        let req = Requirement::new("jq", "", Policy::Latest);
        let brew = Session::new(&host, settings(), brew_env(), false, false);
        assert_eq!(brew.manager_for(&req), Manager::Brew);
        let standalone = Session::new(
            &host,
            settings(),
            Environment::standalone("python3"),
            false,
            false,
        );
        assert_eq!(standalone.manager_for(&req), Manager::Pip);
        assert_eq!(
            standalone.manager_for(&req.clone().with_manager(Manager::Apt)),
            Manager::Apt
        );
    }

    #[test]
    fn pip_in_brew_environment_is_config_error() {
        let host = FakeHost::new();
        let session = Session::new(&host, settings(), brew_env(), false, false);
        let reqs = vec![
            Requirement::new("jq", "", Policy::Latest),
            Requirement::new("pytest", "7.4.0", Policy::Exact).with_manager(Manager::Pip),
        ];
        let err = session
            .check_managers(&reqs, Path::new("requirements.json"))
            .unwrap_err();
        assert!(matches!(err, DepctlError::Config { .. }));
        assert!(err.to_string().contains("pytest"));
        assert!(host.commands().is_empty());
    }

    #[test]
    fn dry_run_plans_without_installing() {
        let host = FakeHost::new();
        let session = Session::new(
            &host,
            settings(),
            Environment::standalone("python3"),
            true,
            false,
        );
        let record = session.process(&Requirement::new("pytest", "7.4.0", Policy::Exact), true);
        assert_eq!(record.status, Status::Installing);
        assert_eq!(record.outcome, Outcome::Planned);
        assert!(!host.ran("python3 -m pip install"));
    }
}
