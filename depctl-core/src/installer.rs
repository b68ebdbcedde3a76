//! Applies install actions through a backend.

use crate::backends::{InstallAction, PackageBackend};
use crate::report::Outcome;
use depctl_error::{DepctlError, DepctlResult};
use depctl_host::ProcessOps;
use log::info;
use std::time::Duration;

pub struct Installer<'a> {
    host: &'a dyn ProcessOps,
    timeout: Duration,
    dry_run: bool,
}

impl<'a> Installer<'a> {
    pub fn new(host: &'a dyn ProcessOps, timeout: Duration, dry_run: bool) -> Self {
        Self {
            host,
            timeout,
            dry_run,
        }
    }

    /// Runs `action` for `package` and waits for the manager to finish.
    ///
    /// A non-zero exit (or a manager that cannot express the action) is an
    /// [`DepctlError::Install`] for this package only.
    pub fn install_package(
        &self,
        backend: &dyn PackageBackend,
        package: &str,
        action: &InstallAction,
    ) -> DepctlResult<Outcome> {
        let spec = backend.install_command(package, action)?;
        backend.verify_pin(self.host, package, action.pin())?;
        if self.dry_run {
            info!("DRY RUN: {spec}");
            return Ok(Outcome::Planned);
        }
        info!("{}: {}", package, spec);
        self.host
            .command_status(&spec.program, &spec.arg_refs(), self.timeout)
            .map_err(|err| DepctlError::install(package, err.to_string()))?;
        Ok(Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::PipBackend;
    use crate::environment::Environment;
    use crate::policy::Pin;
    use crate::settings::Settings;
    use depctl_host::{FakeHost, FakeResponse};

    fn pip() -> PipBackend {
        let settings = Settings {
            pip_index_url: String::new(),
            ..Settings::default()
        };
        PipBackend::new(&settings, &Environment::standalone("python3"))
    }

    #[test]
    fn dry_run_does_not_execute() {
        let host = FakeHost::new();
        let installer = Installer::new(&host, Duration::from_secs(60), true);
        let outcome = installer
            .install_package(&pip(), "pytest", &InstallAction::Install(Pin::Exact("7.4.0".into())))
            .unwrap();
        assert_eq!(outcome, Outcome::Planned);
        assert!(host.commands().is_empty());
    }

    #[test]
    fn runs_with_install_timeout() {
        let host = FakeHost::new();
        let installer = Installer::new(&host, Duration::from_secs(900), false);
        let outcome = installer
            .install_package(&pip(), "pytest", &InstallAction::Upgrade(Pin::Exact("7.4.0".into())))
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        let cmds = host.commands();
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].timeout_secs, 900);
        assert_eq!(cmds[0].args.last().map(String::as_str), Some("pytest==7.4.0"));
    }

    #[test]
    fn nonzero_exit_is_install_error() {
        let host = FakeHost::new();
        let backend = pip();
        let action = InstallAction::Install(Pin::Exact("0.0.1".into()));
        let spec = backend.install_command("nope", &action).unwrap();
        host.respond(
            &spec.program,
            &spec.arg_refs(),
            FakeResponse::fail(1, "ERROR: No matching distribution found for nope==0.0.1"),
        );
        let err = Installer::new(&host, Duration::from_secs(60), false)
            .install_package(&backend, "nope", &action)
            .unwrap_err();
        match err {
            DepctlError::Install { package, reason } => {
                assert_eq!(package, "nope");
                assert!(reason.contains("No matching distribution"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
