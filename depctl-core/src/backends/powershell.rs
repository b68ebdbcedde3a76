use super::{CommandSpec, InstallAction, Manager, PackageBackend};
use crate::policy::Pin;
use crate::settings::Settings;
use depctl_error::DepctlResult;
use depctl_host::ProcessOps;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const PS_FLAGS: &[&str] = &["-NoProfile", "-NonInteractive", "-Command"];

#[derive(Debug, Deserialize)]
struct PsPackage {
    #[serde(rename = "Version")]
    version: String,
}

/// Single-quoted PowerShell literal.
fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `ConvertTo-Json` emits an object for one result and an array for several.
pub fn parse_ps_version(json: &str) -> Option<String> {
    let value: Value = serde_json::from_str(json.trim()).ok()?;
    let first = match value {
        Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    let pkg: PsPackage = serde_json::from_value(first).ok()?;
    let version = pkg.version.trim();
    (!version.is_empty()).then(|| version.to_string())
}

#[derive(Debug, Clone)]
pub struct PowerShellBackend {
    bin: String,
    timeout: Duration,
}

impl PowerShellBackend {
    pub fn new(settings: &Settings) -> Self {
        Self {
            bin: settings.powershell_bin.clone(),
            timeout: settings.query_timeout(),
        }
    }

    fn query(&self, host: &dyn ProcessOps, cmdlet: &str, package: &str) -> Option<String> {
        let script = format!(
            "{cmdlet} -Name {} -ErrorAction SilentlyContinue | Select-Object -First 1 Name,Version | ConvertTo-Json -Compress",
            ps_quote(package)
        );
        let mut args = PS_FLAGS.to_vec();
        args.push(&script);
        host.query_stdout(&self.bin, &args, self.timeout)
            .and_then(|out| parse_ps_version(&out))
    }
}

impl PackageBackend for PowerShellBackend {
    fn manager(&self) -> Manager {
        Manager::PowerShell
    }

    fn installed_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        self.query(host, "Get-Package", package)
    }

    fn latest_version(&self, host: &dyn ProcessOps, package: &str) -> Option<String> {
        self.query(host, "Find-Package", package)
    }

    fn install_command(&self, package: &str, action: &InstallAction) -> DepctlResult<CommandSpec> {
        let mut script = format!("Install-Package -Name {}", ps_quote(package));
        match action.pin() {
            Pin::Exact(v) => script.push_str(&format!(" -RequiredVersion {}", ps_quote(v))),
            Pin::AtLeast(v) => script.push_str(&format!(" -MinimumVersion {}", ps_quote(v))),
            Pin::Newest => {}
        }
        script.push_str(" -Force -Confirm:$false");
        Ok(CommandSpec::new(&self.bin).args(PS_FLAGS.iter().copied()).arg(script))
    }
}
