//! Installed/latest version lookups, dispatched to the package's backend.

use crate::backends::PackageBackend;
use depctl_host::ProcessOps;
use log::debug;

fn clean(version: Option<String>) -> Option<String> {
    version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "(none)")
}

/// Installed version of `package`, or `None` when absent or unknown.
pub fn installed_version(
    backend: &dyn PackageBackend,
    host: &dyn ProcessOps,
    package: &str,
) -> Option<String> {
    let version = clean(backend.installed_version(host, package));
    debug!("{} installed ({}): {:?}", package, backend.manager(), version);
    version
}

/// Newest version the package's index offers, or `None` when unknown.
pub fn latest_version(
    backend: &dyn PackageBackend,
    host: &dyn ProcessOps,
    package: &str,
) -> Option<String> {
    let version = clean(backend.latest_version(host, package));
    debug!("{} latest ({}): {:?}", package, backend.manager(), version);
    version
}
