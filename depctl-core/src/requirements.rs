//! `requirements.json` loading and validation.
//!
//! The current schema is an array of
//! `{"package": "...", "version": {"target": "...", "policy": "exact|min|latest"}}`
//! objects with an optional `"manager"`. Older files used a version string
//! (`"7.4.0"`, `">=7.4.0"`, `"latest"`) or a plain `{"name": "version"}` map;
//! both are still accepted.

use crate::backends::Manager;
use crate::version::PackageVersion;
use depctl_error::{DepctlError, DepctlResult};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Latest,
    Exact,
    #[serde(alias = "minimum")]
    Min,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Latest => write!(f, "latest"),
            Policy::Exact => write!(f, "exact"),
            Policy::Min => write!(f, "min"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    #[serde(default)]
    pub target: String,
    pub policy: Policy,
}

impl VersionSpec {
    /// Parses the legacy string form.
    fn from_shorthand(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == "*" || raw.eq_ignore_ascii_case("latest") {
            return Self {
                target: String::new(),
                policy: Policy::Latest,
            };
        }
        if let Some(min) = raw.strip_prefix(">=") {
            return Self {
                target: min.trim().to_string(),
                policy: Policy::Min,
            };
        }
        let exact = raw.strip_prefix("==").unwrap_or(raw);
        Self {
            target: exact.trim().to_string(),
            policy: Policy::Exact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRequirement")]
pub struct Requirement {
    pub package: String,
    pub version: VersionSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<Manager>,
}

impl Requirement {
    pub fn new(package: &str, target: &str, policy: Policy) -> Self {
        Self {
            package: package.to_string(),
            version: VersionSpec {
                target: target.to_string(),
                policy,
            },
            manager: None,
        }
    }

    pub fn with_manager(mut self, manager: Manager) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn target(&self) -> &str {
        &self.version.target
    }

    pub fn policy(&self) -> Policy {
        self.version.policy
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Spec(VersionSpec),
    Shorthand(String),
}

impl From<RawVersion> for VersionSpec {
    fn from(raw: RawVersion) -> Self {
        match raw {
            RawVersion::Spec(spec) => spec,
            RawVersion::Shorthand(s) => VersionSpec::from_shorthand(&s),
        }
    }
}

#[derive(Deserialize)]
struct RawRequirement {
    package: String,
    #[serde(default)]
    version: Option<RawVersion>,
    #[serde(default)]
    manager: Option<Manager>,
}

impl TryFrom<RawRequirement> for Requirement {
    type Error = String;

    fn try_from(raw: RawRequirement) -> Result<Self, Self::Error> {
        let package = raw.package.trim().to_string();
        if package.is_empty() {
            return Err("requirement has an empty package name".to_string());
        }
        let version = raw
            .version
            .map(VersionSpec::from)
            .unwrap_or_else(|| VersionSpec::from_shorthand(""));
        Ok(Self {
            package,
            version,
            manager: raw.manager,
        })
    }
}

/// `{"name": "version"}` pairs in the order the file declares them.
struct LegacyEntries(Vec<(String, String)>);

impl<'de> Deserialize<'de> for LegacyEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = LegacyEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of package names to version strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, String>()? {
                    entries.push(entry);
                }
                Ok(LegacyEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementsFile {
    List(Vec<Requirement>),
    LegacyMap(LegacyEntries),
}

/// PEP 503 name normalization: case-insensitive, `-`, `_` and `.` runs are equivalent.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_sep {
                out.push('-');
            }
            last_sep = true;
        } else {
            out.extend(c.to_lowercase());
            last_sep = false;
        }
    }
    out
}

pub fn parse_requirements(content: &str, path: &Path) -> DepctlResult<Vec<Requirement>> {
    let file: RequirementsFile = serde_json::from_str(content).map_err(|err| {
        DepctlError::config(path, format!("invalid requirements JSON: {err}"))
    })?;
    let requirements = match file {
        RequirementsFile::List(list) => list,
        RequirementsFile::LegacyMap(LegacyEntries(entries)) => entries
            .into_iter()
            .map(|(package, version)| Requirement {
                package,
                version: VersionSpec::from_shorthand(&version),
                manager: None,
            })
            .collect(),
    };
    validate(&requirements, path)?;
    Ok(requirements)
}

pub fn validate(requirements: &[Requirement], path: &Path) -> DepctlResult<()> {
    let mut seen = HashSet::new();
    for req in requirements {
        if req.package.trim().is_empty() {
            return Err(DepctlError::config(path, "requirement has an empty package name"));
        }
        if !seen.insert(normalize_name(&req.package)) {
            return Err(DepctlError::config(
                path,
                format!("package {} is listed more than once", req.package),
            ));
        }
        match req.policy() {
            Policy::Latest => {
                if !req.target().is_empty() && PackageVersion::parse(req.target()).is_none() {
                    return Err(DepctlError::config(
                        path,
                        format!("{}: target {:?} is not a version", req.package, req.target()),
                    ));
                }
            }
            Policy::Exact | Policy::Min => {
                if req.target().is_empty() {
                    return Err(DepctlError::config(
                        path,
                        format!("{}: policy {} needs a target version", req.package, req.policy()),
                    ));
                }
                if PackageVersion::parse(req.target()).is_none() {
                    return Err(DepctlError::config(
                        path,
                        format!("{}: target {:?} is not a version", req.package, req.target()),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Loads and validates a requirements file.
///
/// A missing file is fatal; anything unreadable as requirements is a
/// configuration error.
pub fn load_requirements(path: &Path) -> DepctlResult<Vec<Requirement>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(DepctlError::Fatal(format!(
                "requirements file not found: {}",
                path.display()
            )));
        }
        Err(err) => return Err(DepctlError::Io(err)),
    };
    parse_requirements(&content, path)
}
